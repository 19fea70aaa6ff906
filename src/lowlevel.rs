//! Low-level building blocks for custom post-processing pipelines.
//!
//! These types expose the raw decode and suppression stages for callers
//! that drive post-processing directly instead of going through
//! [`crate::PostContext`]. Most users should prefer the context API.

pub use crate::candidate::nms::{nms, ClassFilter, NmsMode, NmsParams};
pub use crate::candidate::{Candidate, Scratch};
pub use crate::decoder::{
    CenterNetConfig, CenterNetDecoder, Decode, FaceDetConfig, FaceDetDecoder, HeadPoseDecoder,
    ScoreBlend, SsdConfig, SsdDecoder, YoloConfig, YoloDecoder,
};
pub use crate::tensor::Samples;
