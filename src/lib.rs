//! DetPost converts raw neural-network output tensors into structured
//! detection results: bounding boxes, keypoints, and orientation angles.
//!
//! The crate provides per-architecture decoders (CenterNet, YOLO, SSD,
//! face detection, head pose), a shared non-maximum-suppression stage, and
//! a result store with a query-size-then-fill extraction API. Optional
//! tracing instrumentation is available via the `tracing` feature.

pub mod candidate;
pub mod context;
pub mod decoder;
pub mod geometry;
pub mod lowlevel;
pub mod results;
pub mod tensor;
mod trace;
pub mod util;

pub use context::{PostConfig, PostContext};
pub use geometry::{iou, DetectBox, EulerAngles, Keypoint};
pub use results::ResultSet;
pub use tensor::{Quantization, TensorData, TensorType, TensorView};
pub use util::{DetPostError, DetPostResult};

pub use candidate::nms::{nms, ClassFilter, NmsMode, NmsParams};
pub use candidate::{Candidate, Scratch};
pub use decoder::{
    CenterNetConfig, CenterNetDecoder, Decode, FaceDetConfig, FaceDetDecoder, HeadPoseDecoder,
    ScoreBlend, SsdConfig, SsdDecoder, YoloConfig, YoloDecoder,
};
