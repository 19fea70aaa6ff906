//! Decoders turning raw model output tensors into detection candidates.
//!
//! Every architecture implements the [`Decode`] trait, which is also the
//! injection point for custom decoders: a caller-supplied implementation is
//! invoked through the same interface as the built-ins and must satisfy the
//! same contract. Decoders validate every input tensor before touching the
//! scratch arena, so a validation error leaves the arena exactly as it was.

use crate::candidate::Scratch;
use crate::tensor::TensorView;
use crate::util::{DetPostError, DetPostResult};

pub(crate) mod centernet;
pub(crate) mod facedet;
pub(crate) mod headpose;
pub(crate) mod ssd;
pub(crate) mod yolo;

/// Decoding seam shared by built-in and custom decoders.
pub trait Decode {
    /// Decodes the selected model output tensors into `scratch`.
    ///
    /// Implementations must not mutate the input tensors, must fail with a
    /// shape/type error before clearing the scratch when an input violates
    /// the decoder's contract, and must never emit non-finite scores or
    /// coordinates outside [0,1].
    fn decode(&self, outputs: &[TensorView<'_>], scratch: &mut Scratch) -> DetPostResult<()>;
}

/// Checks the output-tensor count against a decoder's fixed arity.
pub(crate) fn expect_outputs<'a, 'b, const N: usize>(
    outputs: &'a [TensorView<'b>],
) -> DetPostResult<&'a [TensorView<'b>; N]> {
    if outputs.len() > N {
        return Err(DetPostError::TooManyInputs {
            max: N,
            got: outputs.len(),
        });
    }
    outputs
        .try_into()
        .map_err(|_| DetPostError::InvalidParameter("missing required output tensor"))
}

/// Extracts `(height, width, channels)` from a `[H,W,C]` or `[1,H,W,C]`
/// feature map.
pub(crate) fn spatial_dims(
    tensor: &TensorView<'_>,
    context: &'static str,
) -> DetPostResult<(usize, usize, usize)> {
    let shape = tensor.shape();
    match shape {
        [h, w, c] => Ok((*h, *w, *c)),
        [1, h, w, c] => Ok((*h, *w, *c)),
        _ => Err(DetPostError::InvalidShape {
            context,
            shape: shape.to_vec(),
        }),
    }
}

/// Extracts `(rows, channels)` from a `[N,C]` or `[1,N,C]` tensor.
pub(crate) fn row_dims(
    tensor: &TensorView<'_>,
    context: &'static str,
) -> DetPostResult<(usize, usize)> {
    let shape = tensor.shape();
    match shape {
        [n, c] => Ok((*n, *c)),
        [1, n, c] => Ok((*n, *c)),
        _ => Err(DetPostError::InvalidShape {
            context,
            shape: shape.to_vec(),
        }),
    }
}

pub use centernet::{CenterNetConfig, CenterNetDecoder};
pub use facedet::{FaceDetConfig, FaceDetDecoder, ScoreBlend};
pub use headpose::HeadPoseDecoder;
pub use ssd::{SsdConfig, SsdDecoder};
pub use yolo::{YoloConfig, YoloDecoder};
