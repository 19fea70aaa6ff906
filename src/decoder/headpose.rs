//! Head-pose decoder.

use crate::candidate::Scratch;
use crate::decoder::{expect_outputs, Decode};
use crate::geometry::EulerAngles;
use crate::tensor::TensorView;
use crate::util::{DetPostError, DetPostResult};

/// Decoder for head-pose models emitting yaw/pitch/roll radians.
///
/// Expects a single `[3]` or `[1,3]` tensor and stores exactly one
/// orientation per run. Produces no box candidates.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadPoseDecoder;

impl HeadPoseDecoder {
    /// Creates the decoder.
    pub fn new() -> Self {
        Self
    }
}

impl Decode for HeadPoseDecoder {
    fn decode(&self, outputs: &[TensorView<'_>], scratch: &mut Scratch) -> DetPostResult<()> {
        let [angles] = expect_outputs::<1>(outputs)?;
        if !matches!(angles.shape(), [3] | [1, 3]) {
            return Err(DetPostError::InvalidShape {
                context: "orientation tensor must be [3] or [1,3]",
                shape: angles.shape().to_vec(),
            });
        }
        let data = angles.samples()?;
        let yaw = data.get(0);
        let pitch = data.get(1);
        let roll = data.get(2);
        if !(yaw.is_finite() && pitch.is_finite() && roll.is_finite()) {
            return Err(DetPostError::InvalidParameter(
                "orientation tensor holds non-finite angles",
            ));
        }

        scratch.clear();
        scratch.set_euler(EulerAngles { yaw, pitch, roll });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Decode, HeadPoseDecoder};
    use crate::candidate::Scratch;
    use crate::geometry::EulerAngles;
    use crate::tensor::TensorView;
    use crate::util::DetPostError;

    #[test]
    fn decodes_one_orientation() {
        let data = [0.1f32, -0.2, 0.3];
        let view = TensorView::from_f32(&[1, 3], &data).unwrap();
        let mut scratch = Scratch::new();
        HeadPoseDecoder::new().decode(&[view], &mut scratch).unwrap();
        assert_eq!(
            scratch.euler(),
            Some(EulerAngles {
                yaw: 0.1,
                pitch: -0.2,
                roll: 0.3,
            })
        );
        assert!(scratch.is_empty());
    }

    #[test]
    fn rejects_wrong_rank() {
        let data = [0.0f32; 4];
        let view = TensorView::from_f32(&[2, 2], &data).unwrap();
        let mut scratch = Scratch::new();
        let err = HeadPoseDecoder::new()
            .decode(&[view], &mut scratch)
            .err()
            .unwrap();
        assert!(matches!(err, DetPostError::InvalidShape { .. }));
    }
}
