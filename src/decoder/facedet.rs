//! Face detector decoder.
//!
//! Prior-based face detectors pair an SSD-style location head with a
//! two-column confidence head and an auxiliary IoU-prediction head that
//! estimates localization quality. The classification and IoU signals are
//! blended into the candidate score through a pluggable function; the exact
//! formula is architecture-specific, so callers can substitute their own.
//!
//! When the location head carries extra channels beyond the box deltas,
//! they are decoded as prior-relative facial landmarks and carried through
//! suppression as keypoints.

use crate::candidate::Scratch;
use crate::decoder::ssd::decode_anchor_box;
use crate::decoder::{expect_outputs, row_dims, Decode};
use crate::geometry::{clamp_unit, DetectBox, Keypoint};
use crate::tensor::TensorView;
use crate::trace::{trace_event, trace_span};
use crate::util::{DetPostError, DetPostResult};

/// Blends a classification score with the predicted localization IoU.
pub type ScoreBlend = fn(cls: f32, iou: f32) -> f32;

/// Default blend: geometric mean of the class score and the clamped IoU
/// prediction.
fn geometric_blend(cls: f32, iou: f32) -> f32 {
    (cls * iou.clamp(0.0, 1.0)).sqrt()
}

/// Face decoding parameters.
#[derive(Clone, Copy, Debug)]
pub struct FaceDetConfig {
    /// Minimum blended score; priors below it are skipped.
    pub score_threshold: f32,
    /// Center and size delta variances.
    pub variances: [f32; 2],
    /// Classification/IoU blending rule.
    pub blend: ScoreBlend,
}

impl Default for FaceDetConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            variances: [0.1, 0.2],
            blend: geometric_blend,
        }
    }
}

/// Decoder for prior/location/IoU/confidence face-detector outputs.
///
/// Expects priors `[N,4]`, location `[N,4+2K]` (K landmark points, K may
/// be 0), IoU predictions `[N,1]` or `[N]`, and confidence `[N,2]` with the
/// face probability in column 1. All candidates carry label 0.
#[derive(Clone, Copy, Debug)]
pub struct FaceDetDecoder {
    config: FaceDetConfig,
}

impl FaceDetDecoder {
    /// Creates a decoder with the default blend and variances.
    pub fn new(score_threshold: f32) -> Self {
        Self {
            config: FaceDetConfig {
                score_threshold,
                ..FaceDetConfig::default()
            },
        }
    }

    /// Creates a decoder from an explicit configuration.
    pub fn from_config(config: FaceDetConfig) -> Self {
        Self { config }
    }
}

fn iou_rows(tensor: &TensorView<'_>) -> DetPostResult<usize> {
    match tensor.shape() {
        [n] => Ok(*n),
        [n, 1] | [1, n, 1] => Ok(*n),
        shape => Err(DetPostError::InvalidShape {
            context: "iou predictions must be [N] or [N,1]",
            shape: shape.to_vec(),
        }),
    }
}

impl Decode for FaceDetDecoder {
    fn decode(&self, outputs: &[TensorView<'_>], scratch: &mut Scratch) -> DetPostResult<()> {
        let _guard = trace_span!("facedet_decode").entered();
        let [priors, loc, iou, conf] = expect_outputs::<4>(outputs)?;

        let (rows, prior_c) = row_dims(priors, "priors must be [N,4]")?;
        if prior_c != 4 {
            return Err(DetPostError::InvalidShape {
                context: "priors must be [N,4]",
                shape: priors.shape().to_vec(),
            });
        }
        let (loc_rows, loc_c) = row_dims(loc, "location must be [N,4+2K]")?;
        if loc_rows != rows || loc_c < 4 || (loc_c - 4) % 2 != 0 {
            return Err(DetPostError::ShapeMismatch {
                context: "location rows must match priors with 4+2K channels",
                expected: vec![rows, 4],
                got: vec![loc_rows, loc_c],
            });
        }
        let iou_n = iou_rows(iou)?;
        if iou_n != rows {
            return Err(DetPostError::ShapeMismatch {
                context: "iou rows must match priors",
                expected: vec![rows],
                got: vec![iou_n],
            });
        }
        let (conf_rows, conf_c) = row_dims(conf, "confidence must be [N,2]")?;
        if conf_rows != rows || conf_c != 2 {
            return Err(DetPostError::ShapeMismatch {
                context: "confidence rows must match priors with 2 columns",
                expected: vec![rows, 2],
                got: vec![conf_rows, conf_c],
            });
        }

        let prior_data = priors.samples()?;
        let loc_data = loc.samples()?;
        let iou_data = iou.samples()?;
        let conf_data = conf.samples()?;
        let landmark_points = (loc_c - 4) / 2;

        scratch.clear();
        let mut keypoints: Vec<Keypoint> = Vec::with_capacity(landmark_points);
        for row in 0..rows {
            let cls = conf_data.get(row * 2 + 1);
            let quality = iou_data.get(row);
            let score = (self.config.blend)(cls, quality);
            if !score.is_finite() || score < self.config.score_threshold {
                continue;
            }

            let decoded = decode_anchor_box(&prior_data, &loc_data, row, loc_c, self.config.variances);
            let Some((xmin, ymin, xmax, ymax)) = decoded else {
                continue;
            };

            keypoints.clear();
            let acx = prior_data.get(row * 4);
            let acy = prior_data.get(row * 4 + 1);
            let aw = prior_data.get(row * 4 + 2);
            let ah = prior_data.get(row * 4 + 3);
            for point in 0..landmark_points {
                let base = row * loc_c + 4 + point * 2;
                let x = acx + loc_data.get(base) * self.config.variances[0] * aw;
                let y = acy + loc_data.get(base + 1) * self.config.variances[0] * ah;
                if !(x.is_finite() && y.is_finite()) {
                    continue;
                }
                keypoints.push(Keypoint {
                    x: clamp_unit(x),
                    y: clamp_unit(y),
                    score,
                });
            }

            scratch.push_with_keypoints(
                DetectBox {
                    xmin,
                    ymin,
                    xmax,
                    ymax,
                    score,
                    label: 0,
                },
                &keypoints,
            )?;
        }

        trace_event!("facedet_candidates", count = scratch.len());
        Ok(())
    }
}
