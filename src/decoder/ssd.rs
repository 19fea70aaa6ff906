//! SSD standard-box decoder.
//!
//! SSD heads predict per-anchor regression deltas against a fixed anchor
//! set plus per-anchor class scores. Anchors are center-form
//! `(cx, cy, w, h)` in normalized coordinates; deltas are scaled by the
//! usual `(0.1, 0.2)` variances before application.

use crate::candidate::Scratch;
use crate::decoder::{expect_outputs, row_dims, Decode};
use crate::geometry::{clamp_unit, DetectBox};
use crate::tensor::{Samples, TensorView};
use crate::trace::{trace_event, trace_span};
use crate::util::{DetPostError, DetPostResult};

/// SSD decoding parameters.
#[derive(Clone, Copy, Debug)]
pub struct SsdConfig {
    /// Minimum per-class score; anchor/class pairs below it are skipped.
    pub score_threshold: f32,
    /// Center and size delta variances.
    pub variances: [f32; 2],
}

impl Default for SsdConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            variances: [0.1, 0.2],
        }
    }
}

/// Decoder for SSD score/regression/anchor triples.
///
/// Expects class scores `[N,C]`, regression deltas `[N,4]`, and anchors
/// `[N,4]`. Scores are assumed to be probabilities already.
#[derive(Clone, Copy, Debug)]
pub struct SsdDecoder {
    config: SsdConfig,
}

impl SsdDecoder {
    /// Creates a decoder with the given threshold and default variances.
    pub fn new(score_threshold: f32) -> Self {
        Self {
            config: SsdConfig {
                score_threshold,
                ..SsdConfig::default()
            },
        }
    }

    /// Creates a decoder from an explicit configuration.
    pub fn from_config(config: SsdConfig) -> Self {
        Self { config }
    }
}

/// Applies center-form regression deltas to one anchor.
///
/// Returns `None` when the decoded extents are not finite, which callers
/// treat as a skipped candidate rather than an error.
pub(crate) fn decode_anchor_box(
    anchors: &Samples<'_>,
    deltas: &Samples<'_>,
    row: usize,
    delta_stride: usize,
    variances: [f32; 2],
) -> Option<(f32, f32, f32, f32)> {
    let acx = anchors.get(row * 4);
    let acy = anchors.get(row * 4 + 1);
    let aw = anchors.get(row * 4 + 2);
    let ah = anchors.get(row * 4 + 3);

    let base = row * delta_stride;
    let cx = acx + deltas.get(base) * variances[0] * aw;
    let cy = acy + deltas.get(base + 1) * variances[0] * ah;
    let w = aw * (deltas.get(base + 2) * variances[1]).exp();
    let h = ah * (deltas.get(base + 3) * variances[1]).exp();

    if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) {
        return None;
    }
    Some((
        clamp_unit(cx - w / 2.0),
        clamp_unit(cy - h / 2.0),
        clamp_unit(cx + w / 2.0),
        clamp_unit(cy + h / 2.0),
    ))
}

impl Decode for SsdDecoder {
    fn decode(&self, outputs: &[TensorView<'_>], scratch: &mut Scratch) -> DetPostResult<()> {
        let _guard = trace_span!("ssd_decode").entered();
        let [scores, trans, anchors] = expect_outputs::<3>(outputs)?;

        let (rows, classes) = row_dims(scores, "scores must be [N,C]")?;
        let (trans_rows, trans_c) = row_dims(trans, "regression must be [N,4]")?;
        let (anchor_rows, anchor_c) = row_dims(anchors, "anchors must be [N,4]")?;
        if trans_c != 4 || trans_rows != rows {
            return Err(DetPostError::ShapeMismatch {
                context: "regression rows must match scores with 4 channels",
                expected: vec![rows, 4],
                got: vec![trans_rows, trans_c],
            });
        }
        if anchor_c != 4 || anchor_rows != rows {
            return Err(DetPostError::ShapeMismatch {
                context: "anchor rows must match scores with 4 channels",
                expected: vec![rows, 4],
                got: vec![anchor_rows, anchor_c],
            });
        }

        let score_data = scores.samples()?;
        let trans_data = trans.samples()?;
        let anchor_data = anchors.samples()?;

        scratch.clear();
        for row in 0..rows {
            let decoded = decode_anchor_box(&anchor_data, &trans_data, row, 4, self.config.variances);
            let Some((xmin, ymin, xmax, ymax)) = decoded else {
                continue;
            };
            for class in 0..classes {
                let score = score_data.get(row * classes + class);
                if !score.is_finite() || score < self.config.score_threshold {
                    continue;
                }
                scratch.push(DetectBox {
                    xmin,
                    ymin,
                    xmax,
                    ymax,
                    score,
                    label: class as i32,
                })?;
            }
        }

        trace_event!("ssd_candidates", count = scratch.len());
        Ok(())
    }
}
