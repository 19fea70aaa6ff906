//! YOLO decoder.
//!
//! YOLO heads emit one feature map per detection scale. Each grid cell
//! carries `A` anchor slots of `(tx, ty, tw, th, objectness, classes...)`
//! raw logits. Centers decode from sigmoid offsets within the cell, extents
//! from the anchor dimensions scaled by `exp`, and the candidate score is
//! objectness times the per-class probability.

use crate::candidate::Scratch;
use crate::decoder::{spatial_dims, Decode};
use crate::geometry::{clamp_unit, sigmoid, DetectBox};
use crate::tensor::TensorView;
use crate::trace::{trace_event, trace_span};
use crate::util::{DetPostError, DetPostResult};

/// Anchor dimensions in input-resolution pixels, one row per scale,
/// ordered from the largest grid (smallest stride) to the smallest.
struct AnchorTable {
    scales: &'static [&'static [[f32; 2]]],
}

/// Built-in anchor configurations selected by `model_idx`.
///
/// Index 0 is the three-scale nine-anchor layout, index 1 the two-scale
/// tiny layout. Anchor dimensions are defined against the canonical 416
/// input and rescale with `input_shape`.
const ANCHOR_TABLES: &[AnchorTable] = &[
    AnchorTable {
        scales: &[
            &[[10.0, 13.0], [16.0, 30.0], [33.0, 23.0]],
            &[[30.0, 61.0], [62.0, 45.0], [59.0, 119.0]],
            &[[116.0, 90.0], [156.0, 198.0], [373.0, 326.0]],
        ],
    },
    AnchorTable {
        scales: &[
            &[[10.0, 14.0], [23.0, 27.0], [37.0, 58.0]],
            &[[81.0, 82.0], [135.0, 169.0], [344.0, 319.0]],
        ],
    },
];

/// Canonical input resolution the anchor tables are defined against.
const ANCHOR_BASE_SHAPE: f32 = 416.0;

/// YOLO decoding parameters.
#[derive(Clone, Copy, Debug)]
pub struct YoloConfig {
    /// Network input resolution the grids were produced for.
    pub input_shape: usize,
    /// Selects the built-in anchor table.
    pub model_idx: usize,
    /// Minimum decoded score; combinations below it are skipped.
    pub score_threshold: f32,
}

/// Decoder for multi-scale YOLO feature maps.
///
/// Expects one `[1,H,W,A*(5+C)]` tensor per scale in the anchor table,
/// largest grid first.
#[derive(Clone, Copy, Debug)]
pub struct YoloDecoder {
    config: YoloConfig,
}

impl YoloDecoder {
    /// Creates a decoder, validating the anchor-table index and input
    /// resolution up front.
    pub fn new(config: YoloConfig) -> DetPostResult<Self> {
        if config.model_idx >= ANCHOR_TABLES.len() {
            return Err(DetPostError::InvalidParameter(
                "model_idx does not select a built-in anchor table",
            ));
        }
        if config.input_shape == 0 {
            return Err(DetPostError::InvalidParameter(
                "input_shape must be non-zero",
            ));
        }
        Ok(Self { config })
    }

    fn table(&self) -> &'static AnchorTable {
        &ANCHOR_TABLES[self.config.model_idx]
    }

    fn validate_scale(
        &self,
        features: &TensorView<'_>,
        anchors: &'static [[f32; 2]],
    ) -> DetPostResult<(usize, usize, usize)> {
        let (height, width, depth) = spatial_dims(features, "features must be [1,H,W,A*(5+C)]")?;
        let num_anchors = anchors.len();
        if depth % num_anchors != 0 || depth / num_anchors <= 5 {
            return Err(DetPostError::InvalidShape {
                context: "feature depth must be A*(5+C) with C >= 1",
                shape: features.shape().to_vec(),
            });
        }
        if self.config.input_shape % width != 0 || self.config.input_shape % height != 0 {
            return Err(DetPostError::InvalidShape {
                context: "grid must divide the input resolution",
                shape: features.shape().to_vec(),
            });
        }
        features.samples()?;
        Ok((height, width, depth))
    }

    fn decode_scale(
        &self,
        features: &TensorView<'_>,
        anchors: &'static [[f32; 2]],
        scratch: &mut Scratch,
    ) -> DetPostResult<()> {
        let (height, width, depth) = self.validate_scale(features, anchors)?;
        let num_anchors = anchors.len();
        let classes = depth / num_anchors - 5;
        let data = features.samples()?;
        let anchor_scale = self.config.input_shape as f32 / ANCHOR_BASE_SHAPE;
        let input = self.config.input_shape as f32;

        for y in 0..height {
            for x in 0..width {
                for (a, anchor) in anchors.iter().enumerate() {
                    let base = ((y * width + x) * num_anchors + a) * (5 + classes);
                    let obj = sigmoid(data.get(base + 4));
                    if !obj.is_finite() || obj < self.config.score_threshold {
                        continue;
                    }

                    let cx = (x as f32 + sigmoid(data.get(base))) / width as f32;
                    let cy = (y as f32 + sigmoid(data.get(base + 1))) / height as f32;
                    let bw = anchor[0] * anchor_scale * data.get(base + 2).exp() / input;
                    let bh = anchor[1] * anchor_scale * data.get(base + 3).exp() / input;
                    if !(bw.is_finite() && bh.is_finite()) {
                        continue;
                    }

                    for class in 0..classes {
                        let score = obj * sigmoid(data.get(base + 5 + class));
                        if !score.is_finite() || score < self.config.score_threshold {
                            continue;
                        }
                        scratch.push(DetectBox {
                            xmin: clamp_unit(cx - bw / 2.0),
                            ymin: clamp_unit(cy - bh / 2.0),
                            xmax: clamp_unit(cx + bw / 2.0),
                            ymax: clamp_unit(cy + bh / 2.0),
                            score,
                            label: class as i32,
                        })?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Decode for YoloDecoder {
    fn decode(&self, outputs: &[TensorView<'_>], scratch: &mut Scratch) -> DetPostResult<()> {
        let _guard = trace_span!("yolo_decode").entered();

        let table = self.table();
        if outputs.len() > table.scales.len() {
            return Err(DetPostError::TooManyInputs {
                max: table.scales.len(),
                got: outputs.len(),
            });
        }
        if outputs.len() < table.scales.len() {
            return Err(DetPostError::InvalidParameter(
                "one feature tensor per anchor scale is required",
            ));
        }

        // Validate every scale before the first push so a bad tensor
        // cannot leave partially decoded output behind.
        for (features, anchors) in outputs.iter().zip(table.scales.iter().copied()) {
            self.validate_scale(features, anchors)?;
        }

        scratch.clear();
        for (features, anchors) in outputs.iter().zip(table.scales.iter().copied()) {
            self.decode_scale(features, anchors, scratch)?;
        }

        trace_event!("yolo_candidates", count = scratch.len());
        Ok(())
    }
}
