//! CenterNet decoder.
//!
//! CenterNet predicts a per-class heatmap over a spatial grid together with
//! sub-cell center offsets and per-cell box extents. Decoding locates local
//! maxima in the heatmap, refines each center with the offset map, and reads
//! the box size from the size map.

use crate::candidate::Scratch;
use crate::decoder::{expect_outputs, spatial_dims, Decode};
use crate::geometry::{clamp_unit, sigmoid, DetectBox};
use crate::tensor::{Samples, TensorView};
use crate::trace::{trace_event, trace_span};
use crate::util::{DetPostError, DetPostResult};

/// CenterNet decoding parameters.
#[derive(Clone, Copy, Debug)]
pub struct CenterNetConfig {
    /// Minimum peak score; peaks below it are skipped.
    pub score_threshold: f32,
    /// Apply the logistic to raw heatmap logits before thresholding.
    /// When false the heatmap is assumed to hold probabilities already.
    pub sigmoid_scores: bool,
}

impl Default for CenterNetConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            sigmoid_scores: false,
        }
    }
}

/// Decoder for CenterNet heatmap/offset/size output triples.
///
/// Expects three output tensors: a heatmap `[1,H,W,C]`, center offsets
/// `[1,H,W,2]`, and box sizes `[1,H,W,2]` (grid units; channel 0 is x).
#[derive(Clone, Copy, Debug)]
pub struct CenterNetDecoder {
    config: CenterNetConfig,
}

impl CenterNetDecoder {
    /// Creates a decoder for heatmaps that already hold probabilities.
    pub fn new(score_threshold: f32) -> Self {
        Self {
            config: CenterNetConfig {
                score_threshold,
                sigmoid_scores: false,
            },
        }
    }

    /// Creates a decoder that applies the logistic to raw heatmap logits.
    pub fn with_sigmoid(score_threshold: f32) -> Self {
        Self {
            config: CenterNetConfig {
                score_threshold,
                sigmoid_scores: true,
            },
        }
    }

    /// Creates a decoder from an explicit configuration.
    pub fn from_config(config: CenterNetConfig) -> Self {
        Self { config }
    }

    /// Decodes a heatmap/offset/size triple into `scratch`.
    pub fn decode_maps(
        &self,
        heatmap: &TensorView<'_>,
        offsets: &TensorView<'_>,
        sizes: &TensorView<'_>,
        scratch: &mut Scratch,
    ) -> DetPostResult<()> {
        let _guard = trace_span!("centernet_decode").entered();

        let (height, width, classes) = spatial_dims(heatmap, "heatmap must be [1,H,W,C]")?;
        let (off_h, off_w, off_c) = spatial_dims(offsets, "offsets must be [1,H,W,2]")?;
        let (size_h, size_w, size_c) = spatial_dims(sizes, "sizes must be [1,H,W,2]")?;

        if off_c != 2 || (off_h, off_w) != (height, width) {
            return Err(DetPostError::ShapeMismatch {
                context: "offset map must match the heatmap grid with 2 channels",
                expected: vec![height, width, 2],
                got: vec![off_h, off_w, off_c],
            });
        }
        if size_c != 2 || (size_h, size_w) != (height, width) {
            return Err(DetPostError::ShapeMismatch {
                context: "size map must match the heatmap grid with 2 channels",
                expected: vec![height, width, 2],
                got: vec![size_h, size_w, size_c],
            });
        }

        let heat = heatmap.samples()?;
        let off = offsets.samples()?;
        let size = sizes.samples()?;

        scratch.clear();
        for class in 0..classes {
            self.scan_class(&heat, &off, &size, height, width, classes, class, scratch)?;
        }

        trace_event!("centernet_candidates", count = scratch.len());
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_class(
        &self,
        heat: &Samples<'_>,
        off: &Samples<'_>,
        size: &Samples<'_>,
        height: usize,
        width: usize,
        classes: usize,
        class: usize,
        scratch: &mut Scratch,
    ) -> DetPostResult<()> {
        let at = |y: usize, x: usize| heat.get((y * width + x) * classes + class);

        for y in 0..height {
            for x in 0..width {
                let raw = at(y, x);
                if !raw.is_finite() {
                    continue;
                }
                let score = if self.config.sigmoid_scores {
                    sigmoid(raw)
                } else {
                    raw
                };
                if score < self.config.score_threshold {
                    continue;
                }
                if !is_peak(&at, raw, y, x, height, width) {
                    continue;
                }

                let cell = (y * width + x) * 2;
                let cx = (x as f32 + off.get(cell)) / width as f32;
                let cy = (y as f32 + off.get(cell + 1)) / height as f32;
                let bw = size.get(cell) / width as f32;
                let bh = size.get(cell + 1) / height as f32;
                if !(cx.is_finite() && cy.is_finite() && bw.is_finite() && bh.is_finite()) {
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
        Ok(())
    }
}

/// Local-maximum test over the 3x3 neighborhood.
///
/// Ties resolve by raster order: a cell wins only if strictly greater than
/// every defined neighbor that precedes it in raster order and at least as
/// large as every later one, so exactly one cell survives per tied plateau.
fn is_peak(
    at: &impl Fn(usize, usize) -> f32,
    value: f32,
    y: usize,
    x: usize,
    height: usize,
    width: usize,
) -> bool {
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            if dy == 0 && dx == 0 {
                continue;
            }
            let ny = y as i32 + dy;
            let nx = x as i32 + dx;
            if ny < 0 || nx < 0 || ny >= height as i32 || nx >= width as i32 {
                continue;
            }
            let neighbor = at(ny as usize, nx as usize);
            let precedes = dy < 0 || (dy == 0 && dx < 0);
            if precedes {
                if neighbor >= value {
                    return false;
                }
            } else if neighbor > value {
                return false;
            }
        }
    }
    true
}

impl Decode for CenterNetDecoder {
    fn decode(&self, outputs: &[TensorView<'_>], scratch: &mut Scratch) -> DetPostResult<()> {
        let [heatmap, offsets, sizes] = expect_outputs::<3>(outputs)?;
        self.decode_maps(heatmap, offsets, sizes, scratch)
    }
}
