//! The processing context tying configuration, scratch, and results
//! together.

use crate::candidate::nms::{nms, ClassFilter, NmsMode, NmsParams};
use crate::candidate::Scratch;
use crate::decoder::Decode;
use crate::geometry::{DetectBox, EulerAngles, Keypoint};
use crate::results::ResultSet;
use crate::tensor::TensorView;
use crate::trace::trace_span;
use crate::util::{DetPostError, DetPostResult};

/// Post-processing configuration applied at the NMS stage.
///
/// Decoder-side thresholds live on the decoder configs; these parameters
/// govern suppression and output bounding.
#[derive(Clone, Copy, Debug)]
pub struct PostConfig {
    /// Minimum score a candidate must reach to survive suppression.
    pub score_threshold: f32,
    /// Maximum overlap a kept box may have with a higher-ranked keep.
    pub iou_threshold: f32,
    /// Per-class cap on kept boxes; `None` is unbounded and `Some(0)` the
    /// literal empty cap.
    pub max_per_class: Option<u32>,
    /// Suppression grouping mode.
    pub nms_mode: NmsMode,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            iou_threshold: 0.5,
            max_per_class: None,
            nms_mode: NmsMode::ClassAware,
        }
    }
}

/// A single-model post-processing context.
///
/// Owns the scratch arena and result store, so one context must not be
/// driven from multiple threads at once. Independent contexts share no
/// mutable state and may run concurrently.
///
/// ```
/// use detpost::{CenterNetDecoder, PostContext, TensorView};
///
/// let mut context = PostContext::new();
/// let heat = vec![0.0f32; 16];
/// let reg = vec![0.0f32; 32];
/// let heatmap = TensorView::from_f32(&[1, 4, 4, 1], &heat).unwrap();
/// let offsets = TensorView::from_f32(&[1, 4, 4, 2], &reg).unwrap();
/// let sizes = TensorView::from_f32(&[1, 4, 4, 2], &reg).unwrap();
///
/// let decoder = CenterNetDecoder::new(0.5);
/// let count = context.run(&decoder, &[heatmap, offsets, sizes]).unwrap();
/// assert_eq!(count, 0);
/// ```
#[derive(Debug, Default)]
pub struct PostContext {
    config: PostConfig,
    filter: Option<ClassFilter>,
    scratch: Scratch,
    results: ResultSet,
}

impl PostContext {
    /// Creates a context with default configuration and scratch capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: PostConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the scratch arena with one of the given candidate capacity.
    pub fn with_scratch_capacity(mut self, capacity: usize) -> Self {
        self.scratch = Scratch::with_capacity(capacity);
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &PostConfig {
        &self.config
    }

    /// Replaces the class filter. An empty slice clears it; negative
    /// indices are rejected and leave the previous filter in place.
    pub fn set_class_filter(&mut self, classes: &[i32]) -> DetPostResult<()> {
        if classes.is_empty() {
            self.filter = None;
            return Ok(());
        }
        self.filter = Some(ClassFilter::new(classes)?);
        Ok(())
    }

    /// Returns the active class filter, if any.
    pub fn class_filter(&self) -> Option<&ClassFilter> {
        self.filter.as_ref()
    }

    /// Runs a decoder over the model outputs followed by suppression and
    /// returns the number of boxes kept.
    ///
    /// On error the result store keeps the previous run's results; a
    /// successful run overwrites them.
    pub fn run(&mut self, decoder: &dyn Decode, outputs: &[TensorView<'_>]) -> DetPostResult<usize> {
        let _guard = trace_span!("postprocess_run").entered();

        decoder.decode(outputs, &mut self.scratch)?;
        let params = NmsParams {
            score_threshold: self.config.score_threshold,
            iou_threshold: self.config.iou_threshold,
            max_per_class: self.config.max_per_class,
            mode: self.config.nms_mode,
        };
        let kept = nms(self.scratch.candidates(), &params, self.filter.as_ref());
        self.results.replace_from(&kept, &self.scratch);
        Ok(self.results.boxes().len())
    }

    /// Runs suppression directly over score and box tensors, for models
    /// whose graph already emits decoded boxes.
    ///
    /// `scores` is `[N]` (single class) or `[N,C]` (per-class scores);
    /// `boxes` is `[N,4]` as `(xmin, ymin, xmax, ymax)` in normalized
    /// coordinates. Returns the number of boxes kept.
    pub fn run_nms(
        &mut self,
        scores: &TensorView<'_>,
        boxes: &TensorView<'_>,
    ) -> DetPostResult<usize> {
        let _guard = trace_span!("nms_run").entered();

        let (rows, classes) = match scores.shape() {
            [n] => (*n, 1),
            [n, c] => (*n, *c),
            [1, n, c] => (*n, *c),
            shape => {
                return Err(DetPostError::InvalidShape {
                    context: "scores must be [N] or [N,C]",
                    shape: shape.to_vec(),
                })
            }
        };
        let box_shape = boxes.shape();
        if !matches!(box_shape, [n, 4] | [1, n, 4] if *n == rows) {
            return Err(DetPostError::ShapeMismatch {
                context: "boxes must be [N,4] with N matching scores",
                expected: vec![rows, 4],
                got: box_shape.to_vec(),
            });
        }
        let score_data = scores.samples()?;
        let box_data = boxes.samples()?;

        let score_filtering =
            self.config.score_threshold.is_finite() && self.config.score_threshold >= 0.0;
        self.scratch.clear();
        for row in 0..rows {
            for class in 0..classes {
                let score = score_data.get(row * classes + class);
                if !score.is_finite() {
                    continue;
                }
                if score_filtering && score < self.config.score_threshold {
                    continue;
                }
                self.scratch.push(DetectBox {
                    xmin: box_data.get(row * 4),
                    ymin: box_data.get(row * 4 + 1),
                    xmax: box_data.get(row * 4 + 2),
                    ymax: box_data.get(row * 4 + 3),
                    score,
                    label: class as i32,
                })?;
            }
        }

        let params = NmsParams {
            score_threshold: self.config.score_threshold,
            iou_threshold: self.config.iou_threshold,
            max_per_class: self.config.max_per_class,
            mode: self.config.nms_mode,
        };
        let kept = nms(self.scratch.candidates(), &params, self.filter.as_ref());
        self.results.replace_from(&kept, &self.scratch);
        Ok(self.results.boxes().len())
    }

    /// Fills `out` with the ranked boxes and returns the total available.
    /// Before any successful run the count is 0, not an error.
    pub fn boxes(&self, out: &mut [DetectBox]) -> usize {
        self.results.fill_boxes(out)
    }

    /// Fills `out` with keypoints and returns the total available.
    pub fn keypoints(&self, out: &mut [Keypoint]) -> usize {
        self.results.fill_keypoints(out)
    }

    /// Fills `out` with the orientation and returns the count (0 or 1).
    pub fn euler(&self, out: &mut [EulerAngles]) -> usize {
        self.results.fill_euler(out)
    }

    /// Returns the full result set of the last successful run.
    pub fn results(&self) -> &ResultSet {
        &self.results
    }
}
