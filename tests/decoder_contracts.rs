use detpost::lowlevel::Scratch;
use detpost::{
    CenterNetDecoder, Decode, DetPostError, DetPostResult, DetectBox, NmsMode, PostConfig,
    PostContext, Quantization, TensorData, TensorType, TensorView,
};

/// A caller-supplied decoder reading `[N,5]` rows of
/// `(xmin, ymin, xmax, ymax, score)` directly.
struct RowDecoder {
    score_threshold: f32,
}

impl Decode for RowDecoder {
    fn decode(&self, outputs: &[TensorView<'_>], scratch: &mut Scratch) -> DetPostResult<()> {
        if outputs.len() != 1 {
            return Err(DetPostError::InvalidParameter("expected one output tensor"));
        }
        let rows = outputs[0];
        let shape = rows.shape();
        let [n, 5] = shape else {
            return Err(DetPostError::InvalidShape {
                context: "rows must be [N,5]",
                shape: shape.to_vec(),
            });
        };
        let data = rows.samples()?;

        scratch.clear();
        for row in 0..*n {
            let base = row * 5;
            let score = data.get(base + 4);
            if score < self.score_threshold {
                continue;
            }
            scratch.push(DetectBox {
                xmin: data.get(base),
                ymin: data.get(base + 1),
                xmax: data.get(base + 2),
                ymax: data.get(base + 3),
                score,
                label: 0,
            })?;
        }
        Ok(())
    }
}

fn config() -> PostConfig {
    PostConfig {
        score_threshold: 0.3,
        iou_threshold: 0.5,
        max_per_class: None,
        nms_mode: NmsMode::ClassAware,
    }
}

#[test]
fn custom_decoder_runs_through_the_same_interface() {
    let rows = [
        0.1f32, 0.1, 0.3, 0.3, 0.9, //
        0.6, 0.6, 0.8, 0.8, 0.2,
    ];
    let view = TensorView::from_f32(&[2, 5], &rows).unwrap();

    let decoder = RowDecoder {
        score_threshold: 0.1,
    };
    let mut context = PostContext::new().with_config(config());
    let count = context.run(&decoder, &[view]).unwrap();
    // The second row falls below the NMS score threshold.
    assert_eq!(count, 1);
}

#[test]
fn unsupported_element_type_is_rejected() {
    let heat = [0i32; 16];
    let off = [0.0f32; 32];
    let heat_shape = [1usize, 4, 4, 1];
    let off_shape = [1usize, 4, 4, 2];
    let heatmap = TensorView::new(&heat_shape, TensorData::I32(&heat)).unwrap();
    let offsets = TensorView::from_f32(&off_shape, &off).unwrap();
    let sizes = TensorView::from_f32(&off_shape, &off).unwrap();

    let mut scratch = Scratch::new();
    let err = CenterNetDecoder::new(0.5)
        .decode(&[heatmap, offsets, sizes], &mut scratch)
        .err()
        .unwrap();
    assert_eq!(err, DetPostError::UnsupportedTensorType(TensorType::I32));
}

#[test]
fn quantized_heatmap_decodes_like_float() {
    // Peak of 0.75 encoded as u8 with scale 1/128 around zero-point 0.
    let mut heat = vec![0u8; 16];
    heat[5] = 96;
    let off = vec![0.0f32; 32];
    let mut size = vec![0.0f32; 32];
    for v in size.iter_mut() {
        *v = 1.0;
    }

    let heat_shape = [1usize, 4, 4, 1];
    let off_shape = [1usize, 4, 4, 2];
    let heatmap = TensorView::new(&heat_shape, TensorData::U8(&heat))
        .unwrap()
        .with_quant(Quantization::new(1.0 / 128.0, 0).unwrap())
        .unwrap();
    let offsets = TensorView::from_f32(&off_shape, &off).unwrap();
    let sizes = TensorView::from_f32(&off_shape, &size).unwrap();

    let mut scratch = Scratch::new();
    CenterNetDecoder::new(0.5)
        .decode(&[heatmap, offsets, sizes], &mut scratch)
        .unwrap();
    assert_eq!(scratch.len(), 1);
    assert!((scratch.candidates()[0].bbox.score - 0.75).abs() < 1e-6);
}

#[test]
fn surplus_output_tensors_are_rejected() {
    let heat = [0.0f32; 16];
    let off = [0.0f32; 32];
    let heat_shape = [1usize, 4, 4, 1];
    let off_shape = [1usize, 4, 4, 2];
    let heatmap = TensorView::from_f32(&heat_shape, &heat).unwrap();
    let offsets = TensorView::from_f32(&off_shape, &off).unwrap();
    let sizes = TensorView::from_f32(&off_shape, &off).unwrap();

    let mut scratch = Scratch::new();
    let err = CenterNetDecoder::new(0.5)
        .decode(&[heatmap, offsets, sizes, heatmap], &mut scratch)
        .err()
        .unwrap();
    assert_eq!(err, DetPostError::TooManyInputs { max: 3, got: 4 });
}

#[test]
fn validation_error_leaves_scratch_untouched() {
    let heat = [0.9f32; 16];
    let off = [0.0f32; 32];
    let heat_shape = [1usize, 4, 4, 1];
    let off_shape = [1usize, 4, 4, 2];
    let bad_shape = [1usize, 2, 2, 2];
    let bad = [0.0f32; 8];

    let heatmap = TensorView::from_f32(&heat_shape, &heat).unwrap();
    let offsets = TensorView::from_f32(&off_shape, &off).unwrap();
    let sizes = TensorView::from_f32(&off_shape, &off).unwrap();
    let bad_sizes = TensorView::from_f32(&bad_shape, &bad).unwrap();

    let decoder = CenterNetDecoder::new(0.5);
    let mut scratch = Scratch::new();
    decoder.decode(&[heatmap, offsets, sizes], &mut scratch).unwrap();
    let before = scratch.candidates().to_vec();
    assert!(!before.is_empty());

    assert!(decoder
        .decode(&[heatmap, offsets, bad_sizes], &mut scratch)
        .is_err());
    assert_eq!(scratch.candidates(), before.as_slice());
}
