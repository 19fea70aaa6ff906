use criterion::{criterion_group, criterion_main, Criterion};
use detpost::lowlevel::{nms, NmsMode, NmsParams, Scratch};
use detpost::{CenterNetDecoder, DetectBox, PostConfig, PostContext, TensorView};
use std::hint::black_box;

fn make_heatmap(height: usize, width: usize, classes: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(height * width * classes);
    for i in 0..height * width * classes {
        data.push(((i * 37 + 11) % 101) as f32 / 101.0);
    }
    data
}

fn fill_candidates(scratch: &mut Scratch, count: usize) {
    for i in 0..count {
        let x = ((i * 13) % 89) as f32 / 100.0;
        let y = ((i * 7) % 83) as f32 / 100.0;
        scratch
            .push(DetectBox {
                xmin: x,
                ymin: y,
                xmax: (x + 0.12).min(1.0),
                ymax: (y + 0.12).min(1.0),
                score: ((i * 31 + 5) % 97) as f32 / 97.0,
                label: (i % 8) as i32,
            })
            .unwrap();
    }
}

fn bench_centernet_pipeline(c: &mut Criterion) {
    let height = 64;
    let width = 64;
    let classes = 4;
    let heat = make_heatmap(height, width, classes);
    let off = vec![0.25f32; height * width * 2];
    let size = vec![2.0f32; height * width * 2];

    let heat_shape = [1usize, height, width, classes];
    let map_shape = [1usize, height, width, 2];
    let heatmap = TensorView::from_f32(&heat_shape, &heat).unwrap();
    let offsets = TensorView::from_f32(&map_shape, &off).unwrap();
    let sizes = TensorView::from_f32(&map_shape, &size).unwrap();

    let decoder = CenterNetDecoder::new(0.6);
    let mut context = PostContext::new()
        .with_config(PostConfig {
            score_threshold: 0.6,
            iou_threshold: 0.45,
            max_per_class: Some(64),
            nms_mode: NmsMode::ClassAware,
        })
        .with_scratch_capacity(16384);

    c.bench_function("centernet_decode_nms_64x64x4", |b| {
        b.iter(|| {
            let count = context
                .run(&decoder, &[heatmap, offsets, sizes])
                .unwrap();
            black_box(count)
        });
    });
}

fn bench_nms(c: &mut Criterion) {
    for count in [256usize, 2048] {
        let mut scratch = Scratch::with_capacity(count);
        fill_candidates(&mut scratch, count);
        let params = NmsParams {
            score_threshold: 0.2,
            iou_threshold: 0.5,
            max_per_class: Some(100),
            mode: NmsMode::ClassAware,
        };

        c.bench_function(&format!("nms_{count}_candidates"), |b| {
            b.iter(|| black_box(nms(scratch.candidates(), &params, None)));
        });
    }
}

criterion_group!(benches, bench_centernet_pipeline, bench_nms);
criterion_main!(benches);
