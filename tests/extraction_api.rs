use detpost::{
    DetectBox, EulerAngles, FaceDetDecoder, HeadPoseDecoder, Keypoint, NmsMode, PostConfig,
    PostContext, SsdDecoder, TensorView,
};

fn zero_box() -> DetectBox {
    DetectBox {
        xmin: 0.0,
        ymin: 0.0,
        xmax: 0.0,
        ymax: 0.0,
        score: 0.0,
        label: -1,
    }
}

/// Runs an SSD decode producing three well-separated boxes of one class.
fn context_with_three_boxes() -> PostContext {
    let scores = [0.9f32, 0.8, 0.7];
    let trans = [0.0f32; 12];
    let anchors = [
        0.15f32, 0.15, 0.1, 0.1, //
        0.5, 0.5, 0.1, 0.1, //
        0.85, 0.85, 0.1, 0.1,
    ];

    let scores_view = TensorView::from_f32(&[3, 1], &scores).unwrap();
    let trans_view = TensorView::from_f32(&[3, 4], &trans).unwrap();
    let anchors_view = TensorView::from_f32(&[3, 4], &anchors).unwrap();

    let mut context = PostContext::new().with_config(PostConfig {
        score_threshold: 0.5,
        iou_threshold: 0.5,
        max_per_class: None,
        nms_mode: NmsMode::ClassAware,
    });
    let decoder = SsdDecoder::new(0.5);
    let count = context
        .run(&decoder, &[scores_view, trans_view, anchors_view])
        .unwrap();
    assert_eq!(count, 3);
    context
}

#[test]
fn count_query_fill_and_refill_agree() {
    let context = context_with_three_boxes();

    // Capacity 0: count only, nothing written.
    assert_eq!(context.boxes(&mut []), 3);

    // Exact capacity fills all records.
    let mut exact = [zero_box(); 3];
    assert_eq!(context.boxes(&mut exact), 3);

    // Larger capacity returns the same records.
    let mut larger = [zero_box(); 8];
    assert_eq!(context.boxes(&mut larger), 3);
    assert_eq!(&larger[..3], &exact[..]);
    assert_eq!(larger[3], zero_box());
}

#[test]
fn truncated_fill_returns_the_highest_ranked_prefix() {
    let context = context_with_three_boxes();

    let mut full = [zero_box(); 3];
    context.boxes(&mut full);

    let mut short = [zero_box(); 2];
    assert_eq!(context.boxes(&mut short), 3);
    assert_eq!(&short[..], &full[..2]);
    assert!(short[0].score >= short[1].score);
}

#[test]
fn keypoints_follow_their_kept_detection() {
    // One confident prior with two landmarks.
    let priors = [0.5f32, 0.5, 0.2, 0.2];
    let loc = [0.0f32, 0.0, 0.0, 0.0, -1.0, -1.0, 1.0, 1.0];
    let iou = [1.0f32];
    let conf = [0.0f32, 1.0];

    let priors_view = TensorView::from_f32(&[1, 4], &priors).unwrap();
    let loc_view = TensorView::from_f32(&[1, 8], &loc).unwrap();
    let iou_view = TensorView::from_f32(&[1], &iou).unwrap();
    let conf_view = TensorView::from_f32(&[1, 2], &conf).unwrap();

    let mut context = PostContext::new().with_config(PostConfig {
        score_threshold: 0.5,
        iou_threshold: 0.5,
        max_per_class: None,
        nms_mode: NmsMode::ClassAware,
    });
    let decoder = FaceDetDecoder::new(0.5);
    context
        .run(&decoder, &[priors_view, loc_view, iou_view, conf_view])
        .unwrap();

    assert_eq!(context.keypoints(&mut []), 2);
    let mut out = [Keypoint {
        x: 0.0,
        y: 0.0,
        score: 0.0,
    }; 2];
    assert_eq!(context.keypoints(&mut out), 2);
    // Landmark deltas of ±1 shift by variance * prior size = 0.02.
    assert!((out[0].x - 0.48).abs() < 1e-6);
    assert!((out[1].x - 0.52).abs() < 1e-6);
}

#[test]
fn euler_extraction_reports_exactly_one_when_present() {
    let angles = [0.25f32, -0.5, 1.0];
    let view = TensorView::from_f32(&[3], &angles).unwrap();

    let mut context = PostContext::new();
    assert_eq!(context.euler(&mut []), 0);

    context.run(&HeadPoseDecoder::new(), &[view]).unwrap();
    assert_eq!(context.euler(&mut []), 1);

    let mut out = [EulerAngles {
        yaw: 0.0,
        pitch: 0.0,
        roll: 0.0,
    }];
    assert_eq!(context.euler(&mut out), 1);
    assert!((out[0].yaw - 0.25).abs() < 1e-6);
    assert!((out[0].pitch + 0.5).abs() < 1e-6);
    assert!((out[0].roll - 1.0).abs() < 1e-6);
}
