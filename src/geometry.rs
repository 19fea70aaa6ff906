//! Box, keypoint, and orientation records plus the geometry helpers shared
//! by the decoders and the NMS engine.
//!
//! The record layouts are fixed (`#[repr(C)]`, field order as declared) so
//! they can cross an FFI boundary unchanged. Coordinates are normalized to
//! [0,1]; multiply by the image size to recover pixel locations.

/// Axis-aligned bounding box with score and label.
///
/// `label` indexes an external label table; the score scale is
/// architecture-defined and higher always means more confident.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectBox {
    /// Left-most normalized coordinate.
    pub xmin: f32,
    /// Top-most normalized coordinate.
    pub ymin: f32,
    /// Right-most normalized coordinate.
    pub xmax: f32,
    /// Bottom-most normalized coordinate.
    pub ymax: f32,
    /// Confidence score, higher implies more confident.
    pub score: f32,
    /// Label index into an external label table.
    pub label: i32,
}

impl DetectBox {
    /// Returns the box area in normalized units, zero for inverted boxes.
    pub fn area(&self) -> f32 {
        let w = (self.xmax - self.xmin).max(0.0);
        let h = (self.ymax - self.ymin).max(0.0);
        w * h
    }

    /// Denormalizes the corners into pixel coordinates for an image of the
    /// given size, returned as `(xmin, ymin, xmax, ymax)`.
    pub fn to_pixels(&self, width: u32, height: u32) -> (f32, f32, f32, f32) {
        (
            self.xmin * width as f32,
            self.ymin * height as f32,
            self.xmax * width as f32,
            self.ymax * height as f32,
        )
    }
}

/// A single keypoint with a confidence score.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

/// Head orientation as euler angles in radians.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EulerAngles {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// Intersection-over-union of two boxes.
///
/// Symmetric, in [0,1]. A box with zero area scores 0 against any other
/// box, including itself.
pub fn iou(a: &DetectBox, b: &DetectBox) -> f32 {
    let area_a = a.area();
    let area_b = b.area();
    if area_a == 0.0 || area_b == 0.0 {
        return 0.0;
    }

    let inter_xmin = a.xmin.max(b.xmin);
    let inter_ymin = a.ymin.max(b.ymin);
    let inter_xmax = a.xmax.min(b.xmax);
    let inter_ymax = a.ymax.min(b.ymax);

    let inter_w = (inter_xmax - inter_xmin).max(0.0);
    let inter_h = (inter_ymax - inter_ymin).max(0.0);
    let inter = inter_w * inter_h;
    if inter == 0.0 {
        return 0.0;
    }

    let union = area_a + area_b - inter;
    inter / union
}

/// Clamps a normalized coordinate into [0,1].
#[inline]
pub(crate) fn clamp_unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Logistic function used by sigmoid-output decoders.
#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
