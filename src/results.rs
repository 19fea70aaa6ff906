//! Result storage and the query/fill extraction contract.
//!
//! Every extraction method fills as many records as the output slice holds
//! and returns the total number available, so a call with an empty slice is
//! a pure count query and a short slice reports truncation through the
//! larger return value.

use crate::candidate::{Candidate, Scratch};
use crate::geometry::{DetectBox, EulerAngles, Keypoint};

/// Results of the most recent successful decode+NMS run.
///
/// Boxes are ranked per class by descending score with ties broken by
/// decode order; relative ordering across classes carries no score meaning.
#[derive(Clone, Debug, Default)]
pub struct ResultSet {
    boxes: Vec<DetectBox>,
    keypoints: Vec<Keypoint>,
    euler: Option<EulerAngles>,
}

impl ResultSet {
    /// Replaces the stored results with the kept candidates of a run.
    pub(crate) fn replace_from(&mut self, kept: &[Candidate], scratch: &Scratch) {
        self.boxes.clear();
        self.keypoints.clear();
        self.boxes.extend(kept.iter().map(|c| c.bbox));
        for candidate in kept {
            self.keypoints
                .extend_from_slice(scratch.keypoints_of(candidate));
        }
        self.euler = scratch.euler();
    }

    /// Returns the ranked boxes.
    pub fn boxes(&self) -> &[DetectBox] {
        &self.boxes
    }

    /// Returns the keypoints of the kept detections, in box order.
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Returns the decoded orientation, if the last run produced one.
    pub fn euler(&self) -> Option<EulerAngles> {
        self.euler
    }

    /// Fills `out` with the highest-ranked boxes and returns the total
    /// number available.
    pub fn fill_boxes(&self, out: &mut [DetectBox]) -> usize {
        let n = out.len().min(self.boxes.len());
        out[..n].copy_from_slice(&self.boxes[..n]);
        self.boxes.len()
    }

    /// Fills `out` with keypoints and returns the total number available.
    pub fn fill_keypoints(&self, out: &mut [Keypoint]) -> usize {
        let n = out.len().min(self.keypoints.len());
        out[..n].copy_from_slice(&self.keypoints[..n]);
        self.keypoints.len()
    }

    /// Fills `out` with the orientation and returns the number available,
    /// currently always 0 or 1.
    pub fn fill_euler(&self, out: &mut [EulerAngles]) -> usize {
        match self.euler {
            Some(euler) => {
                if let Some(slot) = out.first_mut() {
                    *slot = euler;
                }
                1
            }
            None => 0,
        }
    }
}
