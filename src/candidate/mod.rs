//! Detection candidates and the scratch arena decoders write into.
//!
//! Decoders produce unordered [`Candidate`]s; the NMS engine consumes them.
//! Ordering is deterministic: descending score with ties broken by the
//! ascending decode-order index.

use std::cmp::Ordering;

use crate::geometry::{DetectBox, EulerAngles, Keypoint};
use crate::util::{DetPostError, DetPostResult};

pub(crate) mod nms;

/// A decoded detection candidate prior to suppression.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Decoded box with score and class label.
    pub bbox: DetectBox,
    /// Originating decode order, used for deterministic tie-breaking.
    pub index: usize,
    /// Span into the owning scratch arena's keypoint storage.
    pub(crate) keypoints: (u32, u32),
}

fn candidate_cmp_desc(a: &Candidate, b: &Candidate) -> Ordering {
    b.bbox
        .score
        .total_cmp(&a.bbox.score)
        .then_with(|| a.index.cmp(&b.index))
}

/// Sorts candidates by descending score with deterministic tie-breaking.
pub(crate) fn sort_candidates_desc(candidates: &mut [Candidate]) {
    candidates.sort_by(candidate_cmp_desc);
}

/// Reusable candidate storage for one processing context.
///
/// The arena is overwritten on every decode call and its contents are never
/// an input/output contract surface. Candidate capacity is fixed at
/// construction; exceeding it is an error rather than silent truncation.
#[derive(Debug)]
pub struct Scratch {
    candidates: Vec<Candidate>,
    keypoints: Vec<Keypoint>,
    euler: Option<EulerAngles>,
    capacity: usize,
}

impl Scratch {
    /// Default candidate capacity, enough for the dense decoders at their
    /// usual grid sizes.
    pub const DEFAULT_CAPACITY: usize = 4096;

    /// Creates a scratch arena with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a scratch arena holding at most `capacity` candidates.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            candidates: Vec::with_capacity(capacity.min(1024)),
            keypoints: Vec::new(),
            euler: None,
            capacity,
        }
    }

    /// Discards all stored candidates, keypoints, and orientation.
    pub fn clear(&mut self) {
        self.candidates.clear();
        self.keypoints.clear();
        self.euler = None;
    }

    /// Appends a candidate, assigning its decode-order index.
    pub fn push(&mut self, bbox: DetectBox) -> DetPostResult<()> {
        self.push_with_keypoints(bbox, &[])
    }

    /// Appends a candidate along with its decoded keypoints.
    pub fn push_with_keypoints(
        &mut self,
        bbox: DetectBox,
        keypoints: &[Keypoint],
    ) -> DetPostResult<()> {
        if self.candidates.len() >= self.capacity {
            return Err(DetPostError::OutOfResources {
                needed: self.candidates.len() + 1,
                capacity: self.capacity,
            });
        }
        let start = self.keypoints.len() as u32;
        self.keypoints.extend_from_slice(keypoints);
        self.candidates.push(Candidate {
            bbox,
            index: self.candidates.len(),
            keypoints: (start, keypoints.len() as u32),
        });
        Ok(())
    }

    /// Returns the stored candidates in decode order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Returns the keypoints decoded for `candidate`.
    pub fn keypoints_of(&self, candidate: &Candidate) -> &[Keypoint] {
        let (start, len) = candidate.keypoints;
        &self.keypoints[start as usize..(start + len) as usize]
    }

    /// Returns the number of stored candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns true when no candidates are stored.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Stores the decoded orientation.
    pub fn set_euler(&mut self, euler: EulerAngles) {
        self.euler = Some(euler);
    }

    /// Returns the decoded orientation, if any.
    pub fn euler(&self) -> Option<EulerAngles> {
        self.euler
    }

    /// Returns the candidate capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}
