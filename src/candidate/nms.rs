//! Non-maximum suppression over detection candidates.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::candidate::{sort_candidates_desc, Candidate};
use crate::geometry::iou;
use crate::trace::trace_event;
use crate::util::{DetPostError, DetPostResult};

/// Controls how candidates are grouped for suppression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NmsMode {
    /// Suppress only within the same class label.
    #[default]
    ClassAware,
    /// Suppress across all classes as a single group.
    ClassAgnostic,
}

/// Suppression parameters.
///
/// Out-of-range thresholds disable the corresponding filter instead of
/// erroring: a negative `score_threshold` keeps every candidate and an
/// `iou_threshold` outside [0,1] suppresses nothing. `max_per_class` uses
/// `None` for unbounded; `Some(0)` is the literal empty cap and yields an
/// empty result.
#[derive(Clone, Copy, Debug)]
pub struct NmsParams {
    /// Minimum score a candidate must reach to enter suppression.
    pub score_threshold: f32,
    /// Maximum overlap a kept candidate may have with any earlier keep.
    pub iou_threshold: f32,
    /// Per-group cap on kept candidates.
    pub max_per_class: Option<u32>,
    /// Grouping mode.
    pub mode: NmsMode,
}

impl Default for NmsParams {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            iou_threshold: 0.5,
            max_per_class: None,
            mode: NmsMode::ClassAware,
        }
    }
}

/// Allow-list of class indices admitted to suppression and output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassFilter {
    classes: BTreeSet<i32>,
}

impl ClassFilter {
    /// Builds a filter from class indices. Negative indices are rejected.
    pub fn new(classes: &[i32]) -> DetPostResult<Self> {
        let mut set = BTreeSet::new();
        for &class in classes {
            if class < 0 {
                return Err(DetPostError::InvalidParameter(
                    "class filter indices must be non-negative",
                ));
            }
            set.insert(class);
        }
        Ok(Self { classes: set })
    }

    /// Returns true when `label` passes the filter.
    pub fn admits(&self, label: i32) -> bool {
        self.classes.contains(&label)
    }

    /// Returns true when the filter admits no classes.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Applies non-maximum suppression and returns the kept candidates.
///
/// Candidates are grouped by label (or into a single group in
/// class-agnostic mode), sorted by descending score with ties broken by
/// decode order, then greedily kept while their IoU with every prior keep
/// in the group stays at or below the threshold. Groups are emitted in
/// ascending label order; relative ordering across groups carries no score
/// meaning.
pub fn nms(
    candidates: &[Candidate],
    params: &NmsParams,
    filter: Option<&ClassFilter>,
) -> Vec<Candidate> {
    let score_filtering = params.score_threshold.is_finite() && params.score_threshold >= 0.0;
    let iou_filtering = (0.0..=1.0).contains(&params.iou_threshold);

    let admitted = candidates.iter().copied().filter(|c| {
        if score_filtering && c.bbox.score < params.score_threshold {
            return false;
        }
        match filter {
            Some(f) => f.admits(c.bbox.label),
            None => true,
        }
    });

    let mut groups: BTreeMap<i32, Vec<Candidate>> = BTreeMap::new();
    match params.mode {
        NmsMode::ClassAware => {
            for candidate in admitted {
                groups.entry(candidate.bbox.label).or_default().push(candidate);
            }
        }
        NmsMode::ClassAgnostic => {
            let all: Vec<Candidate> = admitted.collect();
            if !all.is_empty() {
                groups.insert(0, all);
            }
        }
    }

    let mut kept: Vec<Candidate> = Vec::new();
    for (_, mut group) in groups {
        sort_candidates_desc(&mut group);
        let cap = match params.max_per_class {
            Some(cap) => cap as usize,
            None => usize::MAX,
        };
        let group_start = kept.len();

        'outer: for candidate in group {
            if kept.len() - group_start >= cap {
                break;
            }
            if iou_filtering {
                for prior in &kept[group_start..] {
                    if iou(&candidate.bbox, &prior.bbox) > params.iou_threshold {
                        continue 'outer;
                    }
                }
            }
            kept.push(candidate);
        }
    }

    trace_event!("nms", input = candidates.len(), kept = kept.len());
    kept
}
