//! Greedy interval partitioning into display lanes.
//!
//! # Invariants
//! - Input must be sorted ascending by start.
//! - Each item takes the lowest-index lane whose high-water mark is
//!   `<= start`; otherwise a new lane opens at the next index.
//! - Lanes are never freed explicitly; a lane is reused only because its
//!   mark fell at or before a later start.
//! - Zero-width spans are packed like any other span.

use super::item::{Span, TimelineItem, TimelineItemKey};
use crate::model::validation::ValidationError;
use std::collections::BTreeMap;

/// Lane index per item plus the lane count for the day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneAssignment {
    lanes: BTreeMap<TimelineItemKey, usize>,
    max_lanes: usize,
}

impl LaneAssignment {
    pub fn lane_of(&self, key: TimelineItemKey) -> Option<usize> {
        self.lanes.get(&key).copied()
    }

    pub fn max_lanes(&self) -> usize {
        self.max_lanes
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TimelineItemKey, usize)> + '_ {
        self.lanes.iter().map(|(key, lane)| (*key, *lane))
    }
}

/// Packs start-sorted spans. Returns one lane index per span and the lane
/// count.
pub fn pack_spans(spans: &[Span]) -> Result<(Vec<usize>, usize), ValidationError> {
    let mut high_water_marks: Vec<i64> = Vec::new();
    let mut assigned = Vec::with_capacity(spans.len());

    for (index, span) in spans.iter().enumerate() {
        if index > 0 && spans[index - 1].start_second > span.start_second {
            return Err(ValidationError::UnsortedSpans { index });
        }

        let lane = match high_water_marks
            .iter()
            .position(|mark| *mark <= span.start_second)
        {
            Some(lane) => lane,
            None => {
                high_water_marks.push(span.end_second);
                high_water_marks.len() - 1
            }
        };
        high_water_marks[lane] = span.end_second;
        assigned.push(lane);
    }

    Ok((assigned, high_water_marks.len()))
}

/// Packs normalized items into lanes. Every item key must be unique.
pub fn pack_lanes(items: &[TimelineItem]) -> Result<LaneAssignment, ValidationError> {
    let spans: Vec<Span> = items.iter().map(TimelineItem::span).collect();
    let (assigned, max_lanes) = pack_spans(&spans)?;
    let mut lanes = BTreeMap::new();
    for (key, lane) in items.iter().map(TimelineItem::key).zip(assigned) {
        if lanes.insert(key, lane).is_some() {
            return Err(match key {
                TimelineItemKey::Activity(id) => ValidationError::DuplicateActivity(id),
                TimelineItemKey::Group(id) => ValidationError::DuplicateGroup(id),
            });
        }
    }
    Ok(LaneAssignment { lanes, max_lanes })
}
