//! Pure day layout pipeline.
//!
//! # Responsibility
//! - Run visibility filter, normalizer and lane packer in that order.
//! - Expose the result as an immutable `DayLayout`.
//!
//! # Invariants
//! - `compute_layout` holds no state; equal input gives equal output.
//! - No two items sharing a lane overlap.
//! - `max_lanes` equals the peak number of simultaneously running items.

pub mod item;
pub mod lanes;
pub mod normalize;
pub mod visibility;

use crate::model::activity::{ActivityRecord, ClientId};
use crate::model::day::TimelineDay;
use crate::model::group::ResolvedGroup;
use crate::model::validation::ValidationError;
use item::{TimelineItem, TimelineItemKey};
use lanes::LaneAssignment;
use serde::Serialize;
use std::collections::BTreeMap;
use visibility::LayoutFilters;

/// Computes the render-ready layout of one day.
pub fn compute_layout(
    day: &TimelineDay,
    activities: &[ActivityRecord],
    groups: &[ResolvedGroup],
    filters: &LayoutFilters,
) -> Result<DayLayout, ValidationError> {
    let visible = visibility::filter_visible(activities, groups, filters)?;
    let items = normalize::normalize(day, visible)?;
    let lanes = lanes::pack_lanes(&items)?;
    Ok(DayLayout { items, lanes })
}

/// Sorted items with their lane assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayLayout {
    items: Vec<TimelineItem>,
    lanes: LaneAssignment,
}

/// One item paired with its lane, for serialization.
#[derive(Debug, Serialize)]
pub struct PlacedItem<'a> {
    pub lane: usize,
    #[serde(flatten)]
    pub item: &'a TimelineItem,
}

/// Aggregates for the rendered day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub item_count: usize,
    pub max_lanes: usize,
    pub tracked_seconds: i64,
    pub unassigned_seconds: i64,
    pub seconds_by_client: BTreeMap<ClientId, i64>,
}

impl DayLayout {
    pub fn items(&self) -> &[TimelineItem] {
        &self.items
    }

    pub fn lanes(&self) -> &LaneAssignment {
        &self.lanes
    }

    pub fn max_lanes(&self) -> usize {
        self.lanes.max_lanes()
    }

    pub fn item(&self, key: TimelineItemKey) -> Option<&TimelineItem> {
        self.items.iter().find(|item| item.key() == key)
    }

    pub fn lane_of(&self, key: TimelineItemKey) -> Option<usize> {
        self.lanes.lane_of(key)
    }

    pub fn placed(&self) -> Vec<PlacedItem<'_>> {
        self.items
            .iter()
            .filter_map(|item| {
                self.lanes
                    .lane_of(item.key())
                    .map(|lane| PlacedItem { lane, item })
            })
            .collect()
    }

    /// Totals over rendered items. Groups count their member total and bill
    /// to the group's client.
    pub fn summary(&self) -> DaySummary {
        let mut summary = DaySummary {
            item_count: self.items.len(),
            max_lanes: self.max_lanes(),
            ..DaySummary::default()
        };
        for item in &self.items {
            let seconds = item.display_duration_seconds();
            summary.tracked_seconds = summary.tracked_seconds.saturating_add(seconds);
            match item.client_id() {
                Some(client_id) => {
                    let entry = summary.seconds_by_client.entry(client_id).or_insert(0);
                    *entry = entry.saturating_add(seconds);
                }
                None => {
                    summary.unassigned_seconds = summary.unassigned_seconds.saturating_add(seconds)
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::compute_layout;
    use crate::layout::visibility::LayoutFilters;
    use crate::model::activity::ActivityRecord;
    use crate::model::day::TimelineDay;
    use crate::model::group::{ActivityGroup, ResolvedGroup};
    use crate::model::validation::ValidationError;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn summary_bills_groups_to_group_client() {
        let day = TimelineDay::utc(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()).unwrap();
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let client = Uuid::new_v4();
        let member_client = Uuid::new_v4();

        let mut a = ActivityRecord::new("https://a.test", "a", start, 100, "test");
        let mut b = ActivityRecord::new("https://b.test", "b", start, 200, "test");
        a.client_id = Some(member_client);
        let mut group = ActivityGroup::new(vec![a.id, b.id]).unwrap();
        group.client_id = Some(client);
        a.group_id = Some(group.id);
        b.group_id = Some(group.id);
        let loose = ActivityRecord::new("https://c.test", "c", start, 50, "test");

        let layout = compute_layout(
            &day,
            &[a.clone(), b.clone(), loose],
            &[ResolvedGroup::new(group, vec![a, b])],
            &LayoutFilters::default(),
        )
        .unwrap();
        let summary = layout.summary();

        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.max_lanes, 2);
        assert_eq!(summary.tracked_seconds, 350);
        assert_eq!(summary.seconds_by_client.get(&client), Some(&300));
        assert!(!summary.seconds_by_client.contains_key(&member_client));
        assert_eq!(summary.unassigned_seconds, 50);
    }

    #[test]
    fn repeated_activity_fails_instead_of_sharing_a_lane() {
        let day = TimelineDay::utc(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()).unwrap();
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let a = ActivityRecord::new("https://a.test", "a", start, 600, "test");

        let err = compute_layout(&day, &[a.clone(), a.clone()], &[], &LayoutFilters::default())
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateActivity(a.id));
    }
}
