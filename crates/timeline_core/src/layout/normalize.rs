//! Interval normalization.
//!
//! Turns visible activities and groups into one start-sorted item sequence.
//!
//! # Invariants
//! - Activity span is `[start, start + duration_seconds)`; `end` is ignored.
//! - Group span is `[min member start, max member start + duration)`.
//! - Output order is `(start, key)`, so identical input always yields
//!   identical order.

use super::item::{Span, TimelineItem};
use super::visibility::VisibleSet;
use crate::model::activity::ActivityRecord;
use crate::model::day::TimelineDay;
use crate::model::group::ResolvedGroup;
use crate::model::validation::ValidationError;

/// Normalizes visible records into a sorted item list.
pub fn normalize(day: &TimelineDay, visible: VisibleSet) -> Result<Vec<TimelineItem>, ValidationError> {
    let mut items = Vec::with_capacity(visible.standalone.len() + visible.groups.len());

    for activity in visible.standalone {
        let span = activity_span(day, &activity);
        items.push(TimelineItem::Activity { activity, span });
    }
    for group in visible.groups {
        let span = group_span(day, &group)?;
        let total_duration_seconds = group.total_duration_seconds();
        items.push(TimelineItem::Group {
            group,
            span,
            total_duration_seconds,
        });
    }

    items.sort_by(|left, right| {
        left.span()
            .start_second
            .cmp(&right.span().start_second)
            .then_with(|| left.key().cmp(&right.key()))
    });
    Ok(items)
}

pub fn activity_span(day: &TimelineDay, activity: &ActivityRecord) -> Span {
    let start = day.seconds_since_midnight(activity.start);
    Span::new(start, start.saturating_add(activity.duration_seconds))
}

/// Span covering every member. Zero members is a validation error.
pub fn group_span(day: &TimelineDay, group: &ResolvedGroup) -> Result<Span, ValidationError> {
    group
        .members
        .iter()
        .map(|member| activity_span(day, member))
        .reduce(|acc, span| {
            Span::new(
                acc.start_second.min(span.start_second),
                acc.end_second.max(span.end_second),
            )
        })
        .ok_or(ValidationError::EmptyGroup(group.id()))
}

#[cfg(test)]
mod tests {
    use super::{group_span, normalize};
    use crate::layout::item::{Span, TimelineItem, TimelineItemKey};
    use crate::layout::visibility::VisibleSet;
    use crate::model::activity::ActivityRecord;
    use crate::model::day::TimelineDay;
    use crate::model::group::{ActivityGroup, ResolvedGroup};
    use crate::model::validation::ValidationError;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn day() -> TimelineDay {
        TimelineDay::utc(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()).unwrap()
    }

    fn at(id: u128, hour: u32, minute: u32, seconds: i64) -> ActivityRecord {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap();
        ActivityRecord::with_id(Uuid::from_u128(id), "https://x.test", "x", start, seconds, "test")
    }

    #[test]
    fn activity_span_uses_duration_not_end() {
        let mut activity = at(1, 9, 0, 300);
        activity.end = Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap();
        let items = normalize(
            &day(),
            VisibleSet {
                standalone: vec![activity],
                groups: Vec::new(),
            },
        )
        .unwrap();
        assert_eq!(items[0].span(), Span::new(9 * 3600, 9 * 3600 + 300));
    }

    #[test]
    fn group_span_and_total_cover_non_contiguous_members() {
        let a = at(1, 9, 0, 600);
        let b = at(2, 11, 0, 300);
        let group = ActivityGroup::new(vec![a.id, b.id]).unwrap();
        let resolved = ResolvedGroup::new(group, vec![a, b]);

        let items = normalize(
            &day(),
            VisibleSet {
                standalone: Vec::new(),
                groups: vec![resolved],
            },
        )
        .unwrap();
        match &items[0] {
            TimelineItem::Group {
                span,
                total_duration_seconds,
                ..
            } => {
                assert_eq!(*span, Span::new(9 * 3600, 11 * 3600 + 300));
                assert_eq!(*total_duration_seconds, 900);
            }
            other => panic!("expected group item, got {other:?}"),
        }
    }

    #[test]
    fn empty_group_is_rejected() {
        let group = ActivityGroup {
            id: Uuid::from_u128(9),
            client_id: None,
            member_ids: vec![Uuid::from_u128(1), Uuid::from_u128(2)],
        };
        let resolved = ResolvedGroup::new(group, Vec::new());
        assert_eq!(
            group_span(&day(), &resolved).unwrap_err(),
            ValidationError::EmptyGroup(Uuid::from_u128(9))
        );
    }

    #[test]
    fn ties_on_start_break_on_id() {
        let items = normalize(
            &day(),
            VisibleSet {
                standalone: vec![at(7, 9, 0, 60), at(3, 9, 0, 60), at(5, 8, 0, 60)],
                groups: Vec::new(),
            },
        )
        .unwrap();
        let keys: Vec<_> = items.iter().map(TimelineItem::key).collect();
        assert_eq!(
            keys,
            vec![
                TimelineItemKey::Activity(Uuid::from_u128(5)),
                TimelineItemKey::Activity(Uuid::from_u128(3)),
                TimelineItemKey::Activity(Uuid::from_u128(7)),
            ]
        );
    }
}
