//! Render-ready timeline items.
//!
//! Items are recomputed on every layout pass and never persisted.

use crate::model::activity::{ActivityId, ActivityRecord, ClientId, GroupId};
use crate::model::group::ResolvedGroup;
use serde::Serialize;
use uuid::Uuid;

/// Half-open `[start, end)` interval in seconds from the day's midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub start_second: i64,
    pub end_second: i64,
}

impl Span {
    pub fn new(start_second: i64, end_second: i64) -> Self {
        Self {
            start_second,
            end_second,
        }
    }

    pub fn start_minute(&self) -> f64 {
        self.start_second as f64 / 60.0
    }

    pub fn end_minute(&self) -> f64 {
        self.end_second as f64 / 60.0
    }

    /// Half-open overlap: touching spans do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start_second < other.end_second && other.start_second < self.end_second
    }

    /// Whether `second` lies inside `[start, end)`.
    pub fn contains(&self, second: i64) -> bool {
        self.start_second <= second && second < self.end_second
    }
}

/// Identity of one item in a layout.
///
/// Ordering is by UUID first so ties on start time break on the record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TimelineItemKey {
    Activity(ActivityId),
    Group(GroupId),
}

impl TimelineItemKey {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Activity(id) | Self::Group(id) => *id,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Self::Activity(_) => 0,
            Self::Group(_) => 1,
        }
    }
}

impl Ord for TimelineItemKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id()
            .cmp(&other.id())
            .then_with(|| self.kind_rank().cmp(&other.kind_rank()))
    }
}

impl PartialOrd for TimelineItemKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// One rendered timeline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineItem {
    /// Standalone, ungrouped activity.
    Activity {
        activity: ActivityRecord,
        span: Span,
    },
    /// Group rendered as a single block.
    Group {
        group: ResolvedGroup,
        span: Span,
        #[serde(rename = "totalDurationSeconds")]
        total_duration_seconds: i64,
    },
}

impl TimelineItem {
    pub fn key(&self) -> TimelineItemKey {
        match self {
            Self::Activity { activity, .. } => TimelineItemKey::Activity(activity.id),
            Self::Group { group, .. } => TimelineItemKey::Group(group.id()),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Activity { span, .. } | Self::Group { span, .. } => *span,
        }
    }

    /// Time spent, which for groups is the member total rather than the
    /// span width.
    pub fn display_duration_seconds(&self) -> i64 {
        match self {
            Self::Activity { activity, .. } => activity.duration_seconds,
            Self::Group {
                total_duration_seconds,
                ..
            } => *total_duration_seconds,
        }
    }

    /// Client the item is billed to: the group's own client for groups.
    pub fn client_id(&self) -> Option<ClientId> {
        match self {
            Self::Activity { activity, .. } => activity.client_id,
            Self::Group { group, .. } => group.group.client_id,
        }
    }
}
