//! Validation failures shared by model, layout and service layers.
//!
//! Every variant is raised before any store write, so a validation failure
//! never leaves partial state behind.

use super::activity::{ActivityId, GroupId};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Group creation needs at least two distinct activities.
    TooFewMembers { count: usize },
    /// Same activity listed twice in one group.
    DuplicateMember(ActivityId),
    /// Activity already belongs to a group.
    AlreadyGrouped {
        activity_id: ActivityId,
        group_id: GroupId,
    },
    /// Group resolved without any member records.
    EmptyGroup(GroupId),
    /// Group member whose `group_id` does not point back at the group.
    MembershipMismatch {
        group_id: GroupId,
        activity_id: ActivityId,
    },
    /// Group lists an activity that was not resolved into its members.
    UnresolvedMember {
        group_id: GroupId,
        activity_id: ActivityId,
    },
    /// Same activity passed twice to one layout pass.
    DuplicateActivity(ActivityId),
    /// Same group passed twice to one layout pass.
    DuplicateGroup(GroupId),
    /// Grouped activity whose group was not loaded with it.
    MissingGroup {
        activity_id: ActivityId,
        group_id: GroupId,
    },
    NegativeDuration {
        activity_id: ActivityId,
        duration_seconds: i64,
    },
    EndBeforeStart(ActivityId),
    /// Lane packing input was not sorted by start.
    UnsortedSpans { index: usize },
    /// Bulk operation issued with nothing selected.
    EmptySelection,
    /// Activity is not a standalone item of the current layout.
    NotSelectable(ActivityId),
    /// Day whose midnight window falls outside the representable range.
    DayOutOfRange(NaiveDate),
    /// UTC offset outside the supported ±18h range.
    InvalidUtcOffset { minutes: i32 },
    /// Controller received a mutation outside the `Ready` state.
    NotReady { state: &'static str },
    InvalidConfig(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewMembers { count } => {
                write!(f, "a group needs at least 2 activities, got {count}")
            }
            Self::DuplicateMember(id) => write!(f, "activity listed twice in group: {id}"),
            Self::AlreadyGrouped {
                activity_id,
                group_id,
            } => write!(f, "activity {activity_id} is already grouped in {group_id}"),
            Self::EmptyGroup(id) => write!(f, "group {id} resolved with zero members"),
            Self::MembershipMismatch {
                group_id,
                activity_id,
            } => write!(
                f,
                "activity {activity_id} is listed in group {group_id} but does not reference it"
            ),
            Self::UnresolvedMember {
                group_id,
                activity_id,
            } => write!(
                f,
                "group {group_id} lists activity {activity_id} but it was not loaded"
            ),
            Self::DuplicateActivity(id) => write!(f, "activity {id} appears more than once"),
            Self::DuplicateGroup(id) => write!(f, "group {id} appears more than once"),
            Self::MissingGroup {
                activity_id,
                group_id,
            } => write!(
                f,
                "activity {activity_id} references group {group_id} which was not loaded"
            ),
            Self::NegativeDuration {
                activity_id,
                duration_seconds,
            } => write!(
                f,
                "activity {activity_id} has negative duration {duration_seconds}s"
            ),
            Self::EndBeforeStart(id) => write!(f, "activity {id} ends before it starts"),
            Self::UnsortedSpans { index } => {
                write!(f, "lane input is not sorted by start at index {index}")
            }
            Self::EmptySelection => write!(f, "selection is empty"),
            Self::NotSelectable(id) => {
                write!(f, "activity {id} is not a visible standalone item")
            }
            Self::DayOutOfRange(date) => write!(f, "day {date} is out of range"),
            Self::InvalidUtcOffset { minutes } => {
                write!(f, "utc offset {minutes} minutes is out of range")
            }
            Self::NotReady { state } => write!(f, "timeline is not ready (state: {state})"),
            Self::InvalidConfig(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ValidationError {}
