//! Domain model for the activity timeline.
//!
//! # Responsibility
//! - Define activity, group and day records shared by layout and services.
//! - Own the validation rules every layer enforces before trusting a record.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - An activity belongs to at most one group, and that group lists it.
//! - A group always has at least two members.

pub mod activity;
pub mod day;
pub mod group;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub use activity::{ActivityId, ActivityRecord, ClientId, GroupId};

/// Reference to one stored record, used where an operation targets either
/// an activity or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RecordRef {
    Activity(ActivityId),
    Group(GroupId),
}

impl Display for RecordRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Activity(id) => write!(f, "activity {id}"),
            Self::Group(id) => write!(f, "group {id}"),
        }
    }
}
