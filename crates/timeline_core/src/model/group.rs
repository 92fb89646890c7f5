//! Activity group model.
//!
//! # Responsibility
//! - Define the user-created aggregate of activities.
//! - Compute group aggregates from resolved members.
//!
//! # Invariants
//! - `member_ids` is an ordered set with at least two entries.
//! - `client_id` is group-level only; members keep their own client ids.
//! - Aggregates cover every member, hidden or not.

use super::activity::{ActivityId, ActivityRecord, ClientId, GroupId};
use super::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Minimum member count for any persisted group.
pub const MIN_GROUP_MEMBERS: usize = 2;

/// Stored group shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityGroup {
    pub id: GroupId,
    #[serde(default)]
    pub client_id: Option<ClientId>,
    /// Serialized as `memberActivityIds`.
    #[serde(rename = "memberActivityIds")]
    pub member_ids: Vec<ActivityId>,
}

impl ActivityGroup {
    /// Creates a group with a generated ID and validates its member list.
    pub fn new(member_ids: Vec<ActivityId>) -> Result<Self, ValidationError> {
        let group = Self {
            id: Uuid::new_v4(),
            client_id: None,
            member_ids,
        };
        group.validate()?;
        Ok(group)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.member_ids.len() < MIN_GROUP_MEMBERS {
            return Err(ValidationError::TooFewMembers {
                count: self.member_ids.len(),
            });
        }
        let mut seen = HashSet::with_capacity(self.member_ids.len());
        for id in &self.member_ids {
            if !seen.insert(*id) {
                return Err(ValidationError::DuplicateMember(*id));
            }
        }
        Ok(())
    }

    pub fn contains(&self, activity_id: ActivityId) -> bool {
        self.member_ids.contains(&activity_id)
    }
}

/// Group with its member records loaded, as returned by store reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedGroup {
    #[serde(flatten)]
    pub group: ActivityGroup,
    pub members: Vec<ActivityRecord>,
}

impl ResolvedGroup {
    pub fn new(group: ActivityGroup, members: Vec<ActivityRecord>) -> Self {
        Self { group, members }
    }

    pub fn id(&self) -> GroupId {
        self.group.id
    }

    /// Sum of member durations, hidden members included.
    ///
    /// May exceed the wall-clock width of the group span when members are
    /// not contiguous.
    pub fn total_duration_seconds(&self) -> i64 {
        self.members
            .iter()
            .fold(0_i64, |total, member| total.saturating_add(member.duration_seconds))
    }

    pub fn hidden_member_count(&self) -> usize {
        self.members.iter().filter(|member| member.hidden).count()
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivityGroup, ResolvedGroup};
    use crate::model::activity::ActivityRecord;
    use crate::model::validation::ValidationError;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn new_rejects_single_member_and_duplicates() {
        let id = Uuid::new_v4();
        assert_eq!(
            ActivityGroup::new(vec![id]).unwrap_err(),
            ValidationError::TooFewMembers { count: 1 }
        );
        assert_eq!(
            ActivityGroup::new(vec![id, id]).unwrap_err(),
            ValidationError::DuplicateMember(id)
        );
    }

    #[test]
    fn total_duration_counts_hidden_members() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let a = ActivityRecord::new("https://a.test", "A", start, 120, "extension");
        let mut b = ActivityRecord::new("https://b.test", "B", start, 60, "extension");
        b.hidden = true;
        let group = ActivityGroup::new(vec![a.id, b.id]).unwrap();
        let resolved = ResolvedGroup::new(group, vec![a, b]);

        assert_eq!(resolved.total_duration_seconds(), 180);
        assert_eq!(resolved.hidden_member_count(), 1);
    }
}
