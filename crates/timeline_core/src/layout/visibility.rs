//! Visibility policy applied before normalization.
//!
//! # Invariants
//! - With `show_hidden = false`, hidden standalone activities are dropped.
//! - Grouped activities never render standalone; their group always renders
//!   whole, whatever its members' hidden flags say. Dropping a hidden member
//!   would silently change the group's total duration.
//! - Group links are checked in both directions before anything renders.
//! - Each activity and each group enters a layout at most once.

use crate::model::activity::{ActivityId, ActivityRecord, GroupId};
use crate::model::group::ResolvedGroup;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// User-facing layout filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutFilters {
    #[serde(default)]
    pub show_hidden: bool,
}

/// Candidates that survive the visibility policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    pub standalone: Vec<ActivityRecord>,
    pub groups: Vec<ResolvedGroup>,
}

/// Applies the hidden policy and checks group links.
///
/// `activities` is the day's activity list (grouped members may or may not
/// be included); `groups` carries every group touching the day with its
/// members resolved.
pub fn filter_visible(
    activities: &[ActivityRecord],
    groups: &[ResolvedGroup],
    filters: &LayoutFilters,
) -> Result<VisibleSet, ValidationError> {
    let mut group_ids: HashSet<GroupId> = HashSet::with_capacity(groups.len());
    let mut owner_of: HashMap<ActivityId, GroupId> = HashMap::new();
    for group in groups {
        if !group_ids.insert(group.id()) {
            return Err(ValidationError::DuplicateGroup(group.id()));
        }
        group.group.validate()?;
        check_group_links(group)?;
        for member in &group.members {
            if owner_of.insert(member.id, group.id()).is_some() {
                return Err(ValidationError::DuplicateActivity(member.id));
            }
        }
    }

    let mut seen_standalone: HashSet<ActivityId> = HashSet::with_capacity(activities.len());
    let mut standalone = Vec::with_capacity(activities.len());
    for activity in activities {
        match (activity.group_id, owner_of.get(&activity.id)) {
            (Some(group_id), _) if !group_ids.contains(&group_id) => {
                return Err(ValidationError::MissingGroup {
                    activity_id: activity.id,
                    group_id,
                });
            }
            // Rendered inside its group.
            (Some(group_id), Some(&owner)) if owner == group_id => {}
            (Some(group_id), _) | (None, Some(&group_id)) => {
                return Err(ValidationError::MembershipMismatch {
                    group_id,
                    activity_id: activity.id,
                });
            }
            (None, None) => {
                if !seen_standalone.insert(activity.id) {
                    return Err(ValidationError::DuplicateActivity(activity.id));
                }
                if activity.hidden && !filters.show_hidden {
                    continue;
                }
                standalone.push(activity.clone());
            }
        }
    }

    Ok(VisibleSet {
        standalone,
        groups: groups.to_vec(),
    })
}

/// Every resolved member points back at the group and every listed id was
/// resolved.
fn check_group_links(group: &ResolvedGroup) -> Result<(), ValidationError> {
    for member in &group.members {
        if member.group_id != Some(group.id()) || !group.group.contains(member.id) {
            return Err(ValidationError::MembershipMismatch {
                group_id: group.id(),
                activity_id: member.id,
            });
        }
    }
    for &activity_id in &group.group.member_ids {
        if !group.members.iter().any(|member| member.id == activity_id) {
            return Err(ValidationError::UnresolvedMember {
                group_id: group.id(),
                activity_id,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{filter_visible, LayoutFilters};
    use crate::model::activity::ActivityRecord;
    use crate::model::group::{ActivityGroup, ResolvedGroup};
    use crate::model::validation::ValidationError;
    use chrono::{TimeZone, Utc};

    fn activity(title: &str) -> ActivityRecord {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        ActivityRecord::new("https://crm.test", title, start, 60, "extension")
    }

    fn grouped(members: Vec<ActivityRecord>) -> (Vec<ActivityRecord>, ResolvedGroup) {
        let group = ActivityGroup::new(members.iter().map(|m| m.id).collect()).unwrap();
        let members: Vec<_> = members
            .into_iter()
            .map(|mut m| {
                m.group_id = Some(group.id);
                m
            })
            .collect();
        (members.clone(), ResolvedGroup::new(group, members))
    }

    #[test]
    fn hidden_standalone_is_dropped_unless_show_hidden() {
        let visible = activity("visible");
        let mut hidden = activity("hidden");
        hidden.hidden = true;
        let activities = vec![visible.clone(), hidden.clone()];

        let default_set = filter_visible(&activities, &[], &LayoutFilters::default()).unwrap();
        assert_eq!(default_set.standalone, vec![visible.clone()]);

        let show_all = LayoutFilters { show_hidden: true };
        let full_set = filter_visible(&activities, &[], &show_all).unwrap();
        assert_eq!(full_set.standalone.len(), 2);
    }

    #[test]
    fn hidden_member_keeps_group_and_never_renders_standalone() {
        let mut x = activity("x");
        x.hidden = true;
        let (members, group) = grouped(vec![x, activity("y")]);

        let set = filter_visible(&members, &[group.clone()], &LayoutFilters::default()).unwrap();
        assert!(set.standalone.is_empty());
        assert_eq!(set.groups, vec![group]);
    }

    #[test]
    fn broken_links_are_rejected() {
        let (members, group) = grouped(vec![activity("a"), activity("b")]);
        let err = filter_visible(&members, &[], &LayoutFilters::default()).unwrap_err();
        assert!(matches!(err, ValidationError::MissingGroup { .. }));

        let mut stale = group.clone();
        stale.members[0].group_id = None;
        let err = filter_visible(&[], &[stale], &LayoutFilters::default()).unwrap_err();
        assert!(matches!(err, ValidationError::MembershipMismatch { .. }));
    }

    #[test]
    fn listed_but_unresolved_member_is_rejected() {
        let mut a = activity("a");
        a.duration_seconds = 600;
        let mut b = activity("b");
        b.duration_seconds = 1800;
        let (members, group) = grouped(vec![a, b]);
        let mut partial = group.clone();
        partial.members.truncate(1);

        let err = filter_visible(&members, &[partial], &LayoutFilters::default()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnresolvedMember {
                group_id: group.id(),
                activity_id: members[1].id,
            }
        );
    }

    #[test]
    fn activity_disagreeing_with_a_loaded_group_is_rejected() {
        let (members, group) = grouped(vec![activity("a"), activity("b")]);

        let mut stray = activity("stray");
        stray.group_id = Some(group.id());
        let err = filter_visible(&[stray.clone()], &[group.clone()], &LayoutFilters::default())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MembershipMismatch {
                group_id: group.id(),
                activity_id: stray.id,
            }
        );

        let mut loose_copy = members[0].clone();
        loose_copy.group_id = None;
        let err = filter_visible(&[loose_copy], &[group.clone()], &LayoutFilters::default())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MembershipMismatch {
                group_id: group.id(),
                activity_id: members[0].id,
            }
        );
    }

    #[test]
    fn repeated_activities_and_groups_are_rejected() {
        let a = activity("a");
        let err = filter_visible(&[a.clone(), a.clone()], &[], &LayoutFilters::default())
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateActivity(a.id));

        let (members, group) = grouped(vec![activity("b"), activity("c")]);
        let err = filter_visible(&[], &[group.clone(), group.clone()], &LayoutFilters::default())
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateGroup(group.id()));

        let (_, second) = grouped(vec![members[0].clone(), activity("d")]);
        let err = filter_visible(&[], &[group, second], &LayoutFilters::default()).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateActivity(members[0].id));
    }
}
