//! Grouping engine: group/ungroup, hide and client assignment.
//!
//! # Responsibility
//! - Enforce group membership invariants above the store.
//! - Translate store failures into the engine error taxonomy.
//!
//! # Invariants
//! - Every precondition is checked before the first store write.
//! - After `create_group(ids)` every id has `group_id == new id`.
//! - `ungroup` clears `group_id` only; all other member fields stay as-is.
//! - Group client assignment never touches member client ids.
//! - `create_group` is never retried internally.

use crate::model::activity::{ActivityId, ActivityRecord, ClientId, GroupId};
use crate::model::group::{ActivityGroup, ResolvedGroup, MIN_GROUP_MEMBERS};
use crate::model::validation::ValidationError;
use crate::model::RecordRef;
use crate::repo::timeline_repo::TimelineStore;
use crate::service::error::{TimelineError, TimelineResult};
use log::{error, info};
use std::collections::HashSet;
use std::time::Instant;

/// Use-case service for grouping and visibility mutations.
pub struct GroupingEngine<S: TimelineStore> {
    store: S,
}

impl<S: TimelineStore> GroupingEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Merges two or more ungrouped activities into a new group.
    ///
    /// Duplicate ids are collapsed, keeping first-seen order.
    ///
    /// # Errors
    /// - `Validation` when fewer than two distinct ids remain or any activity
    ///   is already grouped.
    /// - `NotFound` when any id is unknown.
    /// - `Transport` when persistence fails; nothing is linked in that case.
    pub fn create_group(&self, selected_ids: &[ActivityId]) -> TimelineResult<ResolvedGroup> {
        let started_at = Instant::now();
        let member_ids = dedup_in_order(selected_ids);
        if member_ids.len() < MIN_GROUP_MEMBERS {
            return Err(ValidationError::TooFewMembers {
                count: member_ids.len(),
            }
            .into());
        }

        let mut members = Vec::with_capacity(member_ids.len());
        for id in &member_ids {
            let activity = self.require_activity(*id)?;
            if let Some(group_id) = activity.group_id {
                return Err(ValidationError::AlreadyGrouped {
                    activity_id: *id,
                    group_id,
                }
                .into());
            }
            members.push(activity);
        }

        let group = ActivityGroup::new(member_ids)?;
        if let Err(err) = self.store.create_group(&group) {
            let err = TimelineError::from(err);
            error!(
                "event=group_create module=grouping status=error members={} duration_ms={} error_code={} error={}",
                group.member_ids.len(),
                started_at.elapsed().as_millis(),
                err.code(),
                err
            );
            return Err(err);
        }

        for member in &mut members {
            member.group_id = Some(group.id);
        }
        info!(
            "event=group_create module=grouping status=ok group_id={} members={} duration_ms={}",
            group.id,
            members.len(),
            started_at.elapsed().as_millis()
        );
        Ok(ResolvedGroup::new(group, members))
    }

    /// Dissolves a group. Returns the former member ids in member order.
    pub fn ungroup(&self, group_id: GroupId) -> TimelineResult<Vec<ActivityId>> {
        let group = self.group_detail(group_id)?;
        self.store.delete_group(group_id).map_err(|err| {
            let err = TimelineError::from(err);
            error!(
                "event=group_dissolve module=grouping status=error group_id={group_id} error_code={} error={err}",
                err.code()
            );
            err
        })?;
        info!(
            "event=group_dissolve module=grouping status=ok group_id={group_id} members={}",
            group.group.member_ids.len()
        );
        Ok(group.group.member_ids)
    }

    /// Assigns (or clears) the client of an activity or a group.
    ///
    /// For groups only the group-level client changes; members keep their
    /// own client history so ungrouping restores it.
    pub fn assign_client(
        &self,
        target: RecordRef,
        client_id: Option<ClientId>,
    ) -> TimelineResult<()> {
        let result = match target {
            RecordRef::Activity(id) => self.store.update_activity_client(id, client_id),
            RecordRef::Group(id) => self.store.update_group_client(id, client_id),
        };
        result.map_err(TimelineError::from)?;
        info!(
            "event=client_assign module=grouping status=ok target={target} assigned={}",
            client_id.is_some()
        );
        Ok(())
    }

    /// Sets the hidden flag of one activity, grouped or not.
    pub fn set_hidden(&self, activity_id: ActivityId, hidden: bool) -> TimelineResult<()> {
        self.set_hidden_many(&[activity_id], hidden)
    }

    /// Sets the hidden flag on every listed activity, or on none.
    pub fn set_hidden_many(&self, activity_ids: &[ActivityId], hidden: bool) -> TimelineResult<()> {
        let ids = dedup_in_order(activity_ids);
        if ids.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        for id in &ids {
            self.require_activity(*id)?;
        }
        self.store.update_activity_hidden(&ids, hidden)?;
        info!(
            "event=activity_hide module=grouping status=ok count={} hidden={hidden}",
            ids.len()
        );
        Ok(())
    }

    /// Expanded view of one group, hidden members included.
    pub fn group_detail(&self, group_id: GroupId) -> TimelineResult<ResolvedGroup> {
        self.store
            .get_group(group_id)?
            .ok_or(TimelineError::NotFound(RecordRef::Group(group_id)))
    }

    fn require_activity(&self, id: ActivityId) -> TimelineResult<ActivityRecord> {
        self.store
            .get_activity(id)?
            .ok_or(TimelineError::NotFound(RecordRef::Activity(id)))
    }
}

fn dedup_in_order(ids: &[ActivityId]) -> Vec<ActivityId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
