//! Per-day timeline controller and its load/mutate state machine.
//!
//! # Responsibility
//! - Hold the only mutable timeline state: selected day, filters, cached
//!   snapshot, selection and current layout.
//! - Sequence loads so stale responses never overwrite newer ones.
//! - Route mutations through the grouping engine.
//!
//! # Invariants
//! - `Loading → Ready ⇄ Mutating → Ready`; `Error` is reachable from
//!   `Loading` and `Mutating`; `retry` goes back through `Loading`.
//! - Only the response for the latest request id may change state.
//! - Structural mutations (create/ungroup/bulk hide) always reload the day.
//! - Field mutations (hide, client) patch the cached day optimistically and
//!   restore it on failure.
//! - Selection is cleared after every bulk operation and every full reload.

use crate::layout::visibility::LayoutFilters;
use crate::layout::{compute_layout, DayLayout};
use crate::model::activity::{ActivityId, ActivityRecord, ClientId, GroupId};
use crate::model::day::TimelineDay;
use crate::model::group::ResolvedGroup;
use crate::model::validation::ValidationError;
use crate::model::RecordRef;
use crate::repo::timeline_repo::TimelineStore;
use crate::service::client_directory::ClientDirectory;
use crate::service::error::{TimelineError, TimelineResult};
use crate::service::grouping_service::GroupingEngine;
use crate::service::selection::SelectionModel;
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Raw records of one day as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySnapshot {
    pub day: TimelineDay,
    pub activities: Vec<ActivityRecord>,
    pub groups: Vec<ResolvedGroup>,
}

impl DaySnapshot {
    /// Applies `patch` to every copy of the activity (standalone list and
    /// group member lists). Returns `false` when the activity is not cached.
    fn patch_activity(&mut self, id: ActivityId, patch: impl Fn(&mut ActivityRecord)) -> bool {
        let mut found = false;
        let standalone = self.activities.iter_mut();
        let members = self
            .groups
            .iter_mut()
            .flat_map(|group| group.members.iter_mut());
        for activity in standalone.chain(members).filter(|a| a.id == id) {
            patch(activity);
            found = true;
        }
        found
    }

    fn patch_group(&mut self, id: GroupId, patch: impl FnOnce(&mut ResolvedGroup)) -> bool {
        match self.groups.iter_mut().find(|group| group.id() == id) {
            Some(group) => {
                patch(group);
                true
            }
            None => false,
        }
    }

    fn contains_activity(&self, id: ActivityId) -> bool {
        let members = self.groups.iter().flat_map(|group| group.members.iter());
        self.activities.iter().chain(members).any(|a| a.id == id)
    }

    fn client_ids(&self) -> Vec<ClientId> {
        let members = self.groups.iter().flat_map(|group| group.members.iter());
        let mut ids: BTreeSet<ClientId> = self
            .activities
            .iter()
            .chain(members)
            .filter_map(|activity| activity.client_id)
            .collect();
        ids.extend(self.groups.iter().filter_map(|group| group.group.client_id));
        ids.into_iter().collect()
    }
}

/// Mutation currently in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOp {
    CreateGroup { member_count: usize },
    Ungroup(GroupId),
    BulkHide { count: usize, hidden: bool },
    SetHidden { activity_id: ActivityId, hidden: bool },
    AssignClient {
        target: RecordRef,
        client_id: Option<ClientId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineState {
    Loading { request_id: u64 },
    Ready(DayLayout),
    /// Mutation in flight; `layout` is what is shown meanwhile.
    Mutating { op: PendingOp, layout: DayLayout },
    Error { message: String },
}

impl TimelineState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading { .. } => "loading",
            Self::Ready(_) => "ready",
            Self::Mutating { .. } => "mutating",
            Self::Error { .. } => "error",
        }
    }
}

/// Handle for one outstanding load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    request_id: u64,
    day: TimelineDay,
}

impl LoadTicket {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn day(&self) -> TimelineDay {
        self.day
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer request was issued; the response was dropped.
    Stale,
}

pub struct TimelineController<S: TimelineStore> {
    engine: GroupingEngine<S>,
    day: TimelineDay,
    filters: LayoutFilters,
    selection: SelectionModel,
    state: TimelineState,
    latest_request_id: u64,
    snapshot: Option<DaySnapshot>,
}

impl<S: TimelineStore> TimelineController<S> {
    /// Creates a controller in `Loading`; call `reload` to fetch the day.
    pub fn new(store: S, day: TimelineDay, filters: LayoutFilters) -> Self {
        Self {
            engine: GroupingEngine::new(store),
            day,
            filters,
            selection: SelectionModel::new(),
            state: TimelineState::Loading { request_id: 0 },
            latest_request_id: 0,
            snapshot: None,
        }
    }

    pub fn engine(&self) -> &GroupingEngine<S> {
        &self.engine
    }

    pub fn state(&self) -> &TimelineState {
        &self.state
    }

    pub fn day(&self) -> TimelineDay {
        self.day
    }

    pub fn filters(&self) -> LayoutFilters {
        self.filters
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn snapshot(&self) -> Option<&DaySnapshot> {
        self.snapshot.as_ref()
    }

    /// Layout currently on screen, if any.
    pub fn layout(&self) -> Option<&DayLayout> {
        match &self.state {
            TimelineState::Ready(layout) | TimelineState::Mutating { layout, .. } => Some(layout),
            TimelineState::Loading { .. } | TimelineState::Error { .. } => None,
        }
    }

    /// Switches to another day and starts loading it.
    pub fn request_day(&mut self, day: TimelineDay) -> LoadTicket {
        self.day = day;
        self.snapshot = None;
        self.selection.clear();
        self.begin_load()
    }

    /// Starts reloading the current day.
    pub fn request_refresh(&mut self) -> LoadTicket {
        self.begin_load()
    }

    /// Reads the ticket's day from the store. Hidden activities are always
    /// fetched; visibility is decided by the layout filters.
    pub fn fetch_snapshot(&self, ticket: &LoadTicket) -> TimelineResult<DaySnapshot> {
        let store = self.engine.store();
        let activities = store.list_activities(&ticket.day, true)?;
        let groups = store.list_groups(&ticket.day)?;
        Ok(DaySnapshot {
            day: ticket.day,
            activities,
            groups,
        })
    }

    /// Applies a load response if it answers the latest request.
    pub fn apply_snapshot(
        &mut self,
        ticket: &LoadTicket,
        result: TimelineResult<DaySnapshot>,
    ) -> TimelineResult<LoadOutcome> {
        if ticket.request_id != self.latest_request_id {
            debug!(
                "event=timeline_load module=controller status=stale request_id={} latest_request_id={}",
                ticket.request_id, self.latest_request_id
            );
            return Ok(LoadOutcome::Stale);
        }

        let snapshot = result.map_err(|err| self.fail(err))?;
        let layout = compute_layout(
            &snapshot.day,
            &snapshot.activities,
            &snapshot.groups,
            &self.filters,
        )
        .map_err(|err| self.fail(err.into()))?;

        info!(
            "event=timeline_load module=controller status=ok request_id={} date={} items={} lanes={}",
            ticket.request_id,
            snapshot.day.date(),
            layout.items().len(),
            layout.max_lanes()
        );
        self.selection.clear();
        self.snapshot = Some(snapshot);
        self.state = TimelineState::Ready(layout);
        Ok(LoadOutcome::Applied)
    }

    /// Full synchronous reload of the current day.
    pub fn reload(&mut self) -> TimelineResult<()> {
        let ticket = self.request_refresh();
        let result = self.fetch_snapshot(&ticket);
        self.apply_snapshot(&ticket, result).map(|_| ())
    }

    /// Leaves `Error` by reloading the day.
    pub fn retry(&mut self) -> TimelineResult<()> {
        if !matches!(self.state, TimelineState::Error { .. }) {
            return Err(self.not_ready());
        }
        self.reload()
    }

    /// Changes the hidden filter and re-lays out the cached day.
    pub fn set_show_hidden(&mut self, show_hidden: bool) -> TimelineResult<()> {
        self.filters.show_hidden = show_hidden;
        if !matches!(self.state, TimelineState::Ready(_)) {
            return Ok(());
        }
        if let Some(snapshot) = &self.snapshot {
            let layout = compute_layout(
                &snapshot.day,
                &snapshot.activities,
                &snapshot.groups,
                &self.filters,
            )?;
            self.selection.retain_selectable(&layout);
            self.state = TimelineState::Ready(layout);
        }
        Ok(())
    }

    /// Flips selection of a standalone activity. Ids absent from the cached
    /// day are `NotFound`; grouped or filtered-out ones are not selectable.
    pub fn toggle_selection(&mut self, id: ActivityId) -> TimelineResult<bool> {
        let TimelineState::Ready(layout) = &self.state else {
            return Err(self.not_ready());
        };
        let known = self
            .snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot.contains_activity(id));
        if !known && !self.selection.contains(id) {
            return Err(TimelineError::NotFound(RecordRef::Activity(id)));
        }
        Ok(self.selection.toggle(layout, id)?)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Groups the current selection, then reloads the day.
    ///
    /// Never retried: a blind retry could create a duplicate group.
    pub fn create_group_from_selection(&mut self) -> TimelineResult<ResolvedGroup> {
        let ids = self.selection.ids();
        let shown = self.begin_mutation(PendingOp::CreateGroup {
            member_count: ids.len(),
        })?;
        match self.engine.create_group(&ids) {
            Ok(group) => {
                self.selection.clear();
                self.reload()?;
                Ok(group)
            }
            Err(err) => Err(self.abort_mutation(shown, err)),
        }
    }

    /// Dissolves a group, then reloads the day.
    pub fn ungroup(&mut self, group_id: GroupId) -> TimelineResult<()> {
        let shown = self.begin_mutation(PendingOp::Ungroup(group_id))?;
        match self.engine.ungroup(group_id) {
            Ok(_) => self.reload(),
            Err(err) => Err(self.abort_mutation(shown, err)),
        }
    }

    /// Hides or unhides every selected activity, then reloads the day.
    /// Returns how many activities changed.
    pub fn bulk_hide(&mut self, hidden: bool) -> TimelineResult<usize> {
        if self.selection.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        let ids = self.selection.ids();
        let shown = self.begin_mutation(PendingOp::BulkHide {
            count: ids.len(),
            hidden,
        })?;
        match self.engine.set_hidden_many(&ids, hidden) {
            Ok(()) => {
                self.selection.clear();
                self.reload()?;
                Ok(ids.len())
            }
            Err(err) => Err(self.abort_mutation(shown, err)),
        }
    }

    /// Optimistically hides or unhides one activity of the day.
    pub fn set_hidden(&mut self, activity_id: ActivityId, hidden: bool) -> TimelineResult<()> {
        self.mutate_optimistically(
            PendingOp::SetHidden {
                activity_id,
                hidden,
            },
            |snapshot| snapshot.patch_activity(activity_id, |activity| activity.hidden = hidden),
            RecordRef::Activity(activity_id),
            |engine| engine.set_hidden(activity_id, hidden),
        )
    }

    /// Optimistically assigns a client to an activity or group of the day.
    pub fn assign_client(
        &mut self,
        target: RecordRef,
        client_id: Option<ClientId>,
    ) -> TimelineResult<()> {
        self.mutate_optimistically(
            PendingOp::AssignClient { target, client_id },
            |snapshot| match target {
                RecordRef::Activity(id) => {
                    snapshot.patch_activity(id, |activity| activity.client_id = client_id)
                }
                RecordRef::Group(id) => {
                    snapshot.patch_group(id, |group| group.group.client_id = client_id)
                }
            },
            target,
            |engine| engine.assign_client(target, client_id),
        )
    }

    /// Expanded view of a group, hidden members included.
    pub fn group_detail(&self, group_id: GroupId) -> TimelineResult<ResolvedGroup> {
        let cached = self
            .snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.groups.iter().find(|group| group.id() == group_id));
        match cached {
            Some(group) => Ok(group.clone()),
            None => self.engine.group_detail(group_id),
        }
    }

    /// Display names for every client referenced by the cached day.
    ///
    /// Lookup failures are logged and yield an empty map; they never touch
    /// timeline state.
    pub fn client_names(&self, directory: &dyn ClientDirectory) -> BTreeMap<ClientId, String> {
        let Some(snapshot) = &self.snapshot else {
            return BTreeMap::new();
        };
        let ids = snapshot.client_ids();
        if ids.is_empty() {
            return BTreeMap::new();
        }
        match directory.client_names(&ids) {
            Ok(names) => names,
            Err(err) => {
                warn!(
                    "event=client_lookup module=controller status=error clients={} error={err}",
                    ids.len()
                );
                BTreeMap::new()
            }
        }
    }

    fn begin_load(&mut self) -> LoadTicket {
        self.latest_request_id += 1;
        self.state = TimelineState::Loading {
            request_id: self.latest_request_id,
        };
        LoadTicket {
            request_id: self.latest_request_id,
            day: self.day,
        }
    }

    /// Moves `Ready` to `Mutating` and returns the layout shown before.
    fn begin_mutation(&mut self, op: PendingOp) -> TimelineResult<DayLayout> {
        let TimelineState::Ready(layout) = &self.state else {
            return Err(self.not_ready());
        };
        let layout = layout.clone();
        self.state = TimelineState::Mutating {
            op,
            layout: layout.clone(),
        };
        Ok(layout)
    }

    /// Transport failures land in `Error`; rejected requests go back to
    /// `Ready` unchanged.
    fn abort_mutation(&mut self, shown: DayLayout, err: TimelineError) -> TimelineError {
        if err.is_transport() {
            return self.fail(err);
        }
        warn!(
            "event=timeline_mutate module=controller status=rejected error_code={} error={err}",
            err.code()
        );
        self.state = TimelineState::Ready(shown);
        err
    }

    fn mutate_optimistically(
        &mut self,
        op: PendingOp,
        patch: impl FnOnce(&mut DaySnapshot) -> bool,
        target: RecordRef,
        commit: impl FnOnce(&GroupingEngine<S>) -> TimelineResult<()>,
    ) -> TimelineResult<()> {
        let shown = self.begin_mutation(op.clone())?;
        let Some(previous) = self.snapshot.clone() else {
            let err = self.not_ready();
            return Err(self.abort_mutation(shown, err));
        };

        let mut patched = previous.clone();
        if !patch(&mut patched) {
            return Err(self.abort_mutation(shown, TimelineError::NotFound(target)));
        }
        let optimistic = match compute_layout(
            &patched.day,
            &patched.activities,
            &patched.groups,
            &self.filters,
        ) {
            Ok(layout) => layout,
            Err(err) => return Err(self.abort_mutation(shown, err.into())),
        };

        self.snapshot = Some(patched);
        self.state = TimelineState::Mutating {
            op,
            layout: optimistic.clone(),
        };

        match commit(&self.engine) {
            Ok(()) => {
                self.selection.retain_selectable(&optimistic);
                self.state = TimelineState::Ready(optimistic);
                Ok(())
            }
            Err(err) => {
                self.snapshot = Some(previous);
                Err(self.abort_mutation(shown, err))
            }
        }
    }

    fn fail(&mut self, err: TimelineError) -> TimelineError {
        error!(
            "event=timeline_state module=controller status=error from={} error_code={} error={err}",
            self.state.name(),
            err.code()
        );
        self.state = TimelineState::Error {
            message: err.to_string(),
        };
        err
    }

    fn not_ready(&self) -> TimelineError {
        ValidationError::NotReady {
            state: self.state.name(),
        }
        .into()
    }
}
