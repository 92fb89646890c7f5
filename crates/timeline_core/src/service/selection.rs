//! Pending multi-select for bulk operations.
//!
//! Only standalone activity items of the current layout can be selected;
//! grouped or filtered-out activities are never offered.

use crate::layout::item::TimelineItemKey;
use crate::layout::DayLayout;
use crate::model::activity::ActivityId;
use crate::model::validation::ValidationError;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionModel {
    ids: BTreeSet<ActivityId>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips selection of `id`. Returns `true` when the id is now selected.
    ///
    /// Deselecting always succeeds; selecting requires a standalone activity
    /// item in `layout`.
    pub fn toggle(&mut self, layout: &DayLayout, id: ActivityId) -> Result<bool, ValidationError> {
        if self.ids.remove(&id) {
            return Ok(false);
        }
        if layout.item(TimelineItemKey::Activity(id)).is_none() {
            return Err(ValidationError::NotSelectable(id));
        }
        self.ids.insert(id);
        Ok(true)
    }

    pub fn contains(&self, id: ActivityId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in stable order.
    pub fn ids(&self) -> Vec<ActivityId> {
        self.ids.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drops ids that are no longer standalone items of `layout`.
    pub fn retain_selectable(&mut self, layout: &DayLayout) {
        self.ids
            .retain(|id| layout.item(TimelineItemKey::Activity(*id)).is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::SelectionModel;
    use crate::layout::compute_layout;
    use crate::layout::visibility::LayoutFilters;
    use crate::model::activity::ActivityRecord;
    use crate::model::day::TimelineDay;
    use crate::model::validation::ValidationError;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn toggle_selects_visible_standalone_and_rejects_hidden() {
        let day = TimelineDay::utc(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()).unwrap();
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let visible = ActivityRecord::new("https://a.test", "a", start, 60, "test");
        let mut hidden = ActivityRecord::new("https://b.test", "b", start, 60, "test");
        hidden.hidden = true;
        let layout = compute_layout(
            &day,
            &[visible.clone(), hidden.clone()],
            &[],
            &LayoutFilters::default(),
        )
        .unwrap();

        let mut selection = SelectionModel::new();
        assert!(selection.toggle(&layout, visible.id).unwrap());
        assert_eq!(
            selection.toggle(&layout, hidden.id).unwrap_err(),
            ValidationError::NotSelectable(hidden.id)
        );
        assert!(!selection.toggle(&layout, visible.id).unwrap());
        assert!(selection.is_empty());
    }
}
