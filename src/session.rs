use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::domain::{DayId, DayRecord, ScheduleError, SlotStatus, WeekStore};
use crate::selection::{ModifierKey, ModifierState, SelectionEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Collapsed,
    Expanded(DayId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub day: DayId,
    pub hours: usize,
    pub status: SlotStatus,
}

/// Owns the week plus everything that belongs to one mounted editor:
/// the expanded day, the slot selection and the multi-select modifier.
#[derive(Debug, Clone)]
pub struct Editor {
    week: WeekStore,
    state: EditState,
    selection: SelectionEngine,
    modifier: ModifierState,
}

impl Editor {
    pub fn new(week: WeekStore, modifier_key: ModifierKey) -> Self {
        Self {
            week,
            state: EditState::Collapsed,
            selection: SelectionEngine::default(),
            modifier: ModifierState::new(modifier_key),
        }
    }

    pub fn week(&self) -> &WeekStore {
        &self.week
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn expanded_day(&self) -> Option<DayId> {
        match self.state {
            EditState::Expanded(day) => Some(day),
            EditState::Collapsed => None,
        }
    }

    pub fn expanded_record(&self) -> Option<&DayRecord> {
        let day = self.expanded_day()?;
        let index = self.week.get_day(day).ok()?;
        self.week.day(index)
    }

    pub fn selection(&self) -> &BTreeSet<usize> {
        self.selection.selected()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selection.is_selected(index)
    }

    pub fn is_dragging(&self) -> bool {
        self.selection.is_dragging()
    }

    pub fn modifier(&self) -> &ModifierState {
        &self.modifier
    }

    pub fn expand_toggle(&mut self, day: DayId) -> Result<EditState, ScheduleError> {
        if let Err(err) = self.week.get_day(day) {
            warn!(%day, "refusing to expand unknown day");
            return Err(err);
        }

        self.state = match self.state {
            EditState::Expanded(current) if current == day => EditState::Collapsed,
            _ => EditState::Expanded(day),
        };
        self.selection.reset();
        info!(state = ?self.state, "edit state changed");
        Ok(self.state)
    }

    /// Closes the panel. Applied statuses stay in place.
    pub fn cancel(&mut self) {
        self.collapse();
    }

    pub fn save(&mut self) {
        self.collapse();
    }

    fn collapse(&mut self) {
        self.state = EditState::Collapsed;
        self.selection.reset();
        info!("edit panel closed");
    }

    pub fn pointer_down(&mut self, index: usize) {
        if self.state == EditState::Collapsed {
            return;
        }
        self.selection.pointer_down(index, &self.modifier);
    }

    pub fn pointer_enter(&mut self, index: usize) {
        if self.state == EditState::Collapsed {
            return;
        }
        self.selection.pointer_enter(index);
    }

    pub fn pointer_up_global(&mut self) {
        self.selection.pointer_up();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn key_down(&mut self, key: ModifierKey) {
        self.modifier.key_down(key);
    }

    pub fn key_up(&mut self, key: ModifierKey) {
        self.modifier.key_up(key);
    }

    pub fn sync_modifier(&mut self, held: bool) {
        self.modifier.sync(held);
    }

    /// Sets every selected hour of the expanded day to `status`.
    /// Returns `Ok(None)` when no day is open or nothing is selected.
    pub fn apply_status(&mut self, status: SlotStatus) -> Result<Option<Applied>, ScheduleError> {
        let EditState::Expanded(day) = self.state else {
            return Ok(None);
        };
        if self.selection.is_empty() {
            return Ok(None);
        }

        let index = self.week.get_day(day)?;
        let record = self
            .week
            .day(index)
            .ok_or(ScheduleError::DayIndexOutOfRange(index))?;
        let slots = record
            .slots()
            .with_status(self.selection.selected().iter().copied(), status);

        let totals = self.week.replace_slots(index, &slots)?.totals();
        let hours = self.selection.selected().len();
        self.selection.clear();
        info!(
            %day,
            hours,
            status = status.label(),
            work = totals.work,
            rest = totals.rest,
            nc = totals.non_compliant,
            "status applied"
        );

        Ok(Some(Applied { day, hours, status }))
    }

    /// Drops transient input state when the editor goes away.
    pub fn unmount(&mut self) {
        self.selection.reset();
        self.modifier.release();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;

    use crate::domain::{DayId, DayRecord, SLOTS_PER_DAY, ScheduleError, SlotSequence, SlotStatus, WeekStore};
    use crate::selection::ModifierKey;

    use super::{Applied, EditState, Editor};

    fn editor() -> Editor {
        let days = (14..=16)
            .map(|day| {
                DayRecord::new(
                    NaiveDate::from_ymd_opt(2025, 4, day).expect("valid date"),
                    SlotSequence::filled(SlotStatus::Rest),
                )
            })
            .collect();
        Editor::new(WeekStore::new(days).expect("week"), ModifierKey::Shift)
    }

    fn set(indices: &[usize]) -> BTreeSet<usize> {
        indices.iter().copied().collect()
    }

    #[test]
    fn toggling_the_same_day_twice_collapses() {
        let mut editor = editor();
        editor.expand_toggle(DayId(14)).expect("expand");
        editor.pointer_down(2);

        let state = editor.expand_toggle(DayId(14)).expect("collapse");
        assert_eq!(state, EditState::Collapsed);
        assert!(editor.selection().is_empty());
    }

    #[test]
    fn switching_days_clears_selection() {
        let mut editor = editor();
        editor.expand_toggle(DayId(14)).expect("expand");
        editor.pointer_down(2);
        editor.pointer_enter(3);

        editor.expand_toggle(DayId(15)).expect("switch");
        assert_eq!(editor.state(), EditState::Expanded(DayId(15)));
        assert!(editor.selection().is_empty());
        assert!(!editor.is_dragging());
    }

    #[test]
    fn unknown_day_is_refused() {
        let mut editor = editor();
        editor.expand_toggle(DayId(14)).expect("expand");

        let result = editor.expand_toggle(DayId(20));
        assert_eq!(result, Err(ScheduleError::UnknownDayIdentity(DayId(20))));
        assert_eq!(editor.state(), EditState::Expanded(DayId(14)));
    }

    #[test]
    fn intents_while_collapsed_are_ignored() {
        let mut editor = editor();
        editor.pointer_down(4);
        editor.pointer_enter(5);
        assert!(editor.selection().is_empty());
        assert!(!editor.is_dragging());
    }

    #[test]
    fn modifier_click_removes_from_selection() {
        let mut editor = editor();
        editor.expand_toggle(DayId(14)).expect("expand");
        editor.pointer_down(3);
        editor.pointer_enter(4);
        editor.pointer_enter(5);
        editor.pointer_up_global();

        editor.key_down(ModifierKey::Shift);
        editor.pointer_down(4);
        assert_eq!(editor.selection(), &set(&[3, 5]));
    }

    #[test]
    fn apply_status_rewrites_selected_hours() {
        let mut editor = editor();
        editor.expand_toggle(DayId(15)).expect("expand");
        editor.pointer_down(8);
        editor.pointer_enter(9);
        editor.pointer_enter(10);
        editor.pointer_up_global();

        let applied = editor.apply_status(SlotStatus::Work).expect("apply");
        assert_eq!(
            applied,
            Some(Applied {
                day: DayId(15),
                hours: 3,
                status: SlotStatus::Work,
            })
        );

        let record = editor.expanded_record().expect("expanded day");
        for (hour, status) in record.slots().iter().enumerate() {
            let expected = if (8..=10).contains(&hour) {
                SlotStatus::Work
            } else {
                SlotStatus::Rest
            };
            assert_eq!(status, expected, "hour {hour}");
        }
        assert_eq!(record.totals().work, 3);
        assert_eq!(record.totals().rest, 21);
        assert_eq!(record.totals().non_compliant, 0);
        assert!(editor.selection().is_empty());
    }

    #[test]
    fn apply_status_without_selection_changes_nothing() {
        let mut editor = editor();
        let before = editor.week().clone();
        assert_eq!(editor.apply_status(SlotStatus::Work), Ok(None));

        editor.expand_toggle(DayId(14)).expect("expand");
        assert_eq!(editor.apply_status(SlotStatus::NonCompliant), Ok(None));
        assert_eq!(editor.week(), &before);
    }

    #[test]
    fn cancel_keeps_applied_edits() {
        let mut editor = editor();
        editor.expand_toggle(DayId(16)).expect("expand");
        editor.pointer_down(0);
        editor
            .apply_status(SlotStatus::NonCompliant)
            .expect("apply");

        editor.cancel();
        assert_eq!(editor.state(), EditState::Collapsed);
        let index = editor.week().get_day(DayId(16)).expect("day");
        let record = editor.week().day(index).expect("record");
        assert_eq!(record.totals().non_compliant, 1);
        assert_eq!(record.totals().total(), SLOTS_PER_DAY);
    }

    #[test]
    fn save_collapses_and_unmount_releases_input_state() {
        let mut editor = editor();
        editor.expand_toggle(DayId(14)).expect("expand");
        editor.key_down(ModifierKey::Shift);
        editor.pointer_down(1);

        editor.save();
        assert_eq!(editor.state(), EditState::Collapsed);
        assert!(editor.selection().is_empty());

        editor.unmount();
        assert!(!editor.modifier().is_held());
        assert!(!editor.is_dragging());
    }
}
