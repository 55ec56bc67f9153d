use std::collections::BTreeSet;

use serde::Deserialize;
use tracing::debug;

use crate::domain::SLOTS_PER_DAY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKey {
    #[default]
    Shift,
    Control,
    Alt,
}

/// Tracks whether the multi-select key is currently held.
#[derive(Debug, Clone, Default)]
pub struct ModifierState {
    key: ModifierKey,
    held: bool,
}

impl ModifierState {
    pub fn new(key: ModifierKey) -> Self {
        Self { key, held: false }
    }

    pub fn key(&self) -> ModifierKey {
        self.key
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn key_down(&mut self, key: ModifierKey) {
        if key == self.key {
            self.held = true;
        }
    }

    pub fn key_up(&mut self, key: ModifierKey) {
        if key == self.key {
            self.held = false;
        }
    }

    /// Overwrites the flag from a modifier snapshot carried by an input event.
    pub fn sync(&mut self, held: bool) {
        self.held = held;
    }

    pub fn release(&mut self) {
        self.held = false;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionEngine {
    selected: BTreeSet<usize>,
    dragging: bool,
}

impl SelectionEngine {
    pub fn selected(&self) -> &BTreeSet<usize> {
        &self.selected
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn pointer_down(&mut self, index: usize, modifier: &ModifierState) {
        if index >= SLOTS_PER_DAY {
            return;
        }

        if modifier.is_held() && !self.selected.is_empty() {
            if !self.selected.remove(&index) {
                self.selected.insert(index);
            }
        } else {
            self.selected.clear();
            self.selected.insert(index);
        }
        self.dragging = true;
        debug!(index, selected = ?self.selected, "pointer down");
    }

    pub fn pointer_enter(&mut self, index: usize) {
        if !self.dragging || index >= SLOTS_PER_DAY {
            return;
        }
        if self.selected.insert(index) {
            debug!(index, "selection extended");
        }
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn reset(&mut self) {
        self.selected.clear();
        self.dragging = false;
    }
}
