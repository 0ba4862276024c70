//! Row selection state for the active mailbox.
//!
//! Multi-select mode is derived from the checked set, so it is active exactly
//! when at least one row is checked.

use std::collections::BTreeSet;

use crate::cache::Uid;

/// Mode the message list is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode {
    /// Nothing open, nothing checked.
    Idle,
    /// One row open for reading.
    Viewing(Uid),
    /// Bulk-action toolbar active over the checked rows.
    MultiSelect(BTreeSet<Uid>),
}

/// Checked rows and the open row for the current mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: BTreeSet<Uid>,
    open: Option<Uid>,
}

impl SelectionState {
    /// Create an idle selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode. Multi-select takes precedence over an open row.
    #[must_use]
    pub fn mode(&self) -> SelectionMode {
        if !self.selected.is_empty() {
            SelectionMode::MultiSelect(self.selected.clone())
        } else if let Some(uid) = self.open {
            SelectionMode::Viewing(uid)
        } else {
            SelectionMode::Idle
        }
    }

    /// Whether the bulk-action toolbar is shown.
    #[must_use]
    pub fn multi_select_active(&self) -> bool {
        !self.selected.is_empty()
    }

    /// Checked UIDs.
    #[must_use]
    pub const fn selected(&self) -> &BTreeSet<Uid> {
        &self.selected
    }

    /// UID of the open row.
    #[must_use]
    pub const fn open_uid(&self) -> Option<Uid> {
        self.open
    }

    /// Returns true if `uid` is checked.
    #[must_use]
    pub fn is_selected(&self, uid: Uid) -> bool {
        self.selected.contains(&uid)
    }

    /// Flip the checkbox of `uid`.
    ///
    /// Unchecking the last row returns to idle and closes the open row.
    pub fn toggle_checkbox(&mut self, uid: Uid) {
        if !self.selected.remove(&uid) {
            self.selected.insert(uid);
        } else if self.selected.is_empty() {
            self.open = None;
        }
    }

    /// Check exactly the rows in `visible`, typically the search-filtered rows.
    ///
    /// Rows outside `visible` are unchecked. An empty view leaves multi-select
    /// the same way unchecking the last row does.
    pub fn select_all(&mut self, visible: impl IntoIterator<Item = Uid>) {
        let had_selection = !self.selected.is_empty();
        self.selected = visible.into_iter().collect();
        if had_selection && self.selected.is_empty() {
            self.open = None;
        }
    }

    /// Uncheck everything and return to idle.
    pub fn deselect_all(&mut self) {
        self.cancel();
    }

    /// Open `uid` for reading without touching the checked rows.
    pub const fn open_row(&mut self, uid: Uid) {
        self.open = Some(uid);
    }

    /// Close the open row, leaving the checked rows alone.
    pub const fn close_row(&mut self) {
        self.open = None;
    }

    /// Force the idle state.
    pub fn cancel(&mut self) {
        self.selected.clear();
        self.open = None;
    }

    /// Forget rows that no longer exist, e.g. after a delete.
    pub fn prune(&mut self, removed: &[Uid]) {
        for uid in removed {
            self.selected.remove(uid);
        }
        if self.open.is_some_and(|uid| removed.contains(&uid)) {
            self.open = None;
        }
    }
}
