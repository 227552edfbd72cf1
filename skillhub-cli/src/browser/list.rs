//! Selection state for scrollable lists

use ratatui::widgets::ListState;

/// Items plus a selection that always stays in range
#[derive(Debug, Clone)]
pub struct ListPane<T> {
    items: Vec<T>,
    selected: usize,
}

impl<T> Default for ListPane<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: 0,
        }
    }
}

impl<T> ListPane<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, selected: 0 }
    }

    /// Replace the items, keeping the cursor where it was when possible
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.selected = self.selected.min(self.items.len().saturating_sub(1));
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [T] {
        &mut self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        (!self.items.is_empty()).then_some(self.selected)
    }

    pub fn selected(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    pub fn selected_mut(&mut self) -> Option<&mut T> {
        self.items.get_mut(self.selected)
    }

    pub fn next(&mut self) {
        if self.selected + 1 < self.items.len() {
            self.selected += 1;
        }
    }

    pub fn previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn first(&mut self) {
        self.selected = 0;
    }

    pub fn last(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }

    /// Widget state for rendering
    pub fn state(&self) -> ListState {
        ListState::default().with_selected(self.selected_index())
    }
}
