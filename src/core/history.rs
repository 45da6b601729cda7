use crate::domain::model::HistoryItem;
use std::collections::VecDeque;

pub const MAX_HISTORY_ITEMS: usize = 5;

/// Most-recent-first list of finished generations, capped at [`MAX_HISTORY_ITEMS`].
#[derive(Debug, Clone, Default)]
pub struct GenerationHistory {
    items: VecDeque<HistoryItem>,
}

impl GenerationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `item` at the front. An entry with the same id is replaced rather than duplicated.
    pub fn push(&mut self, item: HistoryItem) {
        self.items.retain(|existing| existing.id != item.id);
        self.items.push_front(item);
        self.items.truncate(MAX_HISTORY_ITEMS);
    }

    pub fn get(&self, id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
