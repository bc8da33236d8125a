use std::collections::VecDeque;

pub const RECENT_MAX_ENTRIES: usize = 5;

/// Most-recently-opened image paths, newest first, each path at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentSelections {
    entries: VecDeque<String>,
}

impl RecentSelections {
    /// Builds the list from persisted state, dropping duplicates and anything
    /// past the capacity.
    pub fn from_stored(stored: Vec<String>) -> Self {
        let mut entries = VecDeque::with_capacity(RECENT_MAX_ENTRIES);
        for path in stored {
            if entries.len() == RECENT_MAX_ENTRIES {
                break;
            }
            if path.is_empty() || entries.contains(&path) {
                continue;
            }
            entries.push_back(path);
        }
        Self { entries }
    }

    pub fn record_selection(&mut self, path: &str) {
        if let Some(existing) = self.entries.iter().position(|entry| entry == path) {
            self.entries.remove(existing);
        }
        self.entries.push_front(path.to_string());
        self.entries.truncate(RECENT_MAX_ENTRIES);
    }

    pub fn list_recent(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reselecting_moves_to_front_without_duplicates() {
        let mut recent = RecentSelections::default();
        recent.record_selection("a.jpg");
        recent.record_selection("b.jpg");
        recent.record_selection("a.jpg");
        assert_eq!(recent.list_recent(), vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn sixth_distinct_path_drops_oldest() {
        let mut recent = RecentSelections::default();
        for name in ["1", "2", "3", "4", "5", "6"] {
            recent.record_selection(name);
        }
        assert_eq!(recent.list_recent(), vec!["6", "5", "4", "3", "2"]);
    }

    #[test]
    fn stored_state_is_normalized() {
        let stored = ["a", "b", "a", "", "c", "d", "e", "f", "g"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let recent = RecentSelections::from_stored(stored);
        assert_eq!(recent.list_recent(), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn empty_by_default() {
        let recent = RecentSelections::default();
        assert!(recent.is_empty());
        assert_eq!(recent.iter().count(), 0);
    }
}
