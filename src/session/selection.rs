//! Checked-file tracking

use indexmap::IndexSet;

/// The set of file paths currently checked in the tree.
///
/// Unique paths, iterated in the order they were first checked.
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    paths: IndexSet<String>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path` when checked, remove it otherwise
    pub fn toggle(&mut self, path: &str, checked: bool) {
        if checked {
            if !self.paths.contains(path) {
                self.paths.insert(path.to_string());
            }
        } else {
            self.paths.shift_remove(path);
        }
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Selected paths in selection order
    pub fn paths(&self) -> Vec<String> {
        self.paths.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }
}
