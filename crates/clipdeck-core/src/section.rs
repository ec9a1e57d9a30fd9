//! Section model: one watched directory bound to one remote list
//!
//! A section is the state unit the panel renders: the directory's
//! current listing, the name of the engine input it feeds, the commit
//! policy (replace vs append), and which items are currently marked
//! live. The engine remains the source of truth for real list state;
//! active marks are a UI-visible echo of the last successful commit.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::listing::display_label;

#[derive(Debug, Clone)]
pub struct Section {
    /// Display label, the directory's base name
    pub name: String,
    /// Absolute directory path; unique key within the registry
    pub dir_path: PathBuf,
    /// Current listing, sorted ascending, files only
    items: Vec<PathBuf>,
    /// Engine input this section feeds; defaults to `name`
    pub input_name: String,
    /// true: commits clear the remote list first; false: commits append
    pub replace_mode: bool,
    /// Items marked live after the last successful commit
    active_items: BTreeSet<PathBuf>,
}

impl Section {
    /// Build a section from a picked directory and its initial listing.
    pub fn new(dir_path: PathBuf, items: Vec<PathBuf>) -> Self {
        let name = dir_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| dir_path.to_string_lossy().to_string());
        Self {
            input_name: name.clone(),
            name,
            dir_path,
            items,
            replace_mode: true,
            active_items: BTreeSet::new(),
        }
    }

    pub fn items(&self) -> &[PathBuf] {
        &self.items
    }

    /// Item by position in the current listing (how the panel addresses
    /// clicks).
    pub fn item_at(&self, index: usize) -> Option<&PathBuf> {
        self.items.get(index)
    }

    pub fn set_input_name(&mut self, input_name: &str) {
        self.input_name = input_name.to_string();
    }

    pub fn toggle_replace(&mut self) -> bool {
        self.replace_mode = !self.replace_mode;
        self.replace_mode
    }

    /// Full resort-and-replace on a directory change notification.
    /// Active marks for files that vanished are dropped.
    pub fn set_items(&mut self, mut items: Vec<PathBuf>) {
        items.sort();
        self.active_items.retain(|p| items.contains(p));
        self.items = items;
    }

    /// Record a successful commit. Replace mode resets the live marks to
    /// the committed items; append mode adds to the existing marks.
    /// Failed commits never reach this method.
    pub fn apply_commit(&mut self, committed: &[PathBuf], replace: bool) {
        if replace {
            self.active_items.clear();
        }
        self.active_items.extend(committed.iter().cloned());
    }

    pub fn is_active(&self, item: &Path) -> bool {
        self.active_items.contains(item)
    }

    pub fn active_items(&self) -> impl Iterator<Item = &PathBuf> {
        self.active_items.iter()
    }

    /// Button label for an item (basename without extension).
    pub fn label_for(&self, item: &Path) -> String {
        display_label(item)
    }
}

/// Ordered collection of sections, keyed by directory path.
///
/// The registry owns section lifecycle exclusively: `add` pairs with the
/// watch service's Watch command, `remove` with Unwatch. At most one
/// section per directory.
#[derive(Debug, Default)]
pub struct SectionRegistry {
    sections: Vec<Section>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section for a newly watched directory. Adding a path that
    /// already has a section refreshes its listing instead of creating a
    /// duplicate, mirroring the watch service's single-watch guarantee.
    pub fn add(&mut self, dir_path: PathBuf, items: Vec<PathBuf>) -> &Section {
        if let Some(pos) = self.position(&dir_path) {
            self.sections[pos].set_items(items);
            return &self.sections[pos];
        }
        log::info!("section added: {}", dir_path.display());
        self.sections.push(Section::new(dir_path, items));
        self.sections.last().expect("just pushed")
    }

    /// Remove a section; the caller is responsible for unwatching the
    /// directory. Idempotent.
    pub fn remove(&mut self, dir_path: &Path) -> Option<Section> {
        let pos = self.position(dir_path)?;
        log::info!("section removed: {}", dir_path.display());
        Some(self.sections.remove(pos))
    }

    pub fn get(&self, dir_path: &Path) -> Option<&Section> {
        self.position(dir_path).map(|pos| &self.sections[pos])
    }

    pub fn get_mut(&mut self, dir_path: &Path) -> Option<&mut Section> {
        let pos = self.position(dir_path)?;
        Some(&mut self.sections[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn position(&self, dir_path: &Path) -> Option<usize> {
        self.sections.iter().position(|s| s.dir_path == dir_path)
    }
}
