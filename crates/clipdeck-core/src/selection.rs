//! Selection gestures and pending batches
//!
//! Per section the engine is a two-state machine: `Idle` until the first
//! modifier-held click opens a pending batch, `BatchAccumulating` while
//! the modifier stays down. Releasing the modifier is a global gesture
//! that drains every non-empty batch at once; a plain click commits a
//! single item immediately without touching the batch.
//!
//! The engine tracks filepaths only. Rendering state (pending/active
//! marks, disabled buttons) is the panel's job, driven by the events the
//! sync service publishes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Per-section selection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    /// A pending batch is open; modifier-held clicks toggle membership
    BatchAccumulating,
}

/// What a click gesture resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Item toggled into the section's pending batch
    AddedToBatch,
    /// Item toggled back out of the pending batch
    RemovedFromBatch,
    /// Plain click: commit this single item now
    Commit(Vec<PathBuf>),
}

/// Tracks pending batches for every section.
///
/// Batches preserve first-click order so the committed `ListAdd`
/// sequence matches the order the operator picked items in. Sections
/// are keyed by directory path; a `BTreeMap` keeps the global flush
/// order deterministic.
#[derive(Debug, Default)]
pub struct SelectionEngine {
    pending: BTreeMap<PathBuf, Vec<PathBuf>>,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, section: &Path) -> SelectionState {
        match self.pending.get(section) {
            Some(batch) if !batch.is_empty() => SelectionState::BatchAccumulating,
            _ => SelectionState::Idle,
        }
    }

    /// Pending batch for a section, in click order.
    pub fn pending(&self, section: &Path) -> &[PathBuf] {
        self.pending.get(section).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Interpret a click on `item` in `section`.
    ///
    /// With the modifier held the item toggles in and out of the pending
    /// batch (idempotent toggle, not accumulate-only). Without it the
    /// click commits immediately and any open batch is left untouched.
    pub fn click(&mut self, section: &Path, item: &Path, modifier_held: bool) -> ClickOutcome {
        if !modifier_held {
            return ClickOutcome::Commit(vec![item.to_path_buf()]);
        }

        let batch = self.pending.entry(section.to_path_buf()).or_default();
        if let Some(pos) = batch.iter().position(|p| p == item) {
            batch.remove(pos);
            ClickOutcome::RemovedFromBatch
        } else {
            batch.push(item.to_path_buf());
            ClickOutcome::AddedToBatch
        }
    }

    /// The modifier key was released: drain every non-empty batch, in
    /// section path order. Batches are gone after this call regardless
    /// of how the commits turn out; an empty release yields nothing.
    pub fn release_modifier(&mut self) -> Vec<(PathBuf, Vec<PathBuf>)> {
        let drained = std::mem::take(&mut self.pending);
        drained
            .into_iter()
            .filter(|(_, batch)| !batch.is_empty())
            .collect()
    }

    /// Drop selection state for a removed section.
    pub fn clear_section(&mut self, section: &Path) {
        self.pending.remove(section);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn test_plain_click_commits_one_item() {
        let mut engine = SelectionEngine::new();
        let outcome = engine.click(&p("/clips"), &p("/clips/a.mp4"), false);
        assert_eq!(outcome, ClickOutcome::Commit(vec![p("/clips/a.mp4")]));
        assert_eq!(engine.state(&p("/clips")), SelectionState::Idle);
    }

    #[test]
    fn test_modifier_click_opens_batch() {
        let mut engine = SelectionEngine::new();
        assert_eq!(engine.state(&p("/clips")), SelectionState::Idle);

        let outcome = engine.click(&p("/clips"), &p("/clips/a.mp4"), true);
        assert_eq!(outcome, ClickOutcome::AddedToBatch);
        assert_eq!(engine.state(&p("/clips")), SelectionState::BatchAccumulating);
        assert_eq!(engine.pending(&p("/clips")), &[p("/clips/a.mp4")]);
    }

    #[test]
    fn test_toggle_twice_is_idempotent() {
        let mut engine = SelectionEngine::new();
        engine.click(&p("/clips"), &p("/clips/a.mp4"), true);
        let before: Vec<_> = engine.pending(&p("/clips")).to_vec();

        engine.click(&p("/clips"), &p("/clips/b.mp4"), true);
        let outcome = engine.click(&p("/clips"), &p("/clips/b.mp4"), true);
        assert_eq!(outcome, ClickOutcome::RemovedFromBatch);
        assert_eq!(engine.pending(&p("/clips")), before.as_slice());
    }

    #[test]
    fn test_batch_preserves_click_order() {
        let mut engine = SelectionEngine::new();
        engine.click(&p("/clips"), &p("/clips/b.mp4"), true);
        engine.click(&p("/clips"), &p("/clips/a.mp4"), true);

        // Click order, not sorted order
        assert_eq!(
            engine.pending(&p("/clips")),
            &[p("/clips/b.mp4"), p("/clips/a.mp4")]
        );
    }

    #[test]
    fn test_plain_click_leaves_open_batch_alone() {
        let mut engine = SelectionEngine::new();
        engine.click(&p("/clips"), &p("/clips/a.mp4"), true);

        let outcome = engine.click(&p("/clips"), &p("/clips/c.mp4"), false);
        assert_eq!(outcome, ClickOutcome::Commit(vec![p("/clips/c.mp4")]));
        assert_eq!(engine.pending(&p("/clips")), &[p("/clips/a.mp4")]);
    }

    #[test]
    fn test_release_drains_all_sections() {
        let mut engine = SelectionEngine::new();
        engine.click(&p("/clips"), &p("/clips/a.mp4"), true);
        engine.click(&p("/replays"), &p("/replays/x.mp4"), true);
        engine.click(&p("/replays"), &p("/replays/y.mp4"), true);

        let flushed = engine.release_modifier();
        assert_eq!(flushed.len(), 2);
        // BTreeMap keying: /clips before /replays
        assert_eq!(flushed[0], (p("/clips"), vec![p("/clips/a.mp4")]));
        assert_eq!(
            flushed[1],
            (p("/replays"), vec![p("/replays/x.mp4"), p("/replays/y.mp4")])
        );

        assert_eq!(engine.state(&p("/clips")), SelectionState::Idle);
        assert_eq!(engine.state(&p("/replays")), SelectionState::Idle);
    }

    #[test]
    fn test_release_with_nothing_pending_is_noop() {
        let mut engine = SelectionEngine::new();
        assert!(engine.release_modifier().is_empty());

        // Toggling an item in and back out leaves an empty batch behind;
        // releasing must not flush it.
        engine.click(&p("/clips"), &p("/clips/a.mp4"), true);
        engine.click(&p("/clips"), &p("/clips/a.mp4"), true);
        assert!(engine.release_modifier().is_empty());
    }

    #[test]
    fn test_clear_section_drops_pending() {
        let mut engine = SelectionEngine::new();
        engine.click(&p("/clips"), &p("/clips/a.mp4"), true);
        engine.clear_section(&p("/clips"));
        assert!(engine.release_modifier().is_empty());
    }
}
