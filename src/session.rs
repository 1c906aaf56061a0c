//! The editing session: one workspace plus its history.
//!
//! `Session` is the surface the presentation layer talks to. Every mutator
//! is wrapped as snapshot-before, mutate, record, so the history log always
//! holds the exact state on either side of each action; undo/redo restore
//! those snapshots wholesale. Document load and save are atomic: a load
//! that fails validation never touches the live workspace.
//!
//! A session is a plain value constructed wherever it is needed. There are
//! no ambient globals; collaborators receive a `&mut Session` (or just the
//! queries they need) explicitly.

use crate::document::{self, DocumentError, LoadOutcome};
use crate::history::{Action, HistoryEvent, HistoryManager, SubscriberId};
use crate::workspace::{
    CanvasConfig, CanvasOrientation, CycleOutcome, EditError, Grid, GridConfig, GridConfigPatch,
    GridId, GridOrientation, Interval, NoteId, NoteRef, Point, Workspace,
};
use std::collections::BTreeMap;
use std::path::Path;

/// An editing session over a single workspace.
#[derive(Debug, Default)]
pub struct Session {
    workspace: Workspace,
    history: HistoryManager,
}

impl Session {
    /// Creates a session with an empty workspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session around an existing workspace (tests, embedding).
    pub fn with_workspace(workspace: Workspace) -> Self {
        Self {
            workspace,
            history: HistoryManager::new(),
        }
    }

    // --- queries ------------------------------------------------------

    /// The live workspace, read-only.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// All grids in placement order.
    pub fn grids(&self) -> &[Grid] {
        self.workspace.grids()
    }

    /// The canvas configuration.
    pub fn canvas(&self) -> &CanvasConfig {
        self.workspace.canvas()
    }

    /// Current root-note reference, if any.
    pub fn root_note(&self) -> Option<&NoteRef> {
        self.workspace.root_note()
    }

    /// Current interval highlighting; empty means none.
    pub fn intervals(&self) -> &BTreeMap<NoteId, Interval> {
        self.workspace.intervals()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Registers an observer for history changes (the re-render trigger).
    pub fn subscribe(
        &mut self,
        observer: impl FnMut(&HistoryEvent) + Send + 'static,
    ) -> SubscriberId {
        self.history.subscribe(observer)
    }

    /// Removes a history observer.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.history.unsubscribe(id)
    }

    // --- recorded mutators --------------------------------------------

    /// Creates a grid (default configuration unless one is supplied).
    pub fn create_grid(&mut self, config: Option<GridConfig>) -> Result<GridId, EditError> {
        let before = self.workspace.clone();
        let grid_id = self.workspace.create_grid(config)?;
        self.record(
            Action::CreateGrid {
                grid_id: grid_id.clone(),
            },
            before,
        );
        Ok(grid_id)
    }

    /// Deletes a grid and everything on it.
    pub fn remove_grid(&mut self, id: &GridId) -> Result<(), EditError> {
        let before = self.workspace.clone();
        self.workspace.remove_grid(id)?;
        self.record(
            Action::RemoveGrid {
                grid_id: id.clone(),
            },
            before,
        );
        Ok(())
    }

    /// Applies a partial grid configuration change.
    pub fn update_grid_config(
        &mut self,
        id: &GridId,
        patch: GridConfigPatch,
    ) -> Result<(), EditError> {
        let before = self.workspace.clone();
        self.workspace.update_grid_config(id, patch)?;
        self.record(
            Action::UpdateGridConfig {
                grid_id: id.clone(),
            },
            before,
        );
        Ok(())
    }

    /// Moves a grid; returns the clamped position actually applied.
    pub fn move_grid(&mut self, id: &GridId, position: Point) -> Result<Point, EditError> {
        let before = self.workspace.clone();
        let applied = self.workspace.move_grid(id, position)?;
        self.record(
            Action::MoveGrid {
                grid_id: id.clone(),
                to: applied,
            },
            before,
        );
        Ok(applied)
    }

    /// Rotates one grid between vertical and horizontal.
    pub fn toggle_grid_orientation(&mut self, id: &GridId) -> Result<GridOrientation, EditError> {
        let before = self.workspace.clone();
        let orientation = self.workspace.toggle_grid_orientation(id)?;
        self.record(
            Action::ToggleGridOrientation {
                grid_id: id.clone(),
            },
            before,
        );
        Ok(orientation)
    }

    /// Places a chromatic note.
    pub fn place_note(
        &mut self,
        grid_id: &GridId,
        string_index: u8,
        fret: u8,
    ) -> Result<NoteId, EditError> {
        let before = self.workspace.clone();
        let note_id = self.workspace.place_note(grid_id, string_index, fret)?;
        self.record(
            Action::PlaceNote {
                note_id: note_id.clone(),
            },
            before,
        );
        Ok(note_id)
    }

    /// Advances a note's group tag; wrapping past the last group removes
    /// the note.
    pub fn cycle_note_group(&mut self, id: &NoteId) -> Result<CycleOutcome, EditError> {
        let before = self.workspace.clone();
        let outcome = self.workspace.cycle_note_group(id)?;
        self.record(
            Action::CycleNoteGroup {
                note_id: id.clone(),
                outcome,
            },
            before,
        );
        Ok(outcome)
    }

    /// Removes a note.
    pub fn remove_note(&mut self, id: &NoteId) -> Result<(), EditError> {
        let before = self.workspace.clone();
        self.workspace.remove_note(id)?;
        self.record(
            Action::RemoveNote {
                note_id: id.clone(),
            },
            before,
        );
        Ok(())
    }

    /// Sets or clears the root note.
    pub fn set_root_note(&mut self, target: Option<NoteRef>) -> Result<(), EditError> {
        let before = self.workspace.clone();
        self.workspace.set_root_note(target.clone())?;
        self.record(Action::SetRootNote { target }, before);
        Ok(())
    }

    /// Toggles the canvas lock. Recorded like any other action so a lock
    /// can be undone.
    pub fn toggle_lock(&mut self) -> bool {
        let before = self.workspace.clone();
        let locked = self.workspace.toggle_lock();
        self.record(Action::ToggleLock { locked }, before);
        locked
    }

    /// Flips the canvas between portrait and landscape.
    pub fn toggle_canvas_orientation(&mut self) -> Result<CanvasOrientation, EditError> {
        let before = self.workspace.clone();
        let orientation = self.workspace.toggle_canvas_orientation()?;
        self.record(Action::ToggleCanvasOrientation { orientation }, before);
        Ok(orientation)
    }

    // --- history ------------------------------------------------------

    /// Restores the snapshot before the last action. Returns whether
    /// anything was undone.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.workspace = snapshot;
                true
            }
            None => false,
        }
    }

    /// Re-applies the next undone action. Returns whether anything was
    /// redone.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.workspace = snapshot;
                true
            }
            None => false,
        }
    }

    fn record(&mut self, action: Action, before: Workspace) {
        self.history.record(action, before, self.workspace.clone());
    }

    // --- documents ----------------------------------------------------

    /// Serializes the current workspace to the JSON document.
    pub fn save_json(&self) -> Result<String, DocumentError> {
        document::save_json(&self.workspace)
    }

    /// Serializes the current workspace to the binary document.
    pub fn save_binary(&self) -> Result<Vec<u8>, DocumentError> {
        document::save_binary(&self.workspace)
    }

    /// Writes the JSON document to a file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), DocumentError> {
        document::save_to_file(&self.workspace, path)
    }

    /// Replaces the workspace from a JSON document.
    ///
    /// Parsing, validation, and replacement are one atomic unit: on any
    /// failure the current workspace and history are untouched. On success
    /// the history is cleared. Returns any non-fatal warnings.
    pub fn load_json(&mut self, json: &str) -> Result<Vec<String>, DocumentError> {
        self.adopt(document::load_json(json)?)
    }

    /// Replaces the workspace from a binary document.
    pub fn load_binary(&mut self, bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
        self.adopt(document::load_binary(bytes)?)
    }

    /// Replaces the workspace from a JSON document file.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<String>, DocumentError> {
        self.adopt(document::load_from_file(path)?)
    }

    fn adopt(&mut self, outcome: LoadOutcome) -> Result<Vec<String>, DocumentError> {
        self.workspace = outcome.workspace;
        self.history.clear();
        Ok(outcome.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::GroupState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_mutate_then_undo_restores_exact_state() {
        let mut session = Session::new();
        let empty = session.workspace().clone();

        let grid_id = session.create_grid(None).unwrap();
        let after_create = session.workspace().clone();
        session.place_note(&grid_id, 2, 5).unwrap();

        assert!(session.undo());
        assert_eq!(session.workspace(), &after_create);
        assert!(session.undo());
        assert_eq!(session.workspace(), &empty);
        assert!(!session.undo());

        assert!(session.redo());
        assert_eq!(session.workspace(), &after_create);
    }

    #[test]
    fn test_failed_mutation_records_nothing() {
        let mut session = Session::new();
        let grid_id = session.create_grid(None).unwrap();
        session.place_note(&grid_id, 0, 0).unwrap();
        assert!(session
            .place_note(&grid_id, 0, 0)
            .is_err_and(|e| e == EditError::CoordinateOccupied {
                string_index: 0,
                fret: 0
            }));

        // Two successful actions, not three.
        session.undo();
        session.undo();
        assert!(!session.can_undo());
    }

    #[test]
    fn test_undo_restores_removed_note_group() {
        let mut session = Session::new();
        let grid_id = session.create_grid(None).unwrap();
        let note = session.place_note(&grid_id, 1, 3).unwrap();
        for _ in 0..4 {
            session.cycle_note_group(&note).unwrap();
        }
        assert_eq!(
            session.cycle_note_group(&note).unwrap(),
            CycleOutcome::Removed
        );
        assert!(session.workspace().resolve_note(&note).is_none());

        assert!(session.undo());
        assert_eq!(
            session.workspace().resolve_note(&note).unwrap().group,
            GroupState::Group4
        );
    }

    #[test]
    fn test_subscription_fires_on_session_activity() {
        let mut session = Session::new();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        session.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.create_grid(None).unwrap(); // record
        session.undo(); // undone
        session.redo(); // redone
        assert_eq!(events.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_load_clears_history_and_replaces_state() {
        let mut donor = Session::new();
        let grid_id = donor.create_grid(None).unwrap();
        donor.place_note(&grid_id, 0, 0).unwrap();
        let json = donor.save_json().unwrap();

        let mut session = Session::new();
        session.create_grid(None).unwrap();
        let warnings = session.load_json(&json).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(session.workspace().note_count(), 1);
        assert!(!session.can_undo());
        assert!(!session.can_redo());
    }

    #[test]
    fn test_failed_load_leaves_workspace_untouched() {
        let mut session = Session::new();
        session.create_grid(None).unwrap();
        let before = session.workspace().clone();

        assert!(session.load_json("{\"version\":\"1.0\"}").is_err());
        assert_eq!(session.workspace(), &before);
        // History is intact too: the create is still undoable.
        assert!(session.can_undo());
    }

    #[test]
    fn test_lock_round_trip_through_history() {
        let mut session = Session::new();
        session.create_grid(None).unwrap();
        assert!(session.toggle_lock());
        assert_eq!(session.create_grid(None), Err(EditError::Locked));

        // Undoing the lock restores editability.
        assert!(session.undo());
        assert!(!session.canvas().locked);
        assert!(session.create_grid(None).is_ok());
    }

    #[test]
    fn test_save_load_file_round_trip() {
        let mut session = Session::new();
        let grid_id = session.create_grid(None).unwrap();
        let root = session.place_note(&grid_id, 0, 0).unwrap();
        session
            .set_root_note(Some(NoteRef {
                grid_id: grid_id.clone(),
                note_id: root,
            }))
            .unwrap();

        let dir = std::env::temp_dir().join("fretsheet-session-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roundtrip.json");
        session.save_to_file(&path).unwrap();

        let mut restored = Session::new();
        restored.load_from_file(&path).unwrap();
        assert_eq!(restored.workspace().root_note(), session.root_note());
        assert_eq!(restored.grids().len(), 1);
        std::fs::remove_file(&path).ok();
    }
}
