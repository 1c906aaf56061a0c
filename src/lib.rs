//! fretsheet - a workspace engine for fretboard diagrams.
//!
//! This library provides the canonical data model for a fretboard-chart
//! editor: grids placed on a virtual page, notes with pitch and group tags,
//! a singleton root note with derived interval highlighting, snapshot-based
//! undo/redo, and a versioned JSON document for save/load.

pub mod document;
pub mod history;
pub mod session;
pub mod theory;
pub mod workspace;

// Re-export commonly used types
pub use document::{Document, DocumentError, LoadOutcome, SCHEMA_VERSION};
pub use history::{Action, HistoryEvent, HistoryManager, SubscriberId, MAX_HISTORY_SIZE};
pub use session::Session;
pub use theory::{FretMarker, IntervalKind, PitchClass, StringTuning};
pub use workspace::{
    CycleOutcome, EditError, Grid, GridConfig, GridConfigPatch, GridId, GridOrientation,
    GroupState, Note, NoteId, NoteRef, Workspace,
};
