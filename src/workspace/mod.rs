//! Canonical workspace entity graph.
//!
//! This module provides the data model for a diagram document: the canvas,
//! the grids placed on it, the notes on each grid, the singleton root-note
//! reference, and the derived interval mapping.

mod grid;
mod model;
mod note;

pub use grid::{
    Grid, GridConfig, GridConfigPatch, GridId, GridOrientation, Point, FRET_SPACING, GRID_MARGIN,
    MAX_FRET, MAX_STRINGS, MIN_FRET, MIN_STRINGS, STRING_SPACING,
};
pub use model::{
    CanvasConfig, CanvasOrientation, CycleOutcome, Dimensions, EditError, Interval, NoteRef,
    Workspace, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH,
};
pub use note::{GroupState, Note, NoteId};
