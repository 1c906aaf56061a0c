//! Fretboard grid entity.
//!
//! A grid is one chart on the page: a fret range, a set of strings with
//! their open tuning, an orientation, a position on the canvas, and the
//! notes placed on it.

use crate::theory::{self, FretMarker, StringTuning};
use crate::workspace::note::{Note, NoteId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Lowest legal fret bound.
pub const MIN_FRET: u8 = 0;

/// Highest legal fret bound.
pub const MAX_FRET: u8 = 24;

/// Minimum number of strings on a grid.
pub const MIN_STRINGS: u8 = 4;

/// Maximum number of strings on a grid.
pub const MAX_STRINGS: u8 = 12;

/// Pixel distance between adjacent strings.
pub const STRING_SPACING: f64 = 30.0;

/// Pixel distance between adjacent frets.
pub const FRET_SPACING: f64 = 40.0;

/// Pixel margin around the playing area for labels and fret numbers.
pub const GRID_MARGIN: f64 = 40.0;

/// Unique identifier for a grid within a workspace.
///
/// Backed by a UUID string; stable across save/load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridId(String);

impl GridId {
    /// Generates a fresh random grid id.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing id string (used when parsing note ids and
    /// documents).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A point on the canvas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Which way a grid is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridOrientation {
    /// Strings run top to bottom, frets stack downward.
    #[default]
    Vertical,
    /// Strings run left to right, frets extend rightward.
    Horizontal,
}

impl GridOrientation {
    pub fn flipped(self) -> Self {
        match self {
            GridOrientation::Vertical => GridOrientation::Horizontal,
            GridOrientation::Horizontal => GridOrientation::Vertical,
        }
    }
}

/// A grid's display configuration.
///
/// Constructed values always satisfy the structural invariants:
/// `0 <= start_fret <= end_fret <= 24`, `4 <= string_count <= 12`, and
/// `tuning.len() == string_count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridConfig {
    /// First visible fret.
    pub start_fret: u8,

    /// Last visible fret.
    pub end_fret: u8,

    /// Number of strings.
    pub string_count: u8,

    /// Open pitch class per string, low to high; length equals
    /// `string_count`.
    pub tuning: Vec<StringTuning>,

    /// Drawing orientation.
    pub orientation: GridOrientation,
}

impl GridConfig {
    /// The default chart: frets 0-7, six strings, standard tuning, vertical.
    pub fn standard() -> Self {
        Self {
            start_fret: 0,
            end_fret: 7,
            string_count: 6,
            tuning: theory::standard_tuning(6),
            orientation: GridOrientation::Vertical,
        }
    }

    /// Number of visible fret positions (inclusive range).
    pub fn fret_span(&self) -> u8 {
        self.end_fret - self.start_fret
    }

    /// Whether `(string_index, fret)` falls inside this configuration.
    pub fn contains(&self, string_index: u8, fret: u8) -> bool {
        string_index < self.string_count && (self.start_fret..=self.end_fret).contains(&fret)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// A partial configuration update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridConfigPatch {
    pub start_fret: Option<u8>,
    pub end_fret: Option<u8>,
    pub string_count: Option<u8>,
    pub orientation: Option<GridOrientation>,
}

/// One fretboard chart placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    /// Unique identifier.
    pub id: GridId,

    /// Top-left position on the canvas, in pixels.
    pub position: Point,

    /// Display configuration.
    pub config: GridConfig,

    /// Notes keyed by their coordinate-derived id. BTreeMap keeps document
    /// output deterministic.
    notes: BTreeMap<NoteId, Note>,
}

impl Grid {
    /// Creates an empty grid with the given configuration.
    pub fn new(position: Point, config: GridConfig) -> Self {
        Self {
            id: GridId::new(),
            position,
            config,
            notes: BTreeMap::new(),
        }
    }

    /// Pixel size of the grid's bounding box, honoring orientation.
    ///
    /// Derived from the layout constants, never stored: a configuration
    /// change re-lays the grid out implicitly.
    pub fn bounding_size(&self) -> (f64, f64) {
        let across = (self.config.string_count.saturating_sub(1)) as f64 * STRING_SPACING
            + 2.0 * GRID_MARGIN;
        let along = self.config.fret_span().max(1) as f64 * FRET_SPACING + 2.0 * GRID_MARGIN;
        match self.config.orientation {
            GridOrientation::Vertical => (across, along),
            GridOrientation::Horizontal => (along, across),
        }
    }

    /// Position markers visible in this grid's fret range.
    pub fn fret_markers(&self) -> Vec<FretMarker> {
        theory::fret_markers(self.config.start_fret, self.config.end_fret)
    }

    /// The id a note at `(string_index, fret)` would have in this grid.
    pub fn note_id_at(&self, string_index: u8, fret: u8) -> NoteId {
        NoteId::at(&self.id, string_index, fret)
    }

    /// Looks up a note by id.
    pub fn note(&self, id: &NoteId) -> Option<&Note> {
        self.notes.get(id)
    }

    /// Mutable note lookup.
    pub fn note_mut(&mut self, id: &NoteId) -> Option<&mut Note> {
        self.notes.get_mut(id)
    }

    /// Inserts a note under its derived id. Callers must have checked the
    /// coordinate is free; an existing note at the same id is replaced.
    pub fn insert_note(&mut self, note: Note) -> NoteId {
        let id = self.note_id_at(note.string_index, note.fret);
        self.notes.insert(id.clone(), note);
        id
    }

    /// Removes a note by id, returning it if present.
    pub fn remove_note(&mut self, id: &NoteId) -> Option<Note> {
        self.notes.remove(id)
    }

    /// All notes in this grid, keyed by id.
    pub fn notes(&self) -> &BTreeMap<NoteId, Note> {
        &self.notes
    }

    /// Number of notes on this grid.
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Drops every note whose coordinate is outside the current config and
    /// re-resolves pitch for the survivors against the current tuning.
    ///
    /// Returns the ids of dropped notes so callers can cascade (root-note
    /// clearing, interval recomputation).
    pub fn relayout_notes(&mut self) -> Vec<NoteId> {
        let old = std::mem::take(&mut self.notes);
        let mut dropped = Vec::new();
        for (id, mut note) in old {
            if self.config.contains(note.string_index, note.fret) {
                let tuning = &self.config.tuning[note.string_index as usize];
                note.pitch = theory::pitch_at(tuning, note.fret);
                self.notes.insert(id, note);
            } else {
                dropped.push(id);
            }
        }
        dropped
    }
}
