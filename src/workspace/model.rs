//! The canonical workspace aggregate.
//!
//! A [`Workspace`] owns one canvas configuration, an ordered collection of
//! grids, at most one root-note reference, and the derived interval mapping.
//! Mutators enforce the structural invariants (clamping rather than
//! rejecting out-of-range edits) and keep the interval map current; pure
//! queries serve the presentation layer.
//!
//! The root-note reference is id-based indirection, never a direct object
//! reference, so deleting the referenced grid or note can never leave a
//! dangling edge: the cascade simply clears the ids.

use crate::theory::{self, IntervalKind};
use crate::workspace::grid::{
    Grid, GridConfig, GridConfigPatch, GridId, GridOrientation, Point, MAX_FRET, MAX_STRINGS,
    MIN_FRET, MIN_STRINGS,
};
use crate::workspace::note::{GroupState, Note, NoteId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Default canvas size in pixels (portrait).
pub const DEFAULT_CANVAS_WIDTH: f64 = 800.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 1100.0;

/// Horizontal/vertical offset between successively created grids, so new
/// charts don't stack exactly on top of each other.
const GRID_CASCADE_STEP: f64 = 24.0;

/// Page orientation of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanvasOrientation {
    #[default]
    Portrait,
    Landscape,
}

/// Canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// The virtual page grids are placed on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanvasConfig {
    /// Page orientation.
    pub orientation: CanvasOrientation,

    /// While locked, every mutator except the lock toggle refuses with
    /// [`EditError::Locked`].
    pub locked: bool,

    /// Page size in pixels.
    pub dimensions: Dimensions,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            orientation: CanvasOrientation::Portrait,
            locked: false,
            dimensions: Dimensions {
                width: DEFAULT_CANVAS_WIDTH,
                height: DEFAULT_CANVAS_HEIGHT,
            },
        }
    }
}

/// Non-owning reference to the designated root note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteRef {
    pub grid_id: GridId,
    pub note_id: NoteId,
}

/// A note's interval relation to the current root note. Derived, never
/// stored persistently; recomputed on every root or note change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub kind: IntervalKind,
    pub distance: u8,
}

/// Result of cycling a note's group state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The note advanced to the given state.
    Advanced(GroupState),
    /// The cycle wrapped past the last group; the note was removed.
    Removed,
}

/// Named failure conditions for live edits.
///
/// None of these are fatal: every variant leaves the workspace unchanged
/// and is locally recoverable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The canvas is locked; the mutation was refused as a no-op.
    #[error("canvas is locked")]
    Locked,

    /// No grid with this id exists.
    #[error("grid not found: {0}")]
    GridNotFound(GridId),

    /// No note with this id exists.
    #[error("note not found: {0}")]
    NoteNotFound(NoteId),

    /// A note already occupies the target coordinate.
    #[error("coordinate occupied: string {string_index}, fret {fret}")]
    CoordinateOccupied { string_index: u8, fret: u8 },

    /// The coordinate falls outside the grid's configured range.
    #[error("coordinate out of range: string {string_index}, fret {fret}")]
    InvalidCoordinate { string_index: u8, fret: u8 },

    /// An explicitly supplied grid configuration is structurally malformed.
    #[error("invalid grid config: {0}")]
    InvalidConfig(String),
}

/// The root aggregate: one canvas, the grids on it, the root-note
/// reference, and the derived interval map.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Workspace {
    canvas: CanvasConfig,
    grids: Vec<Grid>,
    root_note: Option<NoteRef>,
    intervals: BTreeMap<NoteId, Interval>,
}

impl Workspace {
    /// Creates an empty workspace with the default canvas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a workspace from already-validated parts (document load).
    /// Grid positions are re-clamped onto the canvas, intervals are
    /// recomputed rather than trusted, and a root reference that no longer
    /// resolves is dropped.
    pub(crate) fn from_parts(
        canvas: CanvasConfig,
        grids: Vec<Grid>,
        root_note: Option<NoteRef>,
    ) -> Self {
        let mut workspace = Self {
            canvas,
            grids,
            root_note,
            intervals: BTreeMap::new(),
        };
        let ids: Vec<GridId> = workspace.grids.iter().map(|g| g.id.clone()).collect();
        for id in &ids {
            workspace.reclamp_grid(id);
        }
        if let Some(ref root) = workspace.root_note {
            if workspace.resolve_note(&root.note_id).is_none() {
                workspace.root_note = None;
            }
        }
        workspace.recompute_intervals();
        workspace
    }

    // --- queries ------------------------------------------------------

    /// The canvas configuration.
    pub fn canvas(&self) -> &CanvasConfig {
        &self.canvas
    }

    /// All grids in placement order.
    pub fn grids(&self) -> &[Grid] {
        &self.grids
    }

    /// Looks up a grid by id.
    pub fn grid(&self, id: &GridId) -> Option<&Grid> {
        self.grids.iter().find(|g| &g.id == id)
    }

    fn grid_mut(&mut self, id: &GridId) -> Option<&mut Grid> {
        self.grids.iter_mut().find(|g| &g.id == id)
    }

    /// The current root-note reference, if any.
    pub fn root_note(&self) -> Option<&NoteRef> {
        self.root_note.as_ref()
    }

    /// The current interval mapping. Empty when no root note is set, which
    /// also means "clear all interval highlighting".
    pub fn intervals(&self) -> &BTreeMap<NoteId, Interval> {
        &self.intervals
    }

    /// Interval for one note, if it relates to the root.
    pub fn interval_for(&self, id: &NoteId) -> Option<Interval> {
        self.intervals.get(id).copied()
    }

    /// Resolves a note id to the note, if it exists.
    pub fn resolve_note(&self, id: &NoteId) -> Option<&Note> {
        self.grid(id.grid()).and_then(|g| g.note(id))
    }

    /// Total number of notes across all grids.
    pub fn note_count(&self) -> usize {
        self.grids.iter().map(|g| g.note_count()).sum()
    }

    fn ensure_unlocked(&self) -> Result<(), EditError> {
        if self.canvas.locked {
            Err(EditError::Locked)
        } else {
            Ok(())
        }
    }

    // --- canvas mutators ----------------------------------------------

    /// Toggles the canvas lock. The only mutation permitted while locked.
    /// Returns the new lock state.
    pub fn toggle_lock(&mut self) -> bool {
        self.canvas.locked = !self.canvas.locked;
        self.canvas.locked
    }

    /// Flips the canvas between portrait and landscape, swapping the page
    /// dimensions and re-clamping every grid onto the new page.
    pub fn toggle_canvas_orientation(&mut self) -> Result<CanvasOrientation, EditError> {
        self.ensure_unlocked()?;
        self.canvas.orientation = match self.canvas.orientation {
            CanvasOrientation::Portrait => CanvasOrientation::Landscape,
            CanvasOrientation::Landscape => CanvasOrientation::Portrait,
        };
        let d = self.canvas.dimensions;
        self.canvas.dimensions = Dimensions {
            width: d.height,
            height: d.width,
        };
        let ids: Vec<GridId> = self.grids.iter().map(|g| g.id.clone()).collect();
        for id in &ids {
            self.reclamp_grid(id);
        }
        Ok(self.canvas.orientation)
    }

    // --- grid mutators ------------------------------------------------

    /// Creates a grid. With no explicit config, the standard chart is used
    /// (frets 0-7, six strings, standard tuning, vertical). Out-of-range
    /// numeric fields in an explicit config are clamped; a structurally
    /// malformed config (wrong tuning length) is rejected.
    pub fn create_grid(&mut self, config: Option<GridConfig>) -> Result<GridId, EditError> {
        self.ensure_unlocked()?;
        let config = match config {
            Some(config) => sanitize_config(config)?,
            None => GridConfig::standard(),
        };

        let cascade = self.grids.len() as f64 * GRID_CASCADE_STEP;
        let mut grid = Grid::new(Point::new(cascade, cascade), config);
        grid.position = self.clamp_to_canvas(&grid, grid.position);
        let id = grid.id.clone();
        self.grids.push(grid);
        Ok(id)
    }

    /// Deletes a grid and all its notes; clears the root reference if it
    /// pointed inside.
    pub fn remove_grid(&mut self, id: &GridId) -> Result<(), EditError> {
        self.ensure_unlocked()?;
        let index = self
            .grids
            .iter()
            .position(|g| &g.id == id)
            .ok_or_else(|| EditError::GridNotFound(id.clone()))?;
        self.grids.remove(index);
        if self.root_note.as_ref().is_some_and(|r| &r.grid_id == id) {
            self.root_note = None;
        }
        self.recompute_intervals();
        Ok(())
    }

    /// Applies a partial configuration change.
    ///
    /// Fret bounds are clamped to `0..=24` and a crossed bound is snapped
    /// to the other; string count is clamped to `4..=12` and a change
    /// regenerates the standard tuning. Notes are re-laid out: coordinates
    /// outside the new range are dropped (cascading root clearing) and
    /// surviving pitches re-resolved.
    pub fn update_grid_config(
        &mut self,
        id: &GridId,
        patch: GridConfigPatch,
    ) -> Result<(), EditError> {
        self.ensure_unlocked()?;
        let dropped = {
            let grid = self
                .grid_mut(id)
                .ok_or_else(|| EditError::GridNotFound(id.clone()))?;
            let config = &mut grid.config;

            if let Some(start) = patch.start_fret {
                config.start_fret = start.clamp(MIN_FRET, MAX_FRET);
            }
            if let Some(end) = patch.end_fret {
                config.end_fret = end.clamp(MIN_FRET, MAX_FRET);
            }
            if config.start_fret > config.end_fret {
                // The bound the caller moved is the one that crossed.
                if patch.end_fret.is_some() {
                    config.end_fret = config.start_fret;
                } else {
                    config.start_fret = config.end_fret;
                }
            }

            if let Some(count) = patch.string_count {
                let count = count.clamp(MIN_STRINGS, MAX_STRINGS);
                if count != config.string_count {
                    config.string_count = count;
                    config.tuning = theory::standard_tuning(count);
                }
            }
            if let Some(orientation) = patch.orientation {
                config.orientation = orientation;
            }

            grid.relayout_notes()
        };

        // The bounding box may have changed shape; keep it on the page.
        self.reclamp_grid(id);

        if self
            .root_note
            .as_ref()
            .is_some_and(|r| dropped.contains(&r.note_id))
        {
            self.root_note = None;
        }
        self.recompute_intervals();
        Ok(())
    }

    /// Moves a grid, clamping so its bounding box stays entirely on the
    /// canvas. Returns the position actually applied.
    pub fn move_grid(&mut self, id: &GridId, position: Point) -> Result<Point, EditError> {
        self.ensure_unlocked()?;
        let grid = self
            .grid(id)
            .ok_or_else(|| EditError::GridNotFound(id.clone()))?;
        let clamped = self.clamp_to_canvas(grid, position);
        if let Some(grid) = self.grid_mut(id) {
            grid.position = clamped;
        }
        Ok(clamped)
    }

    /// Flips one grid between vertical and horizontal, re-clamping its
    /// position for the rotated bounding box.
    pub fn toggle_grid_orientation(&mut self, id: &GridId) -> Result<GridOrientation, EditError> {
        self.ensure_unlocked()?;
        let orientation = {
            let grid = self
                .grid_mut(id)
                .ok_or_else(|| EditError::GridNotFound(id.clone()))?;
            grid.config.orientation = grid.config.orientation.flipped();
            grid.config.orientation
        };
        self.reclamp_grid(id);
        Ok(orientation)
    }

    // --- note mutators ------------------------------------------------

    /// Places a chromatic note at `(string_index, fret)` in `grid_id`.
    pub fn place_note(
        &mut self,
        grid_id: &GridId,
        string_index: u8,
        fret: u8,
    ) -> Result<NoteId, EditError> {
        self.ensure_unlocked()?;
        let grid = self
            .grid_mut(grid_id)
            .ok_or_else(|| EditError::GridNotFound(grid_id.clone()))?;
        if !grid.config.contains(string_index, fret) {
            return Err(EditError::InvalidCoordinate { string_index, fret });
        }
        let id = grid.note_id_at(string_index, fret);
        if grid.note(&id).is_some() {
            return Err(EditError::CoordinateOccupied { string_index, fret });
        }
        let pitch = theory::pitch_at(&grid.config.tuning[string_index as usize], fret);
        grid.insert_note(Note::new(pitch, string_index, fret));
        self.recompute_intervals();
        Ok(id)
    }

    /// Advances a note's group state through chromatic, group1..group4;
    /// advancing past group4 removes the note instead of wrapping.
    pub fn cycle_note_group(&mut self, id: &NoteId) -> Result<CycleOutcome, EditError> {
        self.ensure_unlocked()?;
        let grid = self
            .grid_mut(id.grid())
            .ok_or_else(|| EditError::GridNotFound(id.grid().clone()))?;
        let note = grid
            .note_mut(id)
            .ok_or_else(|| EditError::NoteNotFound(id.clone()))?;

        match note.group.next() {
            Some(next) => {
                note.group = next;
                Ok(CycleOutcome::Advanced(next))
            }
            None => {
                grid.remove_note(id);
                self.clear_root_if_referent(id);
                self.recompute_intervals();
                Ok(CycleOutcome::Removed)
            }
        }
    }

    /// Removes a note; clears the root reference if it was the referent.
    pub fn remove_note(&mut self, id: &NoteId) -> Result<(), EditError> {
        self.ensure_unlocked()?;
        let grid = self
            .grid_mut(id.grid())
            .ok_or_else(|| EditError::GridNotFound(id.grid().clone()))?;
        grid.remove_note(id)
            .ok_or_else(|| EditError::NoteNotFound(id.clone()))?;
        self.clear_root_if_referent(id);
        self.recompute_intervals();
        Ok(())
    }

    // --- root note ----------------------------------------------------

    /// Sets or clears the root-note reference; at most one exists
    /// workspace-wide. The target is validated before any state changes, so
    /// a failed call leaves the existing reference and interval mapping
    /// untouched. Recomputes the interval mapping on success.
    pub fn set_root_note(&mut self, target: Option<NoteRef>) -> Result<(), EditError> {
        self.ensure_unlocked()?;
        if let Some(ref target) = target {
            let grid = self
                .grid(&target.grid_id)
                .ok_or_else(|| EditError::GridNotFound(target.grid_id.clone()))?;
            if grid.note(&target.note_id).is_none() {
                return Err(EditError::NoteNotFound(target.note_id.clone()));
            }
        }
        self.root_note = target;
        self.recompute_intervals();
        Ok(())
    }

    /// Recomputes the noteId → interval mapping from the current root.
    ///
    /// With no root the mapping is empty, which signals "clear all interval
    /// highlighting". The root referent itself carries no entry. A note
    /// whose pitch class matches the root's (distance 0) is classified as
    /// an octave: the register difference is real even though the distance
    /// normalizes to zero.
    pub fn recompute_intervals(&mut self) {
        self.intervals.clear();
        let Some(root_ref) = self.root_note.clone() else {
            return;
        };
        let Some(root_pitch) = self.resolve_note(&root_ref.note_id).map(|n| n.pitch) else {
            // Dangling reference; the cascade should have cleared it.
            self.root_note = None;
            return;
        };

        for grid in &self.grids {
            for (id, note) in grid.notes() {
                if *id == root_ref.note_id {
                    continue;
                }
                let entry = match theory::interval(root_pitch, note.pitch) {
                    Some((kind, distance)) => Interval { kind, distance },
                    None if note.pitch.semitone == root_pitch.semitone => Interval {
                        kind: IntervalKind::Octave,
                        distance: 0,
                    },
                    None => continue,
                };
                self.intervals.insert(id.clone(), entry);
            }
        }
    }

    fn clear_root_if_referent(&mut self, id: &NoteId) {
        if self.root_note.as_ref().is_some_and(|r| &r.note_id == id) {
            self.root_note = None;
        }
    }

    /// Re-clamps one grid's stored position against the current canvas.
    fn reclamp_grid(&mut self, id: &GridId) {
        let Some(grid) = self.grid(id) else { return };
        let clamped = self.clamp_to_canvas(grid, grid.position);
        if let Some(grid) = self.grid_mut(id) {
            grid.position = clamped;
        }
    }

    /// Clamps `position` so `grid`'s bounding box stays inside the canvas.
    fn clamp_to_canvas(&self, grid: &Grid, position: Point) -> Point {
        let (w, h) = grid.bounding_size();
        let max_x = (self.canvas.dimensions.width - w).max(0.0);
        let max_y = (self.canvas.dimensions.height - h).max(0.0);
        Point::new(position.x.clamp(0.0, max_x), position.y.clamp(0.0, max_y))
    }
}

/// Clamps numeric fields of an explicit config and verifies its structure.
///
/// Numeric ranges are clamped, never rejected; a tuning whose length does
/// not match the (clamped) string count is malformed and rejected. Tuning
/// semitones are normalized into `0..=11`.
fn sanitize_config(mut config: GridConfig) -> Result<GridConfig, EditError> {
    config.start_fret = config.start_fret.clamp(MIN_FRET, MAX_FRET);
    config.end_fret = config.end_fret.clamp(MIN_FRET, MAX_FRET);
    if config.start_fret > config.end_fret {
        config.end_fret = config.start_fret;
    }

    let clamped_count = config.string_count.clamp(MIN_STRINGS, MAX_STRINGS);
    if config.tuning.len() != config.string_count as usize {
        return Err(EditError::InvalidConfig(format!(
            "tuning has {} entries for {} strings",
            config.tuning.len(),
            config.string_count
        )));
    }
    if clamped_count != config.string_count {
        config.string_count = clamped_count;
        config.tuning = theory::standard_tuning(clamped_count);
    }
    for entry in &mut config.tuning {
        entry.semitone %= 12;
    }
    Ok(config)
}
