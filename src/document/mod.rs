//! Document save/load: the single self-contained persistence contract.
//!
//! Saving validates the in-memory model's structural invariants first and
//! never writes a partially-invalid document. Loading parses and strictly
//! validates the document's structure before anything is adopted; a failed
//! load leaves the caller's workspace untouched. A version mismatch is a
//! non-fatal compatibility warning, not a hard failure.

mod schema;

pub use schema::{
    CanvasDoc, Document, GridConfigDoc, GridDoc, IntervalDoc, NoteDoc, RootNoteDoc, SettingsDoc,
    SCHEMA_VERSION,
};

use crate::history::now_millis;
use crate::theory;
use crate::workspace::{
    CanvasConfig, Grid, GridConfig, GridId, Note, NoteId, NoteRef, Workspace, MAX_FRET,
    MAX_STRINGS, MIN_STRINGS,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised by document save/load.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The bytes are not a structurally valid JSON document. serde reports
    /// the failing field and location.
    #[error("failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The bytes are not a structurally valid binary document.
    #[error("failed to parse binary document: {0}")]
    Binary(#[from] bincode::Error),

    /// The document (or the in-memory model, on save) violates a named
    /// invariant.
    #[error("invalid document: {field}: {reason}")]
    Invalid { field: String, reason: String },

    /// File read/write failure.
    #[error("document I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A successfully loaded workspace plus any non-fatal warnings.
#[derive(Debug)]
pub struct LoadOutcome {
    pub workspace: Workspace,
    pub warnings: Vec<String>,
}

// --- save -------------------------------------------------------------

/// Serializes a workspace to the canonical pretty-printed JSON document.
///
/// The in-memory model is validated first; a violated invariant aborts the
/// save with the failing field named.
pub fn save_json(workspace: &Workspace) -> Result<String, DocumentError> {
    let document = to_document(workspace)?;
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Serializes a workspace to the compact binary form of the same document.
pub fn save_binary(workspace: &Workspace) -> Result<Vec<u8>, DocumentError> {
    let document = to_document(workspace)?;
    Ok(bincode::serialize(&document)?)
}

/// Writes the JSON document to a file.
pub fn save_to_file<P: AsRef<Path>>(workspace: &Workspace, path: P) -> Result<(), DocumentError> {
    let json = save_json(workspace)?;
    fs::write(path, json)?;
    Ok(())
}

/// Writes the binary document to a file.
pub fn save_to_binary_file<P: AsRef<Path>>(
    workspace: &Workspace,
    path: P,
) -> Result<(), DocumentError> {
    let data = save_binary(workspace)?;
    fs::write(path, data)?;
    Ok(())
}

/// Builds the document for a workspace, validating the model first.
pub fn to_document(workspace: &Workspace) -> Result<Document, DocumentError> {
    validate_workspace(workspace)?;
    let timestamp = now_millis();

    let grids = workspace
        .grids()
        .iter()
        .map(|grid| GridDoc {
            id: grid.id.to_string(),
            position: grid.position,
            config: GridConfigDoc {
                start_fret: grid.config.start_fret,
                end_fret: grid.config.end_fret,
                string_count: grid.config.string_count,
                tuning: grid.config.tuning.clone(),
                orientation: grid.config.orientation,
            },
            notes: grid
                .notes()
                .iter()
                .map(|(id, note)| {
                    (
                        id.to_string(),
                        NoteDoc {
                            name: note.pitch.name.to_string(),
                            semitone: note.pitch.semitone,
                            is_natural: note.pitch.is_natural,
                            string_index: note.string_index,
                            fret: note.fret,
                            group_state: note.group,
                        },
                    )
                })
                .collect(),
        })
        .collect();

    Ok(Document {
        version: SCHEMA_VERSION.to_string(),
        timestamp,
        canvas: CanvasDoc {
            orientation: workspace.canvas().orientation,
            locked: workspace.canvas().locked,
            dimensions: workspace.canvas().dimensions,
        },
        grids,
        root_note: workspace.root_note().map(|r| RootNoteDoc {
            grid_id: r.grid_id.to_string(),
            note_id: r.note_id.to_string(),
        }),
        intervals: workspace
            .intervals()
            .iter()
            .map(|(id, interval)| {
                (
                    id.to_string(),
                    IntervalDoc {
                        kind: interval.kind,
                        distance: interval.distance,
                    },
                )
            })
            .collect(),
        settings: SettingsDoc {
            version: SCHEMA_VERSION.to_string(),
            timestamp,
        },
    })
}

/// Checks the in-memory model's structural invariants before a save.
fn validate_workspace(workspace: &Workspace) -> Result<(), DocumentError> {
    let d = workspace.canvas().dimensions;
    if !(d.width.is_finite() && d.height.is_finite() && d.width > 0.0 && d.height > 0.0) {
        return Err(DocumentError::invalid(
            "canvas.dimensions",
            "must be positive and finite",
        ));
    }

    let mut seen = BTreeSet::new();
    for grid in workspace.grids() {
        let field = format!("grids[{}]", grid.id);
        if !seen.insert(grid.id.clone()) {
            return Err(DocumentError::invalid(field, "duplicate grid id"));
        }
        if grid.config.start_fret > grid.config.end_fret || grid.config.end_fret > MAX_FRET {
            return Err(DocumentError::invalid(
                format!("{field}.config"),
                "fret bounds out of range",
            ));
        }
        if !(MIN_STRINGS..=MAX_STRINGS).contains(&grid.config.string_count) {
            return Err(DocumentError::invalid(
                format!("{field}.config.stringCount"),
                "must be between 4 and 12",
            ));
        }
        if grid.config.tuning.len() != grid.config.string_count as usize {
            return Err(DocumentError::invalid(
                format!("{field}.config.tuning"),
                "length must match string count",
            ));
        }
        for (id, note) in grid.notes() {
            // Map keys already guarantee per-coordinate uniqueness; the
            // stored coordinate must agree with its key.
            if id.string_index() != note.string_index
                || id.fret() != note.fret
                || id.grid() != &grid.id
            {
                return Err(DocumentError::invalid(
                    format!("{field}.notes[{id}]"),
                    "note id does not match its coordinate",
                ));
            }
            if !grid.config.contains(note.string_index, note.fret) {
                return Err(DocumentError::invalid(
                    format!("{field}.notes[{id}]"),
                    "coordinate outside grid range",
                ));
            }
        }
    }

    if let Some(root) = workspace.root_note() {
        if workspace.resolve_note(&root.note_id).is_none() {
            return Err(DocumentError::invalid(
                "rootNote",
                "does not resolve to an existing note",
            ));
        }
    }
    Ok(())
}

// --- load -------------------------------------------------------------

/// Parses and validates a JSON document, producing a fresh workspace.
///
/// Nothing is adopted until the whole document validates, so a failure
/// cannot leave a caller's workspace partially replaced.
pub fn load_json(json: &str) -> Result<LoadOutcome, DocumentError> {
    let document: Document = serde_json::from_str(json)?;
    from_document(document)
}

/// Parses and validates the binary form of the document.
pub fn load_binary(bytes: &[u8]) -> Result<LoadOutcome, DocumentError> {
    let document: Document = bincode::deserialize(bytes)?;
    from_document(document)
}

/// Loads a JSON document from a file.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<LoadOutcome, DocumentError> {
    let json = fs::read_to_string(path)?;
    load_json(&json)
}

/// Loads a binary document from a file.
pub fn load_from_binary_file<P: AsRef<Path>>(path: P) -> Result<LoadOutcome, DocumentError> {
    let data = fs::read(path)?;
    load_binary(&data)
}

/// Validates a parsed document and builds the workspace from it.
///
/// Pitch classes are re-resolved from tuning + fret (the document's stored
/// name/semitone are checked for range only), grid positions are re-clamped
/// onto the canvas, and the interval mapping is recomputed rather than
/// trusted.
pub fn from_document(document: Document) -> Result<LoadOutcome, DocumentError> {
    let mut warnings = Vec::new();
    if document.version != SCHEMA_VERSION {
        let warning = format!(
            "document version {:?} differs from supported {:?}; loading anyway",
            document.version, SCHEMA_VERSION
        );
        tracing::warn!("{}", warning);
        warnings.push(warning);
    }

    validate_document(&document)?;

    let mut grids = Vec::with_capacity(document.grids.len());
    for grid_doc in &document.grids {
        let config = GridConfig {
            start_fret: grid_doc.config.start_fret,
            end_fret: grid_doc.config.end_fret,
            string_count: grid_doc.config.string_count,
            tuning: grid_doc.config.tuning.clone(),
            orientation: grid_doc.config.orientation,
        };
        let mut grid = Grid::new(grid_doc.position, config);
        grid.id = GridId::from_raw(grid_doc.id.clone());
        for note_doc in grid_doc.notes.values() {
            let tuning = &grid.config.tuning[note_doc.string_index as usize];
            let pitch = theory::pitch_at(tuning, note_doc.fret);
            let mut note = Note::new(pitch, note_doc.string_index, note_doc.fret);
            note.group = note_doc.group_state;
            grid.insert_note(note);
        }
        grids.push(grid);
    }

    let canvas = CanvasConfig {
        orientation: document.canvas.orientation,
        locked: document.canvas.locked,
        dimensions: document.canvas.dimensions,
    };

    let root_note = match &document.root_note {
        Some(root) => Some(NoteRef {
            grid_id: GridId::from_raw(root.grid_id.clone()),
            note_id: root
                .note_id
                .parse::<NoteId>()
                .map_err(|e| DocumentError::invalid("rootNote.noteId", e))?,
        }),
        None => None,
    };

    Ok(LoadOutcome {
        workspace: Workspace::from_parts(canvas, grids, root_note),
        warnings,
    })
}

/// Strict structural and semantic validation of a parsed document.
fn validate_document(document: &Document) -> Result<(), DocumentError> {
    let d = document.canvas.dimensions;
    if !(d.width.is_finite() && d.height.is_finite() && d.width > 0.0 && d.height > 0.0) {
        return Err(DocumentError::invalid(
            "canvas.dimensions",
            "must be positive and finite",
        ));
    }

    let mut grid_ids = BTreeSet::new();
    for (index, grid) in document.grids.iter().enumerate() {
        let field = format!("grids[{index}]");
        if grid.id.is_empty() {
            return Err(DocumentError::invalid(format!("{field}.id"), "empty id"));
        }
        if !grid_ids.insert(grid.id.as_str()) {
            return Err(DocumentError::invalid(
                format!("{field}.id"),
                "duplicate grid id",
            ));
        }
        if !(grid.position.x.is_finite() && grid.position.y.is_finite()) {
            return Err(DocumentError::invalid(
                format!("{field}.position"),
                "must be finite",
            ));
        }

        let config = &grid.config;
        if config.start_fret > config.end_fret {
            return Err(DocumentError::invalid(
                format!("{field}.config.startFret"),
                "start fret exceeds end fret",
            ));
        }
        if config.end_fret > MAX_FRET {
            return Err(DocumentError::invalid(
                format!("{field}.config.endFret"),
                "end fret exceeds 24",
            ));
        }
        if !(MIN_STRINGS..=MAX_STRINGS).contains(&config.string_count) {
            return Err(DocumentError::invalid(
                format!("{field}.config.stringCount"),
                "must be between 4 and 12",
            ));
        }
        if config.tuning.len() != config.string_count as usize {
            return Err(DocumentError::invalid(
                format!("{field}.config.tuning"),
                format!(
                    "has {} entries for {} strings",
                    config.tuning.len(),
                    config.string_count
                ),
            ));
        }
        for (s, entry) in config.tuning.iter().enumerate() {
            if entry.semitone > 11 {
                return Err(DocumentError::invalid(
                    format!("{field}.config.tuning[{s}].semitone"),
                    "must be 0..=11",
                ));
            }
        }

        for (key, note) in &grid.notes {
            let note_field = format!("{field}.notes[{key}]");
            let id = key
                .parse::<NoteId>()
                .map_err(|e| DocumentError::invalid(note_field.clone(), e))?;
            if id.grid().as_str() != grid.id {
                return Err(DocumentError::invalid(
                    note_field,
                    "note key names a different grid",
                ));
            }
            if id.string_index() != note.string_index || id.fret() != note.fret {
                return Err(DocumentError::invalid(
                    note_field,
                    "note key does not match its coordinate",
                ));
            }
            if note.string_index >= config.string_count {
                return Err(DocumentError::invalid(
                    format!("{note_field}.stringIndex"),
                    "outside string count",
                ));
            }
            if !(config.start_fret..=config.end_fret).contains(&note.fret) {
                return Err(DocumentError::invalid(
                    format!("{note_field}.fret"),
                    "outside fret range",
                ));
            }
            if note.semitone > 11 {
                return Err(DocumentError::invalid(
                    format!("{note_field}.semitone"),
                    "must be 0..=11",
                ));
            }
        }
    }

    if let Some(root) = &document.root_note {
        let grid = document
            .grids
            .iter()
            .find(|g| g.id == root.grid_id)
            .ok_or_else(|| {
                DocumentError::invalid("rootNote.gridId", "does not name an existing grid")
            })?;
        if !grid.notes.contains_key(&root.note_id) {
            return Err(DocumentError::invalid(
                "rootNote.noteId",
                "does not name an existing note",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::IntervalKind;
    use crate::workspace::{GroupState, NoteRef, Point};

    /// A workspace with one grid, two notes, and a root set on the first.
    fn sample_workspace() -> Workspace {
        let mut ws = Workspace::new();
        let grid_id = ws.create_grid(None).unwrap();
        let root = ws.place_note(&grid_id, 0, 0).unwrap();
        let fifth = ws.place_note(&grid_id, 1, 2).unwrap();
        ws.cycle_note_group(&fifth).unwrap(); // group1
        ws.set_root_note(Some(NoteRef {
            grid_id,
            note_id: root,
        }))
        .unwrap();
        ws
    }

    #[test]
    fn test_save_load_round_trip() {
        let ws = sample_workspace();
        let json = save_json(&ws).unwrap();
        let outcome = load_json(&json).unwrap();
        assert!(outcome.warnings.is_empty());

        let loaded = outcome.workspace;
        assert_eq!(loaded.grids().len(), 1);
        assert_eq!(loaded.note_count(), 2);
        assert_eq!(loaded.canvas(), ws.canvas());
        assert_eq!(loaded.root_note(), ws.root_note());
        assert_eq!(loaded.intervals(), ws.intervals());

        let grid = &loaded.grids()[0];
        assert_eq!(grid.config, ws.grids()[0].config);
        assert_eq!(grid.position, ws.grids()[0].position);
        let fifth = grid.note_id_at(1, 2);
        assert_eq!(loaded.resolve_note(&fifth).unwrap().group, GroupState::Group1);
    }

    #[test]
    fn test_round_trip_preserves_interval_mapping() {
        let ws = sample_workspace();
        let json = save_json(&ws).unwrap();
        let loaded = load_json(&json).unwrap().workspace;

        let grid_id = loaded.grids()[0].id.clone();
        let fifth = loaded.grids()[0].note_id_at(1, 2);
        let interval = loaded.interval_for(&fifth).unwrap();
        assert_eq!(interval.kind, IntervalKind::PerfectFifth);
        assert_eq!(interval.distance, 7);
        assert_eq!(loaded.root_note().unwrap().grid_id, grid_id);
    }

    #[test]
    fn test_binary_round_trip_matches_json() {
        let ws = sample_workspace();
        let bytes = save_binary(&ws).unwrap();
        let from_binary = load_binary(&bytes).unwrap().workspace;
        let from_json = load_json(&save_json(&ws).unwrap()).unwrap().workspace;
        assert_eq!(from_binary.grids(), from_json.grids());
        assert_eq!(from_binary.root_note(), from_json.root_note());
        assert_eq!(from_binary.intervals(), from_json.intervals());
    }

    #[test]
    fn test_missing_grids_fails() {
        let err = load_json(r#"{"version":"1.0","timestamp":0}"#).unwrap_err();
        assert!(matches!(err, DocumentError::Parse(_)));
        assert!(err.to_string().contains("grids") || err.to_string().contains("canvas"));
    }

    #[test]
    fn test_non_array_tuning_fails() {
        let ws = sample_workspace();
        let mut value: serde_json::Value =
            serde_json::from_str(&save_json(&ws).unwrap()).unwrap();
        value["grids"][0]["config"]["tuning"] = serde_json::json!("EADGBE");
        let err = load_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, DocumentError::Parse(_)));
    }

    #[test]
    fn test_tuning_length_mismatch_fails() {
        let ws = sample_workspace();
        let mut document = to_document(&ws).unwrap();
        document.grids[0].config.tuning.pop();
        let err = from_document(document).unwrap_err();
        assert!(err.to_string().contains("tuning"));
    }

    #[test]
    fn test_note_key_coordinate_mismatch_fails() {
        let ws = sample_workspace();
        let mut document = to_document(&ws).unwrap();
        let (key, mut note) = document.grids[0].notes.pop_first().unwrap();
        note.fret += 1;
        document.grids[0].notes.insert(key, note);
        let err = from_document(document).unwrap_err();
        assert!(err.to_string().contains("does not match its coordinate"));
    }

    #[test]
    fn test_dangling_root_fails() {
        let ws = sample_workspace();
        let mut document = to_document(&ws).unwrap();
        document.root_note.as_mut().unwrap().note_id = "nope:0:0".to_string();
        let err = from_document(document).unwrap_err();
        assert!(err.to_string().contains("rootNote"));
    }

    #[test]
    fn test_version_mismatch_warns_but_loads() {
        let ws = sample_workspace();
        let mut document = to_document(&ws).unwrap();
        document.version = "0.9".to_string();
        let outcome = from_document(document).unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("0.9"));
        assert_eq!(outcome.workspace.note_count(), 2);
    }

    #[test]
    fn test_out_of_range_string_count_fails() {
        let ws = sample_workspace();
        let mut document = to_document(&ws).unwrap();
        document.grids[0].config.string_count = 3;
        let err = from_document(document).unwrap_err();
        assert!(err.to_string().contains("stringCount"));
    }

    #[test]
    fn test_load_clamps_grid_position_to_canvas() {
        let ws = sample_workspace();
        let mut document = to_document(&ws).unwrap();
        document.grids[0].position = Point::new(50000.0, -9000.0);

        let loaded = from_document(document).unwrap().workspace;
        let grid = &loaded.grids()[0];
        let (w, h) = grid.bounding_size();
        let d = loaded.canvas().dimensions;
        assert!(grid.position.x >= 0.0 && grid.position.x + w <= d.width);
        assert!(grid.position.y >= 0.0 && grid.position.y + h <= d.height);
    }

    #[test]
    fn test_non_finite_grid_position_fails() {
        let ws = sample_workspace();
        let mut document = to_document(&ws).unwrap();
        document.grids[0].position = Point::new(f64::NAN, 0.0);
        let err = from_document(document).unwrap_err();
        assert!(err.to_string().contains("position"));
    }

    #[test]
    fn test_load_reresolves_pitch_from_tuning() {
        let ws = sample_workspace();
        let mut document = to_document(&ws).unwrap();
        // Tamper with the stored pitch name; the loader must ignore it.
        let (key, mut note) = document.grids[0].notes.pop_first().unwrap();
        note.name = "Z".to_string();
        document.grids[0].notes.insert(key.clone(), note);

        let loaded = from_document(document).unwrap().workspace;
        let id = key.parse::<NoteId>().unwrap();
        assert_eq!(loaded.resolve_note(&id).unwrap().pitch.name, "E");
    }

    #[test]
    fn test_document_shape_on_disk() {
        let ws = sample_workspace();
        let json = save_json(&ws).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], "1.0");
        assert!(value["timestamp"].is_number());
        assert_eq!(value["canvas"]["orientation"], "portrait");
        assert_eq!(value["canvas"]["locked"], false);
        let grid = &value["grids"][0];
        assert_eq!(grid["config"]["startFret"], 0);
        assert_eq!(grid["config"]["endFret"], 7);
        assert_eq!(grid["config"]["stringCount"], 6);
        assert!(grid["config"]["tuning"].is_array());
        assert_eq!(grid["config"]["tuning"][0]["note"], "E");
        assert!(value["rootNote"]["noteId"].is_string());
        assert!(value["settings"]["version"].is_string());

        let intervals = value["intervals"].as_object().unwrap();
        assert_eq!(intervals.len(), 1);
        let entry = intervals.values().next().unwrap();
        assert_eq!(entry["type"], "perfect-fifth");
        assert_eq!(entry["distance"], 7);
    }
}
