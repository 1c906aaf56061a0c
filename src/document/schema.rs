//! The versioned JSON document schema.
//!
//! These types mirror the on-disk shape exactly (camelCase keys, string
//! note-id map keys) and are kept separate from the in-memory model:
//! documents are validated and converted at the boundary, never used as
//! live state. Unknown fields are ignored for forward tolerance.

use crate::theory::{IntervalKind, StringTuning};
use crate::workspace::{CanvasOrientation, Dimensions, GridOrientation, GroupState, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version written by this build.
pub const SCHEMA_VERSION: &str = "1.0";

/// Top-level document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub version: String,
    pub timestamp: u64,
    pub canvas: CanvasDoc,
    pub grids: Vec<GridDoc>,
    pub root_note: Option<RootNoteDoc>,
    pub intervals: BTreeMap<String, IntervalDoc>,
    pub settings: SettingsDoc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasDoc {
    pub orientation: CanvasOrientation,
    pub locked: bool,
    pub dimensions: Dimensions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDoc {
    pub id: String,
    pub position: Point,
    pub config: GridConfigDoc,
    pub notes: BTreeMap<String, NoteDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfigDoc {
    pub start_fret: u8,
    pub end_fret: u8,
    pub string_count: u8,
    pub tuning: Vec<StringTuning>,
    pub orientation: GridOrientation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDoc {
    pub name: String,
    pub semitone: u8,
    pub is_natural: bool,
    pub string_index: u8,
    pub fret: u8,
    pub group_state: GroupState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootNoteDoc {
    pub grid_id: String,
    pub note_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalDoc {
    #[serde(rename = "type")]
    pub kind: IntervalKind,
    pub distance: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsDoc {
    pub version: String,
    pub timestamp: u64,
}
