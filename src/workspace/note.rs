//! Note identity and value types.
//!
//! A note's identity is its coordinate: the owning grid plus a string index
//! and fret. The id is derived deterministically from those three parts, so
//! a coordinate can hold at most one note by construction.

use crate::theory::PitchClass;
use crate::workspace::grid::GridId;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Coordinate-derived identifier for a note.
///
/// Serialized as the string `"<grid>:<string>:<fret>"`, which is also the
/// key used in document note and interval maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId {
    grid: GridId,
    string_index: u8,
    fret: u8,
}

impl NoteId {
    /// Derives the id for the note at `(string_index, fret)` in `grid`.
    pub fn at(grid: &GridId, string_index: u8, fret: u8) -> Self {
        Self {
            grid: grid.clone(),
            string_index,
            fret,
        }
    }

    /// The grid this note belongs to.
    pub fn grid(&self) -> &GridId {
        &self.grid
    }

    /// Zero-based string index, low string first.
    pub fn string_index(&self) -> u8 {
        self.string_index
    }

    /// Fret number.
    pub fn fret(&self) -> u8 {
        self.fret
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.grid, self.string_index, self.fret)
    }
}

impl FromStr for NoteId {
    type Err = String;

    /// Parses the canonical `"<grid>:<string>:<fret>"` form. Grid ids never
    /// contain `:`, so splitting from the right is unambiguous.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, ':');
        let fret = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(|| format!("invalid note id {:?}: bad fret", s))?;
        let string_index = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(|| format!("invalid note id {:?}: bad string index", s))?;
        let grid = parts
            .next()
            .filter(|g| !g.is_empty())
            .ok_or_else(|| format!("invalid note id {:?}: missing grid id", s))?;
        Ok(Self {
            grid: GridId::from_raw(grid),
            string_index,
            fret,
        })
    }
}

impl Serialize for NoteId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// User-assigned visual tag on a note, independent of pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupState {
    /// Untagged; the state a freshly placed note starts in.
    #[default]
    Chromatic,
    Group1,
    Group2,
    Group3,
    Group4,
}

impl GroupState {
    /// The next state in the cycle, or `None` when advancing past the last
    /// group (which removes the note instead of wrapping).
    pub fn next(self) -> Option<Self> {
        match self {
            GroupState::Chromatic => Some(GroupState::Group1),
            GroupState::Group1 => Some(GroupState::Group2),
            GroupState::Group2 => Some(GroupState::Group3),
            GroupState::Group3 => Some(GroupState::Group4),
            GroupState::Group4 => None,
        }
    }
}

/// A single placed note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    /// Sounded pitch class, resolved from the string's tuning plus the fret.
    pub pitch: PitchClass,

    /// Zero-based string index, low string first.
    pub string_index: u8,

    /// Fret number within the grid's range.
    pub fret: u8,

    /// Current visual group tag.
    pub group: GroupState,
}

impl Note {
    /// Creates a chromatic (untagged) note at the given coordinate.
    pub fn new(pitch: PitchClass, string_index: u8, fret: u8) -> Self {
        Self {
            pitch,
            string_index,
            fret,
            group: GroupState::Chromatic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_id_round_trip() {
        let grid = GridId::new();
        let id = NoteId::at(&grid, 2, 5);
        let text = id.to_string();
        let parsed: NoteId = text.parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.grid(), &grid);
        assert_eq!(parsed.string_index(), 2);
        assert_eq!(parsed.fret(), 5);
    }

    #[test]
    fn test_note_id_rejects_garbage() {
        assert!("".parse::<NoteId>().is_err());
        assert!("abc".parse::<NoteId>().is_err());
        assert!("grid:x:5".parse::<NoteId>().is_err());
        assert!(":2:5".parse::<NoteId>().is_err());
    }

    #[test]
    fn test_note_id_deterministic() {
        let grid = GridId::new();
        assert_eq!(NoteId::at(&grid, 1, 3), NoteId::at(&grid, 1, 3));
        assert_ne!(NoteId::at(&grid, 1, 3), NoteId::at(&grid, 1, 4));
    }

    #[test]
    fn test_group_cycle() {
        let mut state = GroupState::Chromatic;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            state = next;
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                GroupState::Chromatic,
                GroupState::Group1,
                GroupState::Group2,
                GroupState::Group3,
                GroupState::Group4,
            ]
        );
        assert_eq!(GroupState::Group4.next(), None);
    }
}
