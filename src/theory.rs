//! Pure music-theory computation.
//!
//! Everything here is stateless: pitch-class resolution from a string tuning
//! plus a fret offset, interval classification between two pitch classes,
//! standard-tuning generation, and fret-marker layout.

use serde::{Deserialize, Serialize};

/// The twelve chromatic pitch classes, C through B.
///
/// Natural notes (plain letters) carry `is_natural = true` and render their
/// letter; accidentals render no label but keep their full identity.
pub const CHROMATIC: [PitchClass; 12] = [
    PitchClass::new("C", 0, true),
    PitchClass::new("C#", 1, false),
    PitchClass::new("D", 2, true),
    PitchClass::new("D#", 3, false),
    PitchClass::new("E", 4, true),
    PitchClass::new("F", 5, true),
    PitchClass::new("F#", 6, false),
    PitchClass::new("G", 7, true),
    PitchClass::new("G#", 8, false),
    PitchClass::new("A", 9, true),
    PitchClass::new("A#", 10, false),
    PitchClass::new("B", 11, true),
];

/// One of the twelve chromatic identities, independent of octave.
///
/// Not deserializable: pitch classes are always re-resolved from the
/// chromatic table, never read back from a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PitchClass {
    /// Display name ("C", "F#", ...).
    pub name: &'static str,

    /// Semitones above C, in `0..=11`.
    pub semitone: u8,

    /// Whether this is a natural (unaccidented) note.
    pub is_natural: bool,
}

impl PitchClass {
    const fn new(name: &'static str, semitone: u8, is_natural: bool) -> Self {
        Self {
            name,
            semitone,
            is_natural,
        }
    }

    /// Resolves a semitone value (any u8) to its chromatic pitch class.
    pub fn from_semitone(semitone: u8) -> Self {
        CHROMATIC[(semitone % 12) as usize]
    }
}

/// A string's open (unfretted) pitch class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringTuning {
    /// Display name of the open note.
    pub note: String,

    /// Semitones above C, in `0..=11`.
    pub semitone: u8,
}

impl StringTuning {
    /// Creates a tuning entry from a semitone value, naming it from the
    /// chromatic table.
    pub fn from_semitone(semitone: u8) -> Self {
        let pc = PitchClass::from_semitone(semitone);
        Self {
            note: pc.name.to_string(),
            semitone: pc.semitone,
        }
    }
}

/// Six-string reference tuning, low to high: E A D G B E.
const BASE_TUNING_SEMITONES: [u8; 6] = [4, 9, 2, 7, 11, 4];

/// Lower strings prepended for extended-range instruments, in the order
/// they are added going downward: B, F#, C#, G#, D#, A#.
const EXTENSION_SEMITONES: [u8; 6] = [11, 6, 1, 8, 3, 10];

/// Returns the pitch class sounded by fretting `tuning` at `fret`.
///
/// Periodic with period 12: fret 12 sounds the same class as the open string.
pub fn pitch_at(tuning: &StringTuning, fret: u8) -> PitchClass {
    PitchClass::from_semitone(((tuning.semitone as u32 + fret as u32) % 12) as u8)
}

/// Generates the standard tuning for an instrument with `string_count`
/// strings, low to high.
///
/// For six or fewer strings, the highest `string_count` strings of the
/// six-string reference tuning are kept (dropping from the low end). For
/// more than six, additional lower strings come from a fixed extension
/// sequence. Callers are responsible for keeping `string_count` in `4..=12`;
/// values outside that range are truncated to it here rather than rejected.
pub fn standard_tuning(string_count: u8) -> Vec<StringTuning> {
    let count = string_count.clamp(4, 12) as usize;
    let mut semitones: Vec<u8> = Vec::with_capacity(count);

    if count <= 6 {
        semitones.extend_from_slice(&BASE_TUNING_SEMITONES[6 - count..]);
    } else {
        // Extension strings are added low-ward one at a time, so the last
        // one added is the lowest string of the instrument.
        for &s in EXTENSION_SEMITONES[..count - 6].iter().rev() {
            semitones.push(s);
        }
        semitones.extend_from_slice(&BASE_TUNING_SEMITONES);
    }

    semitones
        .into_iter()
        .map(StringTuning::from_semitone)
        .collect()
}

/// Interval quality relative to the root note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntervalKind {
    MinorThird,
    MajorThird,
    PerfectFourth,
    PerfectFifth,
    MinorSeventh,
    MajorSeventh,
    /// Same pitch class as the root on a different note. Never produced by
    /// [`interval`] itself (distance is normalized into `0..=11`); assigned
    /// only during workspace-level recomputation.
    Octave,
}

impl IntervalKind {
    /// Short display label ("m3", "P5", ...).
    pub fn label(self) -> &'static str {
        match self {
            IntervalKind::MinorThird => "m3",
            IntervalKind::MajorThird => "M3",
            IntervalKind::PerfectFourth => "P4",
            IntervalKind::PerfectFifth => "P5",
            IntervalKind::MinorSeventh => "m7",
            IntervalKind::MajorSeventh => "M7",
            IntervalKind::Octave => "P8",
        }
    }
}

/// Classifies the interval from `root` up to `target`.
///
/// Distance is `(target - root) mod 12`. Only the six highlighted qualities
/// map to an interval; every other distance (0, 1, 2, 6, 8, 9) yields `None`
/// and must not be highlighted.
pub fn interval(root: PitchClass, target: PitchClass) -> Option<(IntervalKind, u8)> {
    let distance = (12 + target.semitone as i16 - root.semitone as i16) as u8 % 12;
    let kind = match distance {
        3 => IntervalKind::MinorThird,
        4 => IntervalKind::MajorThird,
        5 => IntervalKind::PerfectFourth,
        7 => IntervalKind::PerfectFifth,
        10 => IntervalKind::MinorSeventh,
        11 => IntervalKind::MajorSeventh,
        _ => return None,
    };
    Some((kind, distance))
}

/// A position marker drawn on the fretboard between strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FretMarker {
    /// Fret the marker sits on.
    pub fret: u8,

    /// Double-dot marker (the octave fret).
    pub double: bool,
}

/// Frets that carry a single-dot position marker.
const SINGLE_MARKER_FRETS: [u8; 8] = [3, 5, 7, 9, 15, 17, 19, 21];

/// Returns the position markers visible in the fret range `start..=end`.
///
/// Single dots at 3, 5, 7, 9, 15, 17, 19, 21; a double dot at 12.
pub fn fret_markers(start: u8, end: u8) -> Vec<FretMarker> {
    let mut markers: Vec<FretMarker> = SINGLE_MARKER_FRETS
        .iter()
        .copied()
        .filter(|f| (start..=end).contains(f))
        .map(|fret| FretMarker { fret, double: false })
        .collect();

    if (start..=end).contains(&12) {
        markers.push(FretMarker {
            fret: 12,
            double: true,
        });
        markers.sort_by_key(|m| m.fret);
    }

    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_at_basic() {
        let e = StringTuning::from_semitone(4);
        assert_eq!(pitch_at(&e, 0).name, "E");
        assert_eq!(pitch_at(&e, 1).name, "F");
        assert_eq!(pitch_at(&e, 8).name, "C");
    }

    #[test]
    fn test_pitch_at_periodic() {
        for semitone in 0..12u8 {
            let tuning = StringTuning::from_semitone(semitone);
            for fret in 0..=12u8 {
                assert_eq!(
                    pitch_at(&tuning, fret),
                    pitch_at(&tuning, fret + 12),
                    "period-12 violated at semitone {} fret {}",
                    semitone,
                    fret
                );
            }
        }
    }

    #[test]
    fn test_standard_tuning_six() {
        let semitones: Vec<u8> = standard_tuning(6).iter().map(|t| t.semitone).collect();
        assert_eq!(semitones, vec![4, 9, 2, 7, 11, 4]);
    }

    #[test]
    fn test_standard_tuning_four_drops_low_strings() {
        let semitones: Vec<u8> = standard_tuning(4).iter().map(|t| t.semitone).collect();
        assert_eq!(semitones, vec![2, 7, 11, 4]); // D G B E
    }

    #[test]
    fn test_standard_tuning_extended() {
        let seven = standard_tuning(7);
        assert_eq!(seven[0].semitone, 11); // low B
        assert_eq!(seven[0].note, "B");
        assert_eq!(seven.len(), 7);

        let eight = standard_tuning(8);
        assert_eq!(eight[0].semitone, 6); // low F#
        assert_eq!(eight[1].semitone, 11);
        assert_eq!(eight.len(), 8);
    }

    #[test]
    fn test_interval_table() {
        let c = PitchClass::from_semitone(0);
        assert_eq!(
            interval(c, PitchClass::from_semitone(7)),
            Some((IntervalKind::PerfectFifth, 7))
        );
        assert_eq!(
            interval(c, PitchClass::from_semitone(3)),
            Some((IntervalKind::MinorThird, 3))
        );
        assert_eq!(
            interval(c, PitchClass::from_semitone(11)),
            Some((IntervalKind::MajorSeventh, 11))
        );
    }

    #[test]
    fn test_interval_unmatched_distances() {
        let c = PitchClass::from_semitone(0);
        for distance in [0u8, 1, 2, 6, 8, 9] {
            assert_eq!(interval(c, PitchClass::from_semitone(distance)), None);
        }
    }

    #[test]
    fn test_interval_wraps_downward() {
        // G up to D is a perfect fifth even though D's semitone is smaller.
        let g = PitchClass::from_semitone(7);
        let d = PitchClass::from_semitone(2);
        assert_eq!(interval(g, d), Some((IntervalKind::PerfectFifth, 7)));
    }

    #[test]
    fn test_fret_markers_full_range() {
        let markers = fret_markers(0, 24);
        let frets: Vec<u8> = markers.iter().map(|m| m.fret).collect();
        assert_eq!(frets, vec![3, 5, 7, 9, 12, 15, 17, 19, 21]);
        assert!(markers.iter().find(|m| m.fret == 12).unwrap().double);
        assert!(markers.iter().filter(|m| m.fret != 12).all(|m| !m.double));
    }

    #[test]
    fn test_fret_markers_clipped() {
        let frets: Vec<u8> = fret_markers(5, 12).iter().map(|m| m.fret).collect();
        assert_eq!(frets, vec![5, 7, 9, 12]);
        assert!(fret_markers(0, 2).is_empty());
    }
}
