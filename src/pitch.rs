//! Pitch-class encoding, tonic resolution, and scale-degree arithmetic

use crate::score::{Accidental, KeyMode, PitchName, Step};

/// Major-key tonic pitch classes for sharp keys, indexed by fifths 0..=7
/// (C, G, D, A, E, B, F#, C#)
const SHARP_TONICS: [i32; 8] = [0, 7, 2, 9, 4, 11, 6, 1];

/// Major-key tonic pitch classes for flat keys, indexed by -fifths 0..=7
/// (C, F, Bb, Eb, Ab, Db, Gb, Cb)
const FLAT_TONICS: [i32; 8] = [0, 5, 10, 3, 8, 1, 6, 11];

/// Resolve the tonic pitch class from a key signature.
///
/// Minor keys share the signature of their relative major; the minor tonic
/// sits a minor third below it (9 semitones up mod 12).
pub fn tonic_from_key(fifths: i32, mode: KeyMode) -> i32 {
    let clamped = fifths.clamp(-7, 7);
    let major_tonic = if clamped >= 0 {
        SHARP_TONICS[clamped as usize]
    } else {
        FLAT_TONICS[(-clamped) as usize]
    };
    match mode {
        KeyMode::Major => major_tonic,
        KeyMode::Minor => (major_tonic + 9) % 12,
    }
}

/// Diatonic scale degree (0 = tonic .. 6 = leading tone) of a pitch relative
/// to a tonic, or -1 when the pitch is chromatic.
pub fn scale_degree(pitch: &PitchName, tonic: i32, _mode: KeyMode) -> i32 {
    let interval = (pitch.pitch_class() - tonic).rem_euclid(12);
    match interval {
        0 => 0,
        2 => 1,
        4 => 2,
        5 => 3,
        7 => 4,
        9 => 5,
        11 => 6,
        _ => -1,
    }
}

/// MIDI note number for a spelled pitch
pub fn pitch_to_midi(pitch: &PitchName) -> i32 {
    pitch.pitch_class() + (pitch.octave + 1) * 12
}

/// Parse a short spelling like "C#4" or "Bb3"; unparseable input maps to
/// middle C (60), matching the decoder's convention.
pub fn midi_from_spelling(spelling: &str) -> i32 {
    parse_spelling(spelling).map(|p| p.midi()).unwrap_or(60)
}

fn parse_spelling(spelling: &str) -> Option<PitchName> {
    let mut chars = spelling.chars();
    let step = match chars.next()? {
        'C' => Step::C,
        'D' => Step::D,
        'E' => Step::E,
        'F' => Step::F,
        'G' => Step::G,
        'A' => Step::A,
        'B' => Step::B,
        _ => return None,
    };
    let rest: String = chars.collect();
    let (accidental, octave_str) = if let Some(tail) = rest.strip_prefix("##") {
        (Accidental::DoubleSharp, tail)
    } else if let Some(tail) = rest.strip_prefix("bb") {
        (Accidental::DoubleFlat, tail)
    } else if let Some(tail) = rest.strip_prefix('#') {
        (Accidental::Sharp, tail)
    } else if let Some(tail) = rest.strip_prefix('b') {
        (Accidental::Flat, tail)
    } else {
        (Accidental::Natural, rest.as_str())
    };
    let octave: i32 = octave_str.parse().ok()?;
    Some(PitchName::new(step, accidental, octave))
}

/// Short spelling of a pitch class (sharp-preferring), used for tonic names
pub fn pitch_class_name(pc: i32) -> &'static str {
    match pc.rem_euclid(12) {
        0 => "C",
        1 => "C#",
        2 => "D",
        3 => "Eb",
        4 => "E",
        5 => "F",
        6 => "F#",
        7 => "G",
        8 => "Ab",
        9 => "A",
        10 => "Bb",
        11 => "B",
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tonic_from_key_major() {
        assert_eq!(tonic_from_key(0, KeyMode::Major), 0); // C
        assert_eq!(tonic_from_key(1, KeyMode::Major), 7); // G
        assert_eq!(tonic_from_key(-1, KeyMode::Major), 5); // F
        assert_eq!(tonic_from_key(3, KeyMode::Major), 9); // A
        assert_eq!(tonic_from_key(-3, KeyMode::Major), 3); // Eb
    }

    #[test]
    fn test_tonic_from_key_minor() {
        assert_eq!(tonic_from_key(0, KeyMode::Minor), 9); // A minor
        assert_eq!(tonic_from_key(1, KeyMode::Minor), 4); // E minor
        assert_eq!(tonic_from_key(-3, KeyMode::Minor), 0); // C minor
    }

    #[test]
    fn test_scale_degree() {
        let g = PitchName::new(Step::G, Accidental::Natural, 4);
        assert_eq!(scale_degree(&g, 0, KeyMode::Major), 4); // V in C
        let fs = PitchName::new(Step::F, Accidental::Sharp, 4);
        assert_eq!(scale_degree(&fs, 0, KeyMode::Major), -1); // chromatic in C
    }

    #[test]
    fn test_pitch_to_midi() {
        let c4 = PitchName::new(Step::C, Accidental::Natural, 4);
        assert_eq!(pitch_to_midi(&c4), 60);
        let a4 = PitchName::new(Step::A, Accidental::Natural, 4);
        assert_eq!(pitch_to_midi(&a4), 69);
    }

    #[test]
    fn test_midi_from_spelling_fallback() {
        assert_eq!(midi_from_spelling("C4"), 60);
        assert_eq!(midi_from_spelling("Bb3"), 58);
        assert_eq!(midi_from_spelling("garbage"), 60);
    }
}
