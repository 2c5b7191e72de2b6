//! Similarity kernels for interval, rhythm, and contour comparison
//!
//! All kernels return 0.0 on empty input and never fail.

use crate::analysis::Contour;
use crate::config::SimilarityConfig;
use crate::score::Note;

/// Compare two numeric sequences position-wise over the shorter length.
///
/// Positions within `tolerance` count as matches; the raw match ratio is
/// scaled by a length penalty so truncated sequences score lower.
pub fn compare_arrays(a: &[f32], b: &[f32], tolerance: f32) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let min_len = a.len().min(b.len());
    let max_len = a.len().max(b.len());

    let mut matches = 0usize;
    for i in 0..min_len {
        if (a[i] - b[i]).abs() <= tolerance {
            matches += 1;
        }
    }

    let length_penalty = 1.0 - (max_len - min_len) as f32 / max_len as f32;
    (matches as f32 / min_len as f32) * length_penalty
}

/// Interval-pattern similarity
pub fn interval_similarity(a: &[f32], b: &[f32], config: &SimilarityConfig) -> f32 {
    compare_arrays(a, b, config.match_tolerance)
}

/// Rhythm-pattern similarity over durations
pub fn rhythm_similarity(a: &[f32], b: &[f32], config: &SimilarityConfig) -> f32 {
    compare_arrays(a, b, config.match_tolerance)
}

/// Weighted melodic similarity (interval-dominant)
pub fn melodic_similarity(
    intervals_a: &[f32],
    intervals_b: &[f32],
    rhythm_a: &[f32],
    rhythm_b: &[f32],
    config: &SimilarityConfig,
) -> f32 {
    config.interval_weight * interval_similarity(intervals_a, intervals_b, config)
        + config.rhythm_weight * rhythm_similarity(rhythm_a, rhythm_b, config)
}

/// Mean-pitch transposition in semitones between two note groups, rounded.
/// Returns 0 when either group carries no pitched notes.
pub fn detect_transposition(n1: &[Note], n2: &[Note]) -> i32 {
    let mean1 = mean_midi(n1);
    let mean2 = mean_midi(n2);
    match (mean1, mean2) {
        (Some(m1), Some(m2)) => (m2 - m1).round() as i32,
        _ => 0,
    }
}

fn mean_midi(notes: &[Note]) -> Option<f32> {
    let midis: Vec<f32> = notes.iter().filter_map(|n| n.midi()).map(|m| m as f32).collect();
    if midis.is_empty() {
        return None;
    }
    Some(midis.iter().sum::<f32>() / midis.len() as f32)
}

/// Mirror test: equal length and intervals cancelling in enough positions
pub fn is_inversion(i1: &[f32], i2: &[f32], config: &SimilarityConfig) -> bool {
    if i1.is_empty() || i1.len() != i2.len() {
        return false;
    }

    let mirrored = i1
        .iter()
        .zip(i2.iter())
        .filter(|(a, b)| (*a + *b).abs() <= 1.0)
        .count();

    mirrored as f32 / i1.len() as f32 >= config.inversion_match_ratio
}

/// Overall melodic direction from first to last pitched note
pub fn classify_contour(notes: &[Note]) -> Contour {
    let midis: Vec<i32> = notes.iter().filter_map(|n| n.midi()).collect();
    if midis.len() < 2 {
        return Contour::Static;
    }
    let net = midis[midis.len() - 1] - midis[0];
    if net > 0 {
        Contour::Ascending
    } else if net < 0 {
        Contour::Descending
    } else {
        Contour::Static
    }
}

/// Signed semitone steps between consecutive pitched notes
pub fn interval_pattern(notes: &[Note]) -> Vec<f32> {
    let midis: Vec<i32> = notes.iter().filter_map(|n| n.midi()).collect();
    midis
        .windows(2)
        .map(|w| (w[1] - w[0]) as f32)
        .collect()
}

/// Duration sequence of a note group
pub fn rhythm_pattern(notes: &[Note]) -> Vec<f32> {
    notes.iter().map(|n| n.duration).collect()
}

/// Melodic similarity of two note groups, derived from their patterns
pub fn note_similarity(a: &[Note], b: &[Note], config: &SimilarityConfig) -> f32 {
    melodic_similarity(
        &interval_pattern(a),
        &interval_pattern(b),
        &rhythm_pattern(a),
        &rhythm_pattern(b),
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{Accidental, Note, PitchName, Step};

    fn note(step: Step, octave: i32, duration: f32) -> Note {
        Note {
            pitch: Some(PitchName::new(step, Accidental::Natural, octave)),
            duration,
            measure: 1,
            beat: 0.0,
            voice: 1,
            dynamics: None,
        }
    }

    #[test]
    fn test_compare_arrays_identical() {
        let a = [2.0, 2.0, -1.0];
        assert!((compare_arrays(&a, &a, 1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_compare_arrays_length_penalty() {
        let a = [2.0, 2.0, -1.0, 1.0];
        let b = [2.0, 2.0];
        // 2/2 matches scaled by 1 - 2/4
        assert!((compare_arrays(&a, &b, 1.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_compare_arrays_empty() {
        assert_eq!(compare_arrays(&[], &[1.0], 1.0), 0.0);
    }

    #[test]
    fn test_detect_transposition() {
        let a = vec![note(Step::C, 4, 1.0), note(Step::E, 4, 1.0)];
        let b = vec![note(Step::D, 4, 1.0), note(Step::F, 4, 1.0)];
        // C4/E4 mean 62, D4/F4 mean 63.5 -> rounds to 2
        assert_eq!(detect_transposition(&a, &b), 2);
    }

    #[test]
    fn test_is_inversion() {
        let config = SimilarityConfig::default();
        let up = [2.0, 2.0, 1.0];
        let down = [-2.0, -2.0, -1.0];
        assert!(is_inversion(&up, &down, &config));
        assert!(!is_inversion(&up, &up[..2].to_vec(), &config));
    }

    #[test]
    fn test_contour() {
        let rising = vec![note(Step::C, 4, 1.0), note(Step::G, 4, 1.0)];
        assert_eq!(classify_contour(&rising), Contour::Ascending);
        let flat = vec![note(Step::C, 4, 1.0), note(Step::C, 4, 1.0)];
        assert_eq!(classify_contour(&flat), Contour::Static);
    }
}
