//! DTW alignment tests

use ndarray::Array2;
use score2form::alignment::{align, symbolic_chroma, AlignmentResult};
use score2form::config::AlignmentConfig;
use score2form::score::{
    Accidental, KeySignature, Measure, Note, ParsedScore, PitchName, Step,
};

fn note(step: Step, octave: i32, measure: u32, beat: f32, duration: f32) -> Note {
    Note {
        pitch: Some(PitchName::new(step, Accidental::Natural, octave)),
        duration,
        measure,
        beat,
        voice: 1,
        dynamics: None,
    }
}

fn test_score(measure_count: u32) -> ParsedScore {
    let steps = [Step::C, Step::E, Step::G, Step::B];
    let mut notes = Vec::new();
    for m in 1..=measure_count {
        let step = steps[(m as usize - 1) % steps.len()];
        notes.push(note(step, 4, m, 0.0, 4.0));
    }
    ParsedScore {
        measures: (1..=measure_count).map(|number| Measure { number }).collect(),
        notes,
        key_signature: KeySignature::default(),
        ..ParsedScore::default()
    }
}

/// Frame timestamps at a fixed hop
fn times(n: usize, hop: f32) -> Vec<f32> {
    (0..n).map(|i| i as f32 * hop).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbolic_chroma_shape_and_norm() {
        let config = AlignmentConfig::default();
        let score = test_score(4);
        let chroma = symbolic_chroma(&score, config.frames_per_measure);

        assert_eq!(chroma.nrows(), 4 * config.frames_per_measure);
        assert_eq!(chroma.ncols(), 12);

        // Occupied frames are L1-normalised
        for row in chroma.rows() {
            let sum: f32 = row.iter().sum();
            assert!(sum.abs() < 1e-6 || (sum - 1.0).abs() < 1e-4);
        }

        // The first measure holds only pitch class C
        assert!((chroma[(0, 0)] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_identical_streams_align_on_diagonal() {
        let config = AlignmentConfig::default();
        let score = test_score(4);
        let chroma = symbolic_chroma(&score, config.frames_per_measure);
        let n = chroma.nrows();

        let result = align(&chroma, &chroma, &times(n, 0.2), &config);

        assert!((result.confidence - 1.0).abs() < 1e-6);
        assert!(result.distance.abs() < 1e-6);
        assert_eq!(result.path.len(), n);
        for (i, &(sym, ac)) in result.path.iter().enumerate() {
            assert_eq!(sym, i);
            assert_eq!(ac, i);
        }
    }

    #[test]
    fn test_measure_map_covers_known_measures() {
        let config = AlignmentConfig::default();
        let score = test_score(4);
        let chroma = symbolic_chroma(&score, config.frames_per_measure);
        let n = chroma.nrows();

        let result = align(&chroma, &chroma, &times(n, 0.2), &config);

        // On the diagonal every measure maps to its first frame's time
        for measure in 1..=4u32 {
            let expected = (measure - 1) as f32 * config.frames_per_measure as f32 * 0.2;
            assert!((result.measure_to_time(measure) - expected).abs() < 1e-4);
        }

        // Reverse lookup recovers the measure
        assert_eq!(result.time_to_measure(0.0), 1);
        assert_eq!(result.time_to_measure(2.0), 2);
    }

    #[test]
    fn test_interpolation_between_known_measures() {
        let config = AlignmentConfig::default();
        let mut result = AlignmentResult::degenerate(&config);
        result.measure_to_time.insert(1, 0.0);
        result.measure_to_time.insert(5, 8.0);

        assert!((result.measure_to_time(3) - 4.0).abs() < 1e-5);
        assert!((result.measure_to_time(2) - 2.0).abs() < 1e-5);
        // Beyond the known range the nearest endpoint applies
        assert!((result.measure_to_time(9) - 8.0).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_inputs() {
        let config = AlignmentConfig::default();
        let empty = Array2::<f32>::zeros((0, 12));
        let other = Array2::<f32>::zeros((5, 12));

        let result = align(&empty, &other, &times(5, 0.2), &config);
        assert!(result.path.is_empty());
        assert!(result.distance.is_infinite());
        // Zero-time convention for lookups on an empty alignment
        assert_eq!(result.measure_to_time(3), 0.0);
        assert_eq!(result.time_to_measure(1.0), 0);
    }

    #[test]
    fn test_manual_adjustment_penalty_and_floor() {
        let config = AlignmentConfig::default();
        let score = test_score(4);
        let chroma = symbolic_chroma(&score, config.frames_per_measure);
        let n = chroma.nrows();
        let mut result = align(&chroma, &chroma, &times(n, 0.2), &config);
        assert!((result.confidence - 1.0).abs() < 1e-6);

        result.adjust(2, 1.75);
        assert!((result.confidence - 0.95).abs() < 1e-6);
        assert!((result.measure_to_time(2) - 1.75).abs() < 1e-6);
        assert_eq!(result.time_to_measure(1.75), 2);

        // Repeated adjustments never push confidence below the floor
        for _ in 0..20 {
            result.adjust(3, 3.0);
        }
        assert!((result.confidence - config.confidence_floor).abs() < 1e-6);
    }

    #[test]
    fn test_adjustment_floor_is_absolute() {
        let config = AlignmentConfig::default();
        // A degenerate alignment starts below the floor
        let mut result = AlignmentResult::degenerate(&config);
        assert_eq!(result.confidence, 0.0);

        result.adjust(1, 0.5);
        assert!((result.confidence - config.confidence_floor).abs() < 1e-6);
    }

    #[test]
    fn test_tempo_shift_still_aligns_monotonically() {
        let config = AlignmentConfig::default();
        let score = test_score(4);
        let chroma = symbolic_chroma(&score, config.frames_per_measure);

        // Acoustic stream at half tempo: every symbolic frame appears twice
        let n = chroma.nrows();
        let mut slow = Array2::<f32>::zeros((n * 2, 12));
        for i in 0..n {
            for j in 0..12 {
                slow[(2 * i, j)] = chroma[(i, j)];
                slow[(2 * i + 1, j)] = chroma[(i, j)];
            }
        }

        let result = align(&chroma, &slow, &times(n * 2, 0.2), &config);
        assert!(result.distance.abs() < 1e-4);

        // Path is monotone in both coordinates
        for pair in result.path.windows(2) {
            assert!(pair[1].0 >= pair[0].0);
            assert!(pair[1].1 >= pair[0].1);
        }

        // Later measures land later in audio time
        let mut previous = -1.0f32;
        for measure in 1..=4u32 {
            let t = result.measure_to_time(measure);
            assert!(t > previous);
            previous = t;
        }
    }
}
