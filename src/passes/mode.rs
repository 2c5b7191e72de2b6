//! Scale/mode detection by weighted pitch-class overlap

use crate::analysis::{ModeEstimate, ScaleKind};
use crate::config::Config;
use crate::error::Result as ScoreResult;
use crate::score::{Note, ScoreState};

/// Estimate the best-fitting scale and store it on the state
pub fn run(state: &mut ScoreState, _config: &Config) -> ScoreResult<()> {
    if state.is_insufficient() {
        state.mode = None;
        return Ok(());
    }
    state.mode = detect_mode(&state.score.notes, state.tonic);
    Ok(())
}

/// Score every candidate scale against the duration-weighted pitch-class
/// histogram, rotated into the tonic frame. The caller reads the score as a
/// confidence; no thresholding happens here.
pub fn detect_mode(notes: &[Note], tonic: i32) -> Option<ModeEstimate> {
    let histogram = weighted_histogram(notes, tonic);
    let total: f32 = histogram.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let mut scored: Vec<(ScaleKind, f32)> = ScaleKind::all()
        .iter()
        .map(|&scale| {
            let in_scale: f32 = scale
                .pitch_classes()
                .iter()
                .map(|&pc| histogram[pc as usize])
                .sum();
            (scale, in_scale / total)
        })
        .collect();

    // Stable sort keeps the fixed evaluation order on ties
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let (scale, confidence) = scored[0];
    let (runner_up, runner_up_confidence) = scored[1];

    Some(ModeEstimate {
        scale,
        confidence,
        runner_up,
        runner_up_confidence,
    })
}

/// Duration-weighted histogram over tonic-relative pitch classes
fn weighted_histogram(notes: &[Note], tonic: i32) -> [f32; 12] {
    let mut histogram = [0.0f32; 12];
    for note in notes {
        if let Some(pitch) = &note.pitch {
            let relative = (pitch.pitch_class() - tonic).rem_euclid(12) as usize;
            histogram[relative] += note.duration.max(0.0);
        }
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{Accidental, PitchName, Step};

    fn note(step: Step, accidental: Accidental, duration: f32) -> Note {
        Note {
            pitch: Some(PitchName::new(step, accidental, 4)),
            duration,
            measure: 1,
            beat: 0.0,
            voice: 1,
            dynamics: None,
        }
    }

    #[test]
    fn test_major_scale_scores_full_overlap() {
        let steps = [Step::C, Step::D, Step::E, Step::F, Step::G, Step::A, Step::B];
        let notes: Vec<Note> = steps
            .iter()
            .map(|&s| note(s, Accidental::Natural, 1.0))
            .collect();

        let estimate = detect_mode(&notes, 0).unwrap();
        // Ionian ties major; the fixed evaluation order keeps major on top
        assert_eq!(estimate.scale, ScaleKind::Major);
        assert!((estimate.confidence - 1.0).abs() < 1e-6);
        assert!((estimate.runner_up_confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_harmonic_minor_beats_natural_minor_with_leading_tone() {
        // A harmonic minor: G# instead of G
        let notes = vec![
            note(Step::A, Accidental::Natural, 1.0),
            note(Step::B, Accidental::Natural, 1.0),
            note(Step::C, Accidental::Natural, 1.0),
            note(Step::D, Accidental::Natural, 1.0),
            note(Step::E, Accidental::Natural, 1.0),
            note(Step::F, Accidental::Natural, 1.0),
            note(Step::G, Accidental::Sharp, 1.0),
        ];

        let estimate = detect_mode(&notes, 9).unwrap();
        assert_eq!(estimate.scale, ScaleKind::HarmonicMinor);
        assert!(estimate.confidence > estimate.runner_up_confidence - 1e-6);
    }

    #[test]
    fn test_empty_input_yields_none() {
        assert!(detect_mode(&[], 0).is_none());
    }
}
