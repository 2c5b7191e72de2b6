//! Cadence detection over adjacent measure pairs

use crate::analysis::{Cadence, CadenceStrength, CadenceType};
use crate::config::Config;
use crate::error::Result as ScoreResult;
use crate::pitch;
use crate::score::{KeyMode, Note, ParsedScore, ScoreState};

/// Detect cadences and store them on the state, sorted by measure
pub fn run(state: &mut ScoreState, config: &Config) -> ScoreResult<()> {
    if state.is_insufficient() {
        state.cadences = Vec::new();
        return Ok(());
    }
    state.cadences = detect_cadences(&state.score, state.tonic, config);
    Ok(())
}

/// Classify every two-measure bass/soprano transition in the score.
///
/// Output is sorted by measure with strictly increasing measure numbers:
/// each measure pair yields at most one cadence at the later measure.
pub fn detect_cadences(score: &ParsedScore, tonic: i32, config: &Config) -> Vec<Cadence> {
    let mut cadences = Vec::new();
    let last = match score.last_measure() {
        Some(m) => m,
        None => return cadences,
    };

    for measure in 1..last {
        let prev_notes = score.notes_in_measure(measure);
        let curr_notes = score.notes_in_measure(measure + 1);

        let prev_bass = match lowest_pitched(&prev_notes) {
            Some(n) => n,
            None => continue,
        };
        let curr_bass = match lowest_pitched(&curr_notes) {
            Some(n) => n,
            None => continue,
        };
        let soprano = match highest_pitched(&curr_notes) {
            Some(n) => n,
            None => continue,
        };

        let mode = score.key_signature.mode;
        let prev = degree(prev_bass, tonic, mode);
        let curr = degree(curr_bass, tonic, mode);
        let melody = degree(soprano, tonic, mode);

        if let Some((cadence_type, strength, confidence)) =
            classify_transition(prev, curr, melody, mode, config)
        {
            cadences.push(Cadence {
                measure: measure + 1,
                beat: curr_bass.beat,
                cadence_type,
                strength,
                confidence,
            });
        }
    }

    cadences
}

/// Classification table, checked top-down; first match wins.
///
/// Degrees are 0-based: I=0, IV=3, V=4, VI=5, VII=6.
fn classify_transition(
    prev: i32,
    curr: i32,
    melody: i32,
    mode: KeyMode,
    config: &Config,
) -> Option<(CadenceType, CadenceStrength, f32)> {
    let c = &config.cadence;

    if prev == 4 && curr == 0 && melody == 0 {
        return Some((
            CadenceType::PerfectAuthentic,
            CadenceStrength::Strong,
            c.pac_confidence,
        ));
    }
    if prev == 4 && curr == 0 {
        return Some((
            CadenceType::ImperfectAuthentic,
            CadenceStrength::Moderate,
            c.iac_confidence,
        ));
    }
    if (prev == 4 || prev == 6) && curr == 0 {
        return Some((
            CadenceType::ImperfectAuthentic,
            CadenceStrength::Moderate,
            c.iac_leading_tone_confidence,
        ));
    }
    if mode == KeyMode::Minor && prev == 3 && curr == 4 {
        return Some((
            CadenceType::Phrygian,
            CadenceStrength::Weak,
            c.phrygian_confidence,
        ));
    }
    if curr == 4 {
        return Some((CadenceType::Half, CadenceStrength::Weak, c.half_confidence));
    }
    if prev == 4 && curr == 5 {
        return Some((
            CadenceType::Deceptive,
            CadenceStrength::Moderate,
            c.deceptive_confidence,
        ));
    }
    if prev == 3 && curr == 0 {
        return Some((
            CadenceType::Plagal,
            CadenceStrength::Moderate,
            c.plagal_confidence,
        ));
    }

    None
}

fn degree(note: &Note, tonic: i32, mode: KeyMode) -> i32 {
    note.pitch
        .as_ref()
        .map(|p| pitch::scale_degree(p, tonic, mode))
        .unwrap_or(-1)
}

fn lowest_pitched<'a>(notes: &[&'a Note]) -> Option<&'a Note> {
    notes
        .iter()
        .filter(|n| !n.is_rest())
        .min_by_key(|n| n.midi().unwrap_or(i32::MAX))
        .copied()
}

fn highest_pitched<'a>(notes: &[&'a Note]) -> Option<&'a Note> {
    notes
        .iter()
        .filter(|n| !n.is_rest())
        .max_by_key(|n| n.midi().unwrap_or(i32::MIN))
        .copied()
}
