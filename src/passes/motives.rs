//! Motive segmentation and development-technique classification

use crate::analysis::{DevelopmentTechnique, Motive};
use crate::config::Config;
use crate::error::Result as ScoreResult;
use crate::score::{Note, ParsedScore, ScoreState};
use crate::similarity;

/// Detect motives over the whole stream and store them on the state
pub fn run(state: &mut ScoreState, config: &Config) -> ScoreResult<()> {
    if state.is_insufficient() {
        state.motives = Vec::new();
        return Ok(());
    }
    state.motives = detect_motives(&state.score, config);
    Ok(())
}

/// Segment notes into 1-2-beat motives and classify each against its
/// predecessor.
///
/// Candidates open at strong beats (0, and 2 in 4-beat meter); only groups
/// carrying at least `min_notes` notes are emitted.
pub fn detect_motives(score: &ParsedScore, config: &Config) -> Vec<Motive> {
    let mut groups: Vec<(u32, f32, Vec<Note>)> = Vec::new();
    let last = score.last_measure().unwrap_or(0);

    for measure in 1..=last {
        let notes = score.notes_in_measure(measure);
        if notes.is_empty() {
            continue;
        }

        if score.time_signature.beats == 4 {
            let first_half: Vec<Note> =
                notes.iter().filter(|n| n.beat < 2.0).map(|n| (*n).clone()).collect();
            let second_half: Vec<Note> =
                notes.iter().filter(|n| n.beat >= 2.0).map(|n| (*n).clone()).collect();
            if !first_half.is_empty() {
                groups.push((measure, 0.0, first_half));
            }
            if !second_half.is_empty() {
                groups.push((measure, 2.0, second_half));
            }
        } else {
            groups.push((measure, 0.0, notes.into_iter().cloned().collect()));
        }
    }

    let mut motives = Vec::new();
    for (measure, start_beat, notes) in groups {
        if notes.len() < config.motive.min_notes {
            continue;
        }

        let interval_pattern = similarity::interval_pattern(&notes);
        let rhythm_pattern = similarity::rhythm_pattern(&notes);
        let contour = similarity::classify_contour(&notes);
        let index = motives.len();

        let mut motive = Motive {
            index,
            measure,
            start_beat,
            notes,
            interval_pattern,
            rhythm_pattern,
            contour,
            relationship: DevelopmentTechnique::New,
            related_to: None,
            transposition: None,
            confidence: 0.6,
        };

        if let Some(prev) = motives.last() {
            classify_relationship(prev, &mut motive, config);
        }

        motives.push(motive);
    }

    motives
}

/// Classify `curr` against `prev`, first matching row wins
fn classify_relationship(prev: &Motive, curr: &mut Motive, config: &Config) {
    let sim = &config.similarity;
    let m = &config.motive;

    let interval_sim = similarity::interval_similarity(&prev.interval_pattern, &curr.interval_pattern, sim);
    let rhythm_sim = similarity::rhythm_similarity(&prev.rhythm_pattern, &curr.rhythm_pattern, sim);
    let transposition = similarity::detect_transposition(&prev.notes, &curr.notes);

    if interval_sim > m.repetition_interval_sim && rhythm_sim > m.repetition_rhythm_sim {
        curr.relationship = DevelopmentTechnique::Repetition;
        curr.related_to = Some(prev.index);
        curr.confidence = 0.95;
        return;
    }

    if interval_sim > m.sequence_interval_sim
        && rhythm_sim > m.sequence_rhythm_sim
        && transposition != 0
    {
        curr.relationship = DevelopmentTechnique::Sequence;
        curr.related_to = Some(prev.index);
        curr.transposition = Some(transposition);
        curr.confidence = 0.85;
        return;
    }

    if rhythm_sim > m.variation_rhythm_sim && interval_sim < m.variation_interval_max {
        curr.relationship = DevelopmentTechnique::Variation;
        curr.related_to = Some(prev.index);
        curr.confidence = 0.7;
        return;
    }

    if is_fragmentation(prev, curr, config) {
        curr.relationship = DevelopmentTechnique::Fragmentation;
        curr.related_to = Some(prev.index);
        curr.confidence = 0.75;
        return;
    }

    if similarity::is_inversion(&prev.interval_pattern, &curr.interval_pattern, sim) {
        curr.relationship = DevelopmentTechnique::Inversion;
        curr.related_to = Some(prev.index);
        curr.confidence = 0.8;
        return;
    }

    curr.relationship = DevelopmentTechnique::New;
    curr.related_to = None;
    curr.confidence = 0.6;
}

/// Shortened restatement: clearly fewer notes, matching interval prefix
fn is_fragmentation(prev: &Motive, curr: &Motive, config: &Config) -> bool {
    let m = &config.motive;
    if (curr.notes.len() as f32) >= m.fragmentation_length_ratio * prev.notes.len() as f32 {
        return false;
    }
    let prefix_len = curr.interval_pattern.len().min(prev.interval_pattern.len());
    if prefix_len == 0 {
        return false;
    }
    let prefix_sim = similarity::interval_similarity(
        &prev.interval_pattern[..prefix_len],
        &curr.interval_pattern[..prefix_len],
        &config.similarity,
    );
    prefix_sim > m.fragmentation_prefix_sim
}
