//! Sub-phrase segmentation and greedy material labelling

use crate::analysis::{Motive, SubPhrase};
use crate::config::Config;
use crate::error::Result as ScoreResult;
use crate::score::{Note, ParsedScore, ScoreState};
use crate::similarity;

/// Detect sub-phrases over the whole stream and store them on the state
pub fn run(state: &mut ScoreState, config: &Config) -> ScoreResult<()> {
    if state.is_insufficient() {
        state.sub_phrases = Vec::new();
        return Ok(());
    }
    state.sub_phrases = detect_sub_phrases(&state.score, &state.motives, config);
    Ok(())
}

/// One sub-phrase per measure, split in two when the measure is busy and
/// carries an internal rhythmic break.
pub fn detect_sub_phrases(
    score: &ParsedScore,
    motives: &[Motive],
    config: &Config,
) -> Vec<SubPhrase> {
    let beats = score.time_signature.beats as f32;
    let mut sub_phrases: Vec<SubPhrase> = Vec::new();
    let mut labeler = MaterialLabeler::new(config);
    let last = score.last_measure().unwrap_or(0);

    for measure in 1..=last {
        let notes: Vec<Note> = score
            .notes_in_measure(measure)
            .into_iter()
            .cloned()
            .collect();
        if notes.is_empty() {
            continue;
        }

        if should_split(&notes, config) {
            let mid = notes.len() / 2;
            let (front, back) = notes.split_at(mid);
            push_sub_phrase(
                &mut sub_phrases,
                &mut labeler,
                measure,
                0.0,
                2.0,
                front.to_vec(),
                motives,
            );
            push_sub_phrase(
                &mut sub_phrases,
                &mut labeler,
                measure,
                2.0,
                4.0,
                back.to_vec(),
                motives,
            );
        } else {
            push_sub_phrase(
                &mut sub_phrases,
                &mut labeler,
                measure,
                0.0,
                beats,
                notes,
                motives,
            );
        }
    }

    sub_phrases
}

/// A measure splits when it has more than the threshold note count and an
/// internal break: a long note or a rest away from the measure edges.
fn should_split(notes: &[Note], config: &Config) -> bool {
    if notes.len() <= config.sub_phrase.split_note_count {
        return false;
    }
    notes.iter().enumerate().any(|(i, n)| {
        let interior = i > 0 && i < notes.len() - 1;
        n.duration >= config.sub_phrase.break_duration_beats || (n.is_rest() && interior)
    })
}

fn push_sub_phrase(
    sub_phrases: &mut Vec<SubPhrase>,
    labeler: &mut MaterialLabeler,
    measure: u32,
    start_beat: f32,
    end_beat: f32,
    notes: Vec<Note>,
    motives: &[Motive],
) {
    let index = sub_phrases.len();
    let (material, similar_to, sim) = labeler.label(&notes, sub_phrases);
    let motive_indices = motives
        .iter()
        .filter(|m| m.measure == measure && m.start_beat >= start_beat && m.start_beat < end_beat)
        .map(|m| m.index)
        .collect();

    sub_phrases.push(SubPhrase {
        index,
        start_measure: measure,
        end_measure: measure,
        start_beat,
        end_beat,
        notes,
        motive_indices,
        material,
        similar_to,
        similarity: sim,
    });
}

/// Reassign indices and material labels over an already-merged sub-phrase
/// list. The chunked driver calls this after overlap merging so letters are
/// allocated over the whole stream, not per chunk.
pub fn relabel_materials(sub_phrases: &mut Vec<SubPhrase>, config: &Config) {
    let mut labeler = MaterialLabeler::new(config);
    let mut relabelled: Vec<SubPhrase> = Vec::with_capacity(sub_phrases.len());

    for sub in sub_phrases.drain(..) {
        let (material, similar_to, similarity) = labeler.label(&sub.notes, &relabelled);
        relabelled.push(SubPhrase {
            index: relabelled.len(),
            material,
            similar_to,
            similarity,
            ..sub
        });
    }

    *sub_phrases = relabelled;
}

/// Greedy letter assignment: best match above the prime threshold inherits
/// the match's label with a prime, above the variant threshold with a `v`,
/// anything else opens the next letter.
struct MaterialLabeler {
    next_letter: u8,
    prime_threshold: f32,
    variant_threshold: f32,
    similarity: crate::config::SimilarityConfig,
}

impl MaterialLabeler {
    fn new(config: &Config) -> Self {
        Self {
            next_letter: b'a',
            prime_threshold: config.sub_phrase.prime_threshold,
            variant_threshold: config.sub_phrase.variant_threshold,
            similarity: config.similarity.clone(),
        }
    }

    fn label(
        &mut self,
        notes: &[Note],
        previous: &[SubPhrase],
    ) -> (String, Option<usize>, Option<f32>) {
        let mut best: Option<(usize, f32)> = None;
        for prev in previous {
            let sim = similarity::note_similarity(&prev.notes, notes, &self.similarity);
            if best.map(|(_, s)| sim > s).unwrap_or(true) {
                best = Some((prev.index, sim));
            }
        }

        if let Some((idx, sim)) = best {
            if sim >= self.prime_threshold {
                let material = format!("{}'", previous[idx].material);
                return (material, Some(idx), Some(sim));
            }
            if sim >= self.variant_threshold {
                let material = format!("{}v", previous[idx].material);
                return (material, Some(idx), Some(sim));
            }
        }

        let letter = (self.next_letter as char).to_string();
        self.next_letter = self.next_letter.saturating_add(1);
        (letter, None, None)
    }
}
