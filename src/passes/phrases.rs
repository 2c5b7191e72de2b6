//! Cadence-driven phrase segmentation and relationship labelling

use crate::analysis::{cadence_strength, Cadence, Closure, Phrase, PhraseRelationship, SubPhrase};
use crate::config::Config;
use crate::error::Result as ScoreResult;
use crate::score::{Note, ParsedScore, ScoreState};
use crate::similarity;

/// Detect phrases from the cadence list and store them on the state
pub fn run(state: &mut ScoreState, config: &Config) -> ScoreResult<()> {
    if state.is_insufficient() {
        state.phrases = Vec::new();
        return Ok(());
    }
    state.phrases = detect_phrases(&state.score, &state.cadences, &state.sub_phrases, config);
    Ok(())
}

/// Walk the sorted cadences, closing a phrase at each cadence measure.
/// Overlong spans split at the midpoint; a trailing span of at least two
/// measures becomes a final open phrase.
pub fn detect_phrases(
    score: &ParsedScore,
    cadences: &[Cadence],
    sub_phrases: &[SubPhrase],
    config: &Config,
) -> Vec<Phrase> {
    let mut spans: Vec<(u32, u32, Option<Cadence>)> = Vec::new();

    let first_note_measure = match score.notes.iter().map(|n| n.measure).min() {
        Some(m) => m,
        None => return Vec::new(),
    };
    let last_measure = score.last_measure().unwrap_or(first_note_measure);

    let mut start = first_note_measure;
    for cadence in cadences {
        if cadence.measure < start {
            continue;
        }
        let length = cadence.measure - start + 1;
        if length < config.phrase.min_length {
            // Too short to stand alone; keep accumulating
            continue;
        }
        if length > config.phrase.max_length {
            let mid_end = start + length / 2 - 1;
            spans.push((start, mid_end, None));
            spans.push((mid_end + 1, cadence.measure, Some(cadence.clone())));
        } else {
            spans.push((start, cadence.measure, Some(cadence.clone())));
        }
        start = cadence.measure + 1;
    }

    // Remainder after the last cadence
    if start <= last_measure && last_measure - start + 1 >= config.phrase.min_length {
        spans.push((start, last_measure, None));
    }

    let mut phrases: Vec<Phrase> = Vec::new();
    let mut next_letter = b'a';

    for (start_measure, end_measure, cadence) in spans {
        let notes: Vec<Note> = score
            .notes
            .iter()
            .filter(|n| n.measure >= start_measure && n.measure <= end_measure)
            .cloned()
            .collect();
        let phrase_subs: Vec<SubPhrase> = sub_phrases
            .iter()
            .filter(|s| s.start_measure >= start_measure && s.end_measure <= end_measure)
            .cloned()
            .collect();

        let closure = if cadence_strength(cadence.as_ref()) > config.cadence.closure_threshold {
            Closure::Closed
        } else {
            Closure::Open
        };

        let index = phrases.len();
        let mut phrase = Phrase {
            index,
            start_measure,
            end_measure,
            cadence,
            notes,
            sub_phrases: phrase_subs,
            material: String::new(),
            closure,
            relationship: None,
            head_similarity: None,
        };

        if let Some(prev) = phrases.last() {
            relate_phrases(prev, &mut phrase, &mut next_letter, config);
        } else {
            phrase.material = (next_letter as char).to_string();
            next_letter += 1;
        }

        phrases.push(phrase);
    }

    phrases
}

/// Head similarity between the opening halves of two phrases (capped)
pub fn compare_phrase_heads(a: &Phrase, b: &Phrase, config: &Config) -> f32 {
    let head_a = head(&a.notes, config.phrase.head_note_cap);
    let head_b = head(&b.notes, config.phrase.head_note_cap);
    similarity::note_similarity(head_a, head_b, &config.similarity)
}

fn relate_phrases(prev: &Phrase, curr: &mut Phrase, next_letter: &mut u8, config: &Config) {
    let head_sim = compare_phrase_heads(prev, curr, config);
    let tail_a = tail(&prev.notes, config.phrase.head_note_cap);
    let tail_b = tail(&curr.notes, config.phrase.head_note_cap);
    let tail_sim = similarity::note_similarity(tail_a, tail_b, &config.similarity);

    curr.head_similarity = Some(head_sim);

    if head_sim > config.phrase.parallel_head_sim && tail_sim > config.phrase.parallel_head_sim {
        curr.relationship = Some(PhraseRelationship::Repetition);
        curr.material = format!("{}r", prev.material);
    } else if head_sim > config.phrase.parallel_head_sim
        && tail_sim < config.phrase.parallel_tail_max
    {
        curr.relationship = Some(PhraseRelationship::Parallel);
        curr.material = format!("{}'", prev.material);
    } else if head_sim < config.phrase.contrast_head_sim {
        curr.relationship = Some(PhraseRelationship::Contrasting);
        curr.material = (*next_letter as char).to_string();
        *next_letter = next_letter.saturating_add(1);
    } else {
        curr.relationship = Some(PhraseRelationship::Development);
        curr.material = format!("{}v", prev.material);
    }
}

fn head(notes: &[Note], cap: usize) -> &[Note] {
    let len = (notes.len() / 2).min(cap).max(1).min(notes.len());
    &notes[..len]
}

fn tail(notes: &[Note], cap: usize) -> &[Note] {
    let len = (notes.len() / 2).min(cap).max(1).min(notes.len());
    &notes[notes.len() - len..]
}
