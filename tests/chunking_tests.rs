//! Chunk-invariance tests for the chunked driver

use score2form::chunking;
use score2form::config::Config;
use score2form::score::{
    Accidental, KeyMode, KeySignature, Measure, Note, ParsedScore, PitchName, Step,
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

fn rest(measure: u32, beat: f32, duration: f32) -> Note {
    Note {
        pitch: None,
        duration,
        measure,
        beat,
        voice: 1,
        dynamics: None,
    }
}

/// Long score: the eight-measure parallel-period pattern repeated to fill
/// `groups * 8` measures, enough to force chunked processing.
fn long_score(groups: u32) -> ParsedScore {
    let mut notes = Vec::new();
    for g in 0..groups {
        let base = g * 8;
        notes.push(note(Step::C, 4, base + 1, 0.0, 1.0));
        notes.push(note(Step::E, 4, base + 1, 1.0, 1.0));
        notes.push(note(Step::G, 4, base + 1, 2.0, 2.0));
        notes.push(rest(base + 2, 0.0, 4.0));
        notes.push(note(Step::G, 3, base + 3, 0.0, 2.0));
        notes.push(note(Step::B, 4, base + 3, 2.0, 2.0));
        notes.push(note(Step::C, 4, base + 4, 0.0, 2.0));
        notes.push(note(Step::C, 5, base + 4, 0.0, 4.0));
        notes.push(note(Step::C, 4, base + 5, 0.0, 1.0));
        notes.push(note(Step::E, 4, base + 5, 1.0, 1.0));
        notes.push(note(Step::G, 4, base + 5, 2.0, 2.0));
        notes.push(rest(base + 6, 0.0, 4.0));
        notes.push(note(Step::G, 3, base + 7, 0.0, 1.0));
        notes.push(note(Step::A, 4, base + 7, 1.0, 1.0));
        notes.push(note(Step::F, 4, base + 7, 2.0, 1.0));
        notes.push(note(Step::D, 5, base + 7, 3.0, 1.0));
        notes.push(note(Step::C, 4, base + 8, 0.0, 4.0));
        notes.push(note(Step::C, 5, base + 8, 0.0, 4.0));
    }
    ParsedScore {
        measures: (1..=groups * 8).map(|number| Measure { number }).collect(),
        notes,
        key_signature: KeySignature {
            fifths: 0,
            mode: KeyMode::Major,
        },
        ..ParsedScore::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_selection_uses_chunks_for_long_scores() {
        let config = Config::default();

        let short = chunking::analyze(long_score(2), &config).unwrap();
        assert!(!short.processing.chunked);

        // 96 measures exceeds twice the per-chunk measure budget
        let long = chunking::analyze(long_score(12), &config).unwrap();
        assert!(long.processing.chunked);
        assert!(long.processing.chunk_count > 1);
        assert_eq!(long.processing.skipped_chunks, 0);
    }

    #[test]
    fn test_global_outputs_match_between_modes() {
        let config = Config::default();
        let score = long_score(12);

        let full = chunking::analyze_complete(score.clone(), &config).unwrap();
        let chunked = chunking::analyze_complete_chunked(score, &config).unwrap();

        // Cadences are identical: they always run on the whole stream
        assert_eq!(full.cadences, chunked.cadences);

        // Phrase boundaries, closure, and materials agree
        assert_eq!(full.phrases.len(), chunked.phrases.len());
        for (a, b) in full.phrases.iter().zip(chunked.phrases.iter()) {
            assert_eq!(
                (a.start_measure, a.end_measure, a.closure, a.material.as_str()),
                (b.start_measure, b.end_measure, b.closure, b.material.as_str())
            );
        }

        // Period grouping and classification agree
        assert_eq!(full.periods.len(), chunked.periods.len());
        for (a, b) in full.periods.iter().zip(chunked.periods.iter()) {
            assert_eq!(
                (a.start_measure, a.end_measure, a.period_type),
                (b.start_measure, b.end_measure, b.period_type)
            );
        }

        // Form agrees
        let form_a = full.form.as_ref().unwrap();
        let form_b = chunked.form.as_ref().unwrap();
        assert_eq!(form_a.form_type, form_b.form_type);
        assert!((form_a.confidence - form_b.confidence).abs() < 1e-6);
    }

    #[test]
    fn test_leaf_items_agree_away_from_chunk_boundaries() {
        let config = Config::default();
        let score = long_score(12);
        let last = score.measures.len() as u32;

        let full = chunking::analyze_complete(score.clone(), &config).unwrap();
        let chunked = chunking::analyze_complete_chunked(score, &config).unwrap();

        let cuts: Vec<u32> = chunking::chunk_ranges(
            1,
            last,
            config.chunking.max_measures_per_chunk,
            config.chunking.overlap_measures,
        )
        .iter()
        .skip(1)
        .map(|&(start, _)| start + config.chunking.overlap_measures / 2)
        .collect();
        let interior = |measure: u32| {
            cuts.iter()
                .all(|&cut| measure.abs_diff(cut) > config.chunking.overlap_measures / 2)
        };

        let full_interior: Vec<_> = full
            .motives
            .iter()
            .filter(|m| interior(m.measure))
            .map(|m| {
                (
                    m.measure,
                    m.start_beat as i32,
                    m.interval_pattern.clone(),
                    m.relationship,
                    m.related_to,
                    m.transposition,
                    m.confidence,
                )
            })
            .collect();
        let chunked_interior: Vec<_> = chunked
            .motives
            .iter()
            .filter(|m| interior(m.measure))
            .map(|m| {
                (
                    m.measure,
                    m.start_beat as i32,
                    m.interval_pattern.clone(),
                    m.relationship,
                    m.related_to,
                    m.transposition,
                    m.confidence,
                )
            })
            .collect();
        assert_eq!(full_interior, chunked_interior);

        let full_subs: Vec<_> = full
            .sub_phrases
            .iter()
            .filter(|s| interior(s.start_measure))
            .map(|s| {
                (
                    s.start_measure,
                    s.start_beat as i32,
                    s.material.clone(),
                    s.similar_to,
                )
            })
            .collect();
        let chunked_subs: Vec<_> = chunked
            .sub_phrases
            .iter()
            .filter(|s| interior(s.start_measure))
            .map(|s| {
                (
                    s.start_measure,
                    s.start_beat as i32,
                    s.material.clone(),
                    s.similar_to,
                )
            })
            .collect();
        assert_eq!(full_subs, chunked_subs);
    }

    #[test]
    fn test_insufficient_data_yields_empty_results() {
        let config = Config::default();
        let score = ParsedScore {
            measures: vec![Measure { number: 1 }],
            notes: vec![note(Step::C, 4, 1, 0.0, 4.0)],
            ..ParsedScore::default()
        };
        let state = chunking::analyze(score, &config).unwrap();

        assert!(state.cadences.is_empty());
        assert!(state.motives.is_empty());
        assert!(state.phrases.is_empty());
        assert!(state.periods.is_empty());
        let form = state.form.as_ref().unwrap();
        assert_eq!(
            form.form_type,
            score2form::analysis::FormType::OnePart
        );
        assert!((form.confidence - 0.5).abs() < 1e-6);
    }
}
