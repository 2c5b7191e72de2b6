//! Validation tests for period grouping and classification

use score2form::analysis::{Closure, PeriodType, Proportion};
use score2form::config::Config;
use score2form::passes::{cadences, periods, phrases};
use score2form::pitch::tonic_from_key;
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

fn score_with(measure_count: u32, notes: Vec<Note>) -> ParsedScore {
    ParsedScore {
        measures: (1..=measure_count).map(|number| Measure { number }).collect(),
        notes,
        key_signature: KeySignature {
            fifths: 0,
            mode: KeyMode::Major,
        },
        ..ParsedScore::default()
    }
}

/// Antecedent/consequent pair: shared opening, different PAC approaches
fn parallel_period_score() -> ParsedScore {
    let notes = vec![
        note(Step::C, 4, 1, 0.0, 1.0),
        note(Step::E, 4, 1, 1.0, 1.0),
        note(Step::G, 4, 1, 2.0, 2.0),
        rest(2, 0.0, 4.0),
        note(Step::G, 3, 3, 0.0, 2.0),
        note(Step::B, 4, 3, 2.0, 2.0),
        note(Step::C, 4, 4, 0.0, 2.0),
        note(Step::C, 5, 4, 0.0, 4.0),
        note(Step::C, 4, 5, 0.0, 1.0),
        note(Step::E, 4, 5, 1.0, 1.0),
        note(Step::G, 4, 5, 2.0, 2.0),
        rest(6, 0.0, 4.0),
        note(Step::G, 3, 7, 0.0, 1.0),
        note(Step::A, 4, 7, 1.0, 1.0),
        note(Step::F, 4, 7, 2.0, 1.0),
        note(Step::D, 5, 7, 3.0, 1.0),
        note(Step::C, 4, 8, 0.0, 4.0),
        note(Step::C, 5, 8, 0.0, 4.0),
    ];
    score_with(8, notes)
}

/// Four weakly-closed three-measure phrases: C, D, then a dominant arrival.
/// Each following phrase opens away from C to avoid authentic readings.
fn four_phrase_score() -> ParsedScore {
    let mut notes = Vec::new();
    for group in 0..4u32 {
        let base = group * 3;
        let opening = if group == 0 { Step::C } else { Step::E };
        notes.push(note(opening, 4, base + 1, 0.0, 2.0));
        notes.push(note(Step::A, 4, base + 1, 2.0, 2.0));
        notes.push(note(Step::D, 4, base + 2, 0.0, 4.0));
        notes.push(note(Step::G, 3, base + 3, 0.0, 2.0));
        notes.push(note(Step::D, 5, base + 3, 2.0, 2.0));
    }
    score_with(12, notes)
}

fn detect_periods(score: &ParsedScore, config: &Config) -> Vec<score2form::analysis::Period> {
    let tonic = tonic_from_key(0, KeyMode::Major);
    let detected_cadences = cadences::detect_cadences(score, tonic, config);
    let detected_phrases = phrases::detect_phrases(score, &detected_cadences, &[], config);
    let grouped = periods::group_periods(&detected_phrases, config);
    periods::merge_compound_periods(grouped, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_period() {
        let score = parallel_period_score();
        let config = Config::default();
        let detected = detect_periods(&score, &config);

        assert_eq!(detected.len(), 1);
        let period = &detected[0];
        assert_eq!(period.phrase_count(), 2);
        assert_eq!(period.period_type, PeriodType::Parallel);
        assert_eq!(period.proportion, Proportion::Square);
        assert_eq!(period.closure, Closure::Closed);
        assert_eq!(period.material, "a");
        assert_eq!(period.phrases[1].material, "a'");
    }

    #[test]
    fn test_period_spans_its_phrases() {
        let score = parallel_period_score();
        let config = Config::default();
        let detected = detect_periods(&score, &config);

        let period = &detected[0];
        assert_eq!(period.start_measure, period.phrases[0].start_measure);
        assert_eq!(period.end_measure, period.phrases.last().unwrap().end_measure);
        assert_eq!(
            period.cadence.as_ref().map(|c| c.measure),
            period.phrases.last().unwrap().cadence.as_ref().map(|c| c.measure)
        );
    }

    #[test]
    fn test_weak_cadences_accumulate_to_four_phrase() {
        let score = four_phrase_score();
        let config = Config::default();
        let detected = detect_periods(&score, &config);

        assert_eq!(detected.len(), 1);
        let period = &detected[0];
        assert_eq!(period.phrase_count(), 4);
        assert_eq!(period.period_type, PeriodType::FourPhrase);
        // Equal three-measure phrases are regular but not square
        assert_eq!(period.proportion, Proportion::Regular);
        assert_eq!(period.closure, Closure::Open);
    }

    #[test]
    fn test_strong_cadence_closes_at_two_phrases() {
        // Two parallel periods back to back
        let mut score = parallel_period_score();
        let shift = 8u32;
        let more: Vec<Note> = score
            .notes
            .clone()
            .into_iter()
            .map(|mut n| {
                n.measure += shift;
                n
            })
            .collect();
        score.notes.extend(more);
        for m in 9..=16u32 {
            score.measures.push(Measure { number: m });
        }
        let config = Config::default();
        let detected = detect_periods(&score, &config);

        // Compound merge may fold the identical halves into one AA' period;
        // either way every phrase stays inside exactly one period
        let phrase_total: usize = detected.iter().map(|p| p.phrase_count()).sum();
        assert_eq!(phrase_total, 4);
        for period in &detected {
            assert!(period.phrase_count() >= 2);
        }
    }
}
