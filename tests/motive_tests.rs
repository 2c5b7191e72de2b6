//! Validation tests for motive and sub-phrase detection

use score2form::analysis::{Contour, DevelopmentTechnique};
use score2form::config::Config;
use score2form::passes::{motives, sub_phrases};
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
        key_signature: KeySignature::default(),
        ..ParsedScore::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_beats_open_motives() {
        // Four eighth notes per half measure: two motives per measure
        let notes = vec![
            note(Step::C, 4, 1, 0.0, 0.5),
            note(Step::D, 4, 1, 0.5, 0.5),
            note(Step::E, 4, 1, 1.0, 0.5),
            note(Step::F, 4, 1, 1.5, 0.5),
            note(Step::G, 4, 1, 2.0, 0.5),
            note(Step::A, 4, 1, 2.5, 0.5),
            note(Step::B, 4, 1, 3.0, 0.5),
            note(Step::C, 5, 1, 3.5, 0.5),
        ];
        let score = score_with(2, notes);
        let config = Config::default();

        let detected = motives::detect_motives(&score, &config);
        assert_eq!(detected.len(), 2);
        assert_eq!(detected[0].start_beat, 0.0);
        assert_eq!(detected[1].start_beat, 2.0);
        assert_eq!(detected[0].contour, Contour::Ascending);
    }

    #[test]
    fn test_single_note_groups_are_dropped() {
        let notes = vec![
            note(Step::C, 4, 1, 0.0, 2.0),
            note(Step::G, 4, 1, 2.0, 0.5),
            note(Step::A, 4, 1, 2.5, 0.5),
        ];
        let score = score_with(2, notes);
        let config = Config::default();

        let detected = motives::detect_motives(&score, &config);
        // The lone first-half note cannot form a motive
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].start_beat, 2.0);
    }

    #[test]
    fn test_repetition_relationship() {
        let notes = vec![
            note(Step::C, 4, 1, 0.0, 1.0),
            note(Step::E, 4, 1, 1.0, 1.0),
            note(Step::C, 4, 1, 2.0, 1.0),
            note(Step::E, 4, 1, 3.0, 1.0),
        ];
        let score = score_with(2, notes);
        let config = Config::default();

        let detected = motives::detect_motives(&score, &config);
        assert_eq!(detected.len(), 2);
        assert_eq!(detected[1].relationship, DevelopmentTechnique::Repetition);
        assert_eq!(detected[1].related_to, Some(0));
        assert!((detected[1].confidence - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_sequence_carries_transposition() {
        // Same interval shape a step higher; the lengthened final note keeps
        // the rhythm match below the repetition row's threshold
        let notes = vec![
            note(Step::C, 4, 1, 0.0, 0.5),
            note(Step::D, 4, 1, 0.25, 0.5),
            note(Step::E, 4, 1, 0.5, 0.5),
            note(Step::F, 4, 1, 0.75, 0.5),
            note(Step::G, 4, 1, 1.0, 0.5),
            note(Step::A, 4, 1, 1.25, 0.5),
            note(Step::D, 4, 1, 2.0, 0.5),
            note(Step::E, 4, 1, 2.25, 0.5),
            note(Step::F, 4, 1, 2.5, 0.5),
            note(Step::G, 4, 1, 2.75, 0.5),
            note(Step::A, 4, 1, 3.0, 0.5),
            note(Step::C, 5, 1, 3.25, 2.0),
        ];
        let score = score_with(2, notes);
        let config = Config::default();

        let detected = motives::detect_motives(&score, &config);
        assert_eq!(detected.len(), 2);
        assert_eq!(detected[1].relationship, DevelopmentTechnique::Sequence);
        assert_eq!(detected[1].transposition, Some(2));
    }

    #[test]
    fn test_inversion_relationship() {
        // Rising fourth-then-second answered by its mirror, with rhythms
        // altered enough to evade the repetition and variation rows
        let notes = vec![
            note(Step::C, 4, 1, 0.0, 0.5),
            note(Step::F, 4, 1, 0.5, 0.5),
            note(Step::G, 4, 1, 1.0, 1.0),
            note(Step::C, 5, 1, 2.0, 2.0),
            note(Step::G, 4, 1, 2.5, 2.0),
            note(Step::F, 4, 1, 3.0, 2.0),
        ];
        let score = score_with(2, notes);
        let config = Config::default();

        let detected = motives::detect_motives(&score, &config);
        assert_eq!(detected.len(), 2);
        // Intervals [+5, +2] vs [-5, -2]
        assert_eq!(detected[1].relationship, DevelopmentTechnique::Inversion);
    }

    #[test]
    fn test_sub_phrase_one_per_measure() {
        let notes = vec![
            note(Step::C, 4, 1, 0.0, 2.0),
            note(Step::E, 4, 1, 2.0, 2.0),
            note(Step::G, 4, 2, 0.0, 2.0),
            note(Step::E, 4, 2, 2.0, 2.0),
        ];
        let score = score_with(2, notes);
        let config = Config::default();

        let detected = motives::detect_motives(&score, &config);
        let subs = sub_phrases::detect_sub_phrases(&score, &detected, &config);
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].start_measure, 1);
        assert_eq!(subs[1].start_measure, 2);
    }

    #[test]
    fn test_busy_measure_with_internal_rest_splits() {
        // Six eighth notes around a rest at beat 2: two sub-phrases on
        // beats [0,2) and [2,4)
        let notes = vec![
            note(Step::C, 4, 1, 0.0, 0.5),
            note(Step::D, 4, 1, 0.5, 0.5),
            note(Step::E, 4, 1, 1.0, 0.5),
            note(Step::F, 4, 1, 1.5, 0.5),
            rest(1, 2.0, 1.0),
            note(Step::B, 3, 1, 3.0, 0.5),
            note(Step::A, 3, 1, 3.5, 0.5),
        ];
        let score = score_with(2, notes);
        let config = Config::default();

        let detected = motives::detect_motives(&score, &config);
        let subs = sub_phrases::detect_sub_phrases(&score, &detected, &config);

        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].start_beat, 0.0);
        assert_eq!(subs[0].end_beat, 2.0);
        assert_eq!(subs[1].start_beat, 2.0);
        assert_eq!(subs[1].end_beat, 4.0);
        assert_ne!(subs[0].material, subs[1].material);
    }

    #[test]
    fn test_material_prime_for_near_identical_measures() {
        let notes = vec![
            note(Step::C, 4, 1, 0.0, 1.0),
            note(Step::D, 4, 1, 1.0, 1.0),
            note(Step::E, 4, 1, 2.0, 2.0),
            note(Step::C, 4, 2, 0.0, 1.0),
            note(Step::D, 4, 2, 1.0, 1.0),
            note(Step::E, 4, 2, 2.0, 2.0),
        ];
        let score = score_with(2, notes);
        let config = Config::default();

        let detected = motives::detect_motives(&score, &config);
        let subs = sub_phrases::detect_sub_phrases(&score, &detected, &config);

        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].material, "a");
        assert_eq!(subs[1].material, "a'");
        assert_eq!(subs[1].similar_to, Some(0));
    }
}
