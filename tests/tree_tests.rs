//! Validation tests for tree assembly, confidence, and determinism

use score2form::chunking;
use score2form::config::Config;
use score2form::score::{
    Accidental, KeyMode, KeySignature, Measure, Note, ParsedScore, PitchName, Step,
};
use score2form::tree::{StructureTree, UncertaintyLevel, VisualStyle};

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

/// Eight-measure parallel period in C major
fn test_score() -> ParsedScore {
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
    ParsedScore {
        measures: (1..=8).map(|number| Measure { number }).collect(),
        notes,
        key_signature: KeySignature {
            fifths: 0,
            mode: KeyMode::Major,
        },
        ..ParsedScore::default()
    }
}

fn assert_tree_consistent(tree: &StructureTree) {
    for id in tree.ids() {
        let node = tree.get(id).unwrap();
        assert!(
            node.start_measure <= node.end_measure,
            "node range must be ordered"
        );

        // Every child's range is contained in the parent's
        for &child_id in &node.children {
            let child = tree.get(child_id).unwrap();
            assert!(child.start_measure >= node.start_measure);
            assert!(child.end_measure <= node.end_measure);
            assert_eq!(child.parent, Some(id));
        }

        // Sibling ranges do not overlap
        for pair in node.children.windows(2) {
            let a = tree.get(pair[0]).unwrap();
            let b = tree.get(pair[1]).unwrap();
            assert!(
                a.end_measure < b.start_measure || b.end_measure < a.start_measure,
                "sibling ranges must not overlap"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_levels_present() {
        let config = Config::default();
        let state = chunking::analyze_complete(test_score(), &config).unwrap();
        let tree = state.tree.as_ref().expect("tree must be built");

        use score2form::tree::StructureType;
        let types: std::collections::BTreeSet<&str> = tree
            .nodes()
            .iter()
            .map(|n| n.node_type.name())
            .collect();
        assert!(types.contains(StructureType::Section.name()));
        assert!(types.contains(StructureType::Theme.name()));
        assert!(types.contains(StructureType::Period.name()));
        assert!(types.contains(StructureType::Phrase.name()));
        assert!(types.contains(StructureType::SubPhrase.name()));
        assert!(types.contains(StructureType::Motive.name()));
    }

    #[test]
    fn test_tree_consistency() {
        let config = Config::default();
        let state = chunking::analyze_complete(test_score(), &config).unwrap();
        assert_tree_consistent(state.tree.as_ref().unwrap());
    }

    #[test]
    fn test_confidences_in_unit_range() {
        let config = Config::default();
        let state = chunking::analyze_complete(test_score(), &config).unwrap();
        for node in state.tree.as_ref().unwrap().nodes() {
            assert!(node.confidence >= 0.0 && node.confidence <= 1.0);
        }
    }

    #[test]
    fn test_determinism() {
        let config = Config::default();
        let first = chunking::analyze_complete(test_score(), &config).unwrap();
        let second = chunking::analyze_complete(test_score(), &config).unwrap();

        let a = score2form::analysis::build_full_analysis(&first);
        let b = score2form::analysis::build_full_analysis(&second);

        let json_a = serde_json::to_string(&a).unwrap();
        let json_b = serde_json::to_string(&b).unwrap();
        assert_eq!(json_a, json_b, "repeated analysis must be identical");
    }

    #[test]
    fn test_visual_style_monotonicity() {
        // Walk a confidence ramp and check ordering of the style table
        let mut previous = VisualStyle::from_confidence(1.0);
        let mut confidence = 1.0f32;
        while confidence >= 0.0 {
            let style = VisualStyle::from_confidence(confidence);
            assert!(style.uncertainty >= previous.uncertainty);
            assert!(style.opacity <= previous.opacity);
            previous = style;
            confidence -= 0.05;
        }
        assert_eq!(
            VisualStyle::from_confidence(0.1).uncertainty,
            UncertaintyLevel::VeryHigh
        );
    }

    #[test]
    fn test_phrase_level_children_contiguous() {
        let config = Config::default();
        let state = chunking::analyze_complete(test_score(), &config).unwrap();
        let tree = state.tree.as_ref().unwrap();

        use score2form::tree::StructureType;
        for id in tree.ids() {
            let node = tree.get(id).unwrap();
            if node.node_type != StructureType::Period {
                continue;
            }
            // Phrase children tile the period without gaps
            for pair in node.children.windows(2) {
                let a = tree.get(pair[0]).unwrap();
                let b = tree.get(pair[1]).unwrap();
                assert_eq!(a.end_measure + 1, b.start_measure);
            }
        }
    }
}
