//! Preference learner tests

use score2form::config::PreferenceConfig;
use score2form::emotion::{DynamicsLevel, EmotionFeatures, TempoFeel, TensionLevel};
use score2form::preference::{feature_vector, PreferenceLearner, UserAction, FEATURE_DIM};
use score2form::schemes::{
    AnimationType, Arrangement, RecommendationSource, Shape, ShapeSize, ShapeType, VisualScheme,
};
use score2form::tree::{NodeFeatures, StructureNode, StructureType, TooltipData, VisualStyle};

fn test_node(node_type: StructureType, material: &str) -> StructureNode {
    StructureNode {
        id: "n1".to_string(),
        node_type,
        start_measure: 1,
        end_measure: 4,
        parent: None,
        children: Vec::new(),
        material: material.to_string(),
        confidence: 0.8,
        detect_confidence: 0.8,
        features: NodeFeatures::default(),
        visual_style: VisualStyle::from_confidence(0.8),
        tooltip: TooltipData::default(),
        interval_head: Vec::new(),
    }
}

fn neutral_emotion() -> EmotionFeatures {
    EmotionFeatures {
        tempo: TempoFeel::Moderate,
        dynamics: DynamicsLevel::Moderate,
        tension: TensionLevel::Neutral,
    }
}

fn scheme(id: &str, shape: ShapeType, color: &str) -> VisualScheme {
    VisualScheme {
        id: id.to_string(),
        shapes: vec![Shape {
            shape_type: shape,
            size: ShapeSize::Medium,
        }],
        colors: vec![color.to_string()],
        animation: AnimationType::Pulse,
        arrangement: Arrangement::Single,
        relationship: None,
        emotion: None,
        source: RecommendationSource::RuleBased,
        from_preference: false,
        preference_score: None,
        match_count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_dimension_and_one_hot() {
        let node = test_node(StructureType::Phrase, "a'");
        let features = feature_vector(&node, &neutral_emotion());

        assert_eq!(features.len(), FEATURE_DIM);
        // Exactly one structure-type slot is hot
        let hot: Vec<usize> = (0..6).filter(|&i| features[i] > 0.0).collect();
        assert_eq!(hot, vec![2]);
        // Prime marker set, compound marker set for the two-char label
        assert_eq!(features[8], 1.0);
        assert_eq!(features[9], 1.0);
        // Neutral emotion encodes as 0.5
        assert_eq!(features[20], 0.5);
    }

    #[test]
    fn test_empty_buffer_returns_no_recommendations() {
        let learner = PreferenceLearner::new(PreferenceConfig::default());
        let node = test_node(StructureType::Phrase, "a");
        let query = feature_vector(&node, &neutral_emotion());

        assert!(learner.recommend(&query, 5, 0.0).is_empty());
    }

    #[test]
    fn test_accepted_scheme_wins_and_rejected_is_excluded() {
        let mut learner = PreferenceLearner::new(PreferenceConfig::default());
        let node = test_node(StructureType::Phrase, "a");
        let features = feature_vector(&node, &neutral_emotion());

        let liked = scheme("x", ShapeType::Circle, "#e0533d");
        let disliked = scheme("y", ShapeType::Square, "#3d6fe0");

        for _ in 0..3 {
            learner.record(features.clone(), liked.clone(), UserAction::Accept, 0.0);
        }
        learner.record(features.clone(), disliked.clone(), UserAction::Reject, 0.0);

        let recommended = learner.recommend(&features, 5, 1.0);
        assert!(!recommended.is_empty());
        assert_eq!(
            recommended[0].canonical_key(),
            liked.canonical_key(),
            "the accepted scheme must rank first"
        );
        assert!(
            recommended
                .iter()
                .all(|s| s.canonical_key() != disliked.canonical_key()),
            "rejected schemes never come back"
        );
        assert!(recommended[0].from_preference);
        assert_eq!(
            recommended[0].source,
            RecommendationSource::PreferenceLearning
        );
        assert_eq!(recommended[0].match_count, Some(3));
    }

    #[test]
    fn test_recency_decay_prefers_fresh_examples() {
        let mut learner = PreferenceLearner::new(PreferenceConfig::default());
        let node = test_node(StructureType::Phrase, "a");
        let features = feature_vector(&node, &neutral_emotion());

        let stale = scheme("old", ShapeType::Triangle, "#f0b429");
        let fresh = scheme("new", ShapeType::Hexagon, "#29c8f0");

        learner.record(features.clone(), stale.clone(), UserAction::Accept, 0.0);
        learner.record(features.clone(), fresh.clone(), UserAction::Accept, 60.0);

        let recommended = learner.recommend(&features, 2, 60.0);
        assert_eq!(recommended[0].canonical_key(), fresh.canonical_key());
    }

    #[test]
    fn test_modify_reward_ranks_below_accept() {
        let mut learner = PreferenceLearner::new(PreferenceConfig::default());
        let node = test_node(StructureType::Phrase, "a");
        let features = feature_vector(&node, &neutral_emotion());

        let accepted = scheme("a", ShapeType::Circle, "#e0533d");
        let modified = scheme("m", ShapeType::Wave, "#5ad2f2");

        learner.record(features.clone(), modified.clone(), UserAction::Modify, 0.0);
        learner.record(features.clone(), accepted.clone(), UserAction::Accept, 0.0);

        let recommended = learner.recommend(&features, 2, 0.0);
        assert_eq!(recommended[0].canonical_key(), accepted.canonical_key());
        assert_eq!(recommended[1].canonical_key(), modified.canonical_key());
    }

    #[test]
    fn test_weight_adaptation_and_clamping() {
        let config = PreferenceConfig::default();
        let mut learner = PreferenceLearner::new(config.clone());
        let node = test_node(StructureType::Phrase, "a");
        let features = feature_vector(&node, &neutral_emotion());
        let liked = scheme("x", ShapeType::Circle, "#e0533d");

        let initial = learner.weights()[2];
        learner.record(features.clone(), liked.clone(), UserAction::Accept, 0.0);
        assert!((learner.weights()[2] - (initial + config.positive_adjust)).abs() < 1e-6);

        // Saturate upward
        for _ in 0..100 {
            learner.record(features.clone(), liked.clone(), UserAction::Accept, 0.0);
        }
        assert!((learner.weights()[2] - config.weight_max).abs() < 1e-6);

        // Rejections walk the weight back down, clamped at the floor
        for _ in 0..200 {
            learner.record(features.clone(), liked.clone(), UserAction::Reject, 0.0);
        }
        assert!((learner.weights()[2] - config.weight_min).abs() < 1e-6);
    }

    #[test]
    fn test_k_adapts_to_buffer_size() {
        let mut learner = PreferenceLearner::new(PreferenceConfig::default());
        let node = test_node(StructureType::Phrase, "a");
        let features = feature_vector(&node, &neutral_emotion());
        let liked = scheme("x", ShapeType::Circle, "#e0533d");

        assert_eq!(learner.k(), 3);
        for _ in 0..11 {
            learner.record(features.clone(), liked.clone(), UserAction::Accept, 0.0);
        }
        assert_eq!(learner.k(), 5);
        for _ in 0..10 {
            learner.record(features.clone(), liked.clone(), UserAction::Accept, 0.0);
        }
        assert_eq!(learner.k(), 7);
    }

    #[test]
    fn test_clear_empties_the_buffer() {
        let mut learner = PreferenceLearner::new(PreferenceConfig::default());
        let node = test_node(StructureType::Phrase, "a");
        let features = feature_vector(&node, &neutral_emotion());
        let liked = scheme("x", ShapeType::Circle, "#e0533d");

        learner.record(features.clone(), liked.clone(), UserAction::Accept, 0.0);
        learner.record(features.clone(), liked, UserAction::Accept, 0.0);
        assert_eq!(learner.example_count(), 2);

        learner.clear();
        assert_eq!(learner.example_count(), 0);
        assert!(learner.recommend(&features, 5, 0.0).is_empty());
    }
}
