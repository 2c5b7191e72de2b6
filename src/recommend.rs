//! Scheme recommendation: learned preferences first, rules fill the rest

use crate::config::Config;
use crate::emotion::EmotionFeatures;
use crate::preference::{feature_vector, PreferenceExample, PreferenceLearner, UserAction};
use crate::schemes::{generate_schemes, VisualScheme};
use crate::tree::StructureNode;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One entry in the session learning history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningEvent {
    pub action: UserAction,
    pub node_id: String,
    pub scheme_id: String,
    pub timestamp_minutes: f32,
}

/// Per-action counters for the session export
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ActionCounts {
    pub accept: usize,
    pub modify: usize,
    pub reject: usize,
}

/// Session-scoped recommender merging preference-learned and rule-based
/// schemes. The PRNG is seeded from configuration so runs are reproducible.
#[derive(Debug)]
pub struct SchemeRecommender {
    learner: PreferenceLearner,
    rng: StdRng,
    history: Vec<LearningEvent>,
    counts: ActionCounts,
    default_count: usize,
    min_schemes: usize,
}

impl SchemeRecommender {
    pub fn new(config: &Config) -> Self {
        Self {
            learner: PreferenceLearner::new(config.preference.clone()),
            rng: StdRng::seed_from_u64(config.scheme.rng_seed),
            history: Vec::new(),
            counts: ActionCounts::default(),
            default_count: config.scheme.default_count,
            min_schemes: config.scheme.min_schemes,
        }
    }

    pub fn learner(&self) -> &PreferenceLearner {
        &self.learner
    }

    pub fn history(&self) -> &[LearningEvent] {
        &self.history
    }

    pub fn counts(&self) -> ActionCounts {
        self.counts
    }

    /// Ranked scheme suggestions for a node. Learned schemes lead; the
    /// rule-based generator tops the list up to the requested count.
    pub fn recommend(
        &mut self,
        node: &StructureNode,
        emotion: &EmotionFeatures,
        related_materials: &[String],
        count: Option<usize>,
        at_minutes: f32,
    ) -> Vec<VisualScheme> {
        let count = count.unwrap_or(self.default_count);
        let query = feature_vector(node, emotion);

        let mut schemes = self.learner.recommend(&query, count, at_minutes);
        let mut seen: BTreeSet<String> =
            schemes.iter().map(|s| s.canonical_key()).collect();

        let rule_based = generate_schemes(
            node,
            emotion,
            related_materials,
            count,
            self.min_schemes,
            &mut self.rng,
        );
        for scheme in rule_based {
            if schemes.len() >= count.max(self.min_schemes) {
                break;
            }
            if seen.insert(scheme.canonical_key()) {
                schemes.push(scheme);
            }
        }

        schemes
    }

    /// Feed a user decision back into the learner and the session history
    pub fn record_selection(
        &mut self,
        node: &StructureNode,
        emotion: &EmotionFeatures,
        scheme: &VisualScheme,
        action: UserAction,
        at_minutes: f32,
    ) {
        let features = feature_vector(node, emotion);
        self.learner
            .record(features, scheme.clone(), action, at_minutes);

        match action {
            UserAction::Accept => self.counts.accept += 1,
            UserAction::Modify => self.counts.modify += 1,
            UserAction::Reject => self.counts.reject += 1,
        }

        self.history.push(LearningEvent {
            action,
            node_id: node.id.clone(),
            scheme_id: scheme.id.clone(),
            timestamp_minutes: at_minutes,
        });
    }

    /// Restore learner buffer, weights, history, and counters from a
    /// session export
    pub fn restore(
        &mut self,
        config: &Config,
        examples: Vec<PreferenceExample>,
        weights: Vec<f32>,
        history: Vec<LearningEvent>,
        counts: ActionCounts,
    ) {
        self.learner = PreferenceLearner::from_parts(config.preference.clone(), examples, weights);
        self.history = history;
        self.counts = counts;
    }

    /// Drop all learned state (session reset or export)
    pub fn reset(&mut self) {
        self.learner.clear();
        self.history.clear();
        self.counts = ActionCounts::default();
    }
}
