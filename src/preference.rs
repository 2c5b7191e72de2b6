//! Session-local preference learning over a weighted-KNN example buffer
//!
//! Examples accumulate within a session; the buffer travels with session
//! export and import but is never shared between sessions. Scoring combines
//! weighted feature distance, reward, and a per-minute recency decay;
//! feature weights adapt on every recorded selection.

use crate::analysis::{CadenceType, PeriodType};
use crate::config::PreferenceConfig;
use crate::emotion::EmotionFeatures;
use crate::schemes::{RecommendationSource, VisualScheme};
use crate::tree::StructureNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dimension of the preference feature vector
pub const FEATURE_DIM: usize = 23;

const TYPE_SLOTS: std::ops::Range<usize> = 0..6;
const CADENCE_SLOTS: std::ops::Range<usize> = 10..16;
const PERIOD_SLOTS: std::ops::Range<usize> = 16..20;

/// User feedback on a recommended scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserAction {
    Accept,
    Modify,
    Reject,
}

impl UserAction {
    pub fn reward(&self) -> f32 {
        match self {
            UserAction::Accept => 1.0,
            UserAction::Modify => 0.5,
            UserAction::Reject => -1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UserAction::Accept => "accept",
            UserAction::Modify => "modify",
            UserAction::Reject => "reject",
        }
    }
}

/// One recorded selection in the session buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceExample {
    pub features: Vec<f32>,
    pub scheme: VisualScheme,
    pub reward: f32,
    /// Minutes since session start
    pub timestamp_minutes: f32,
}

/// Encode a node plus its emotion profile into the 23-dim feature vector:
/// type one-hot(6), confidence, capped length, material flags(2),
/// cadence one-hot(6), period one-hot(4), tempo/dynamics/tension.
pub fn feature_vector(node: &StructureNode, emotion: &EmotionFeatures) -> Vec<f32> {
    let mut v = vec![0.0f32; FEATURE_DIM];

    v[node.node_type.feature_slot()] = 1.0;
    v[6] = node.confidence;
    v[7] = (node.length() as f32 / 16.0).min(1.0);
    v[8] = if node.material.contains('\'') { 1.0 } else { 0.0 };
    v[9] = if node.material.chars().count() > 1 { 1.0 } else { 0.0 };

    if let Some(cadence) = node.features.cadence {
        let slot = match cadence {
            CadenceType::PerfectAuthentic => 10,
            CadenceType::ImperfectAuthentic => 11,
            CadenceType::Half => 12,
            CadenceType::Deceptive => 13,
            CadenceType::Plagal => 14,
            CadenceType::Phrygian => 15,
        };
        v[slot] = 1.0;
    }

    if let Some(period_type) = node.features.period_type {
        let slot = match period_type {
            PeriodType::Parallel => 16,
            PeriodType::Contrasting => 17,
            PeriodType::Sequential => 18,
            PeriodType::ThreePhrase | PeriodType::FourPhrase | PeriodType::Compound => 19,
        };
        v[slot] = 1.0;
    }

    v[20] = emotion.tempo.value();
    v[21] = emotion.dynamics.value();
    v[22] = emotion.tension.value();

    v
}

/// Weighted-KNN learner over the session example buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceLearner {
    examples: Vec<PreferenceExample>,
    weights: Vec<f32>,
    config: PreferenceConfig,
}

impl PreferenceLearner {
    pub fn new(config: PreferenceConfig) -> Self {
        Self {
            examples: Vec::new(),
            weights: initial_weights(),
            config,
        }
    }

    /// Rebuild a learner from exported session state. A weight vector of
    /// the wrong dimension falls back to the initial table.
    pub fn from_parts(
        config: PreferenceConfig,
        examples: Vec<PreferenceExample>,
        weights: Vec<f32>,
    ) -> Self {
        let weights = if weights.len() == FEATURE_DIM {
            weights
        } else {
            initial_weights()
        };
        Self {
            examples,
            weights,
            config,
        }
    }

    pub fn example_count(&self) -> usize {
        self.examples.len()
    }

    pub fn examples(&self) -> &[PreferenceExample] {
        &self.examples
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Neighbourhood size adapts to buffer growth
    pub fn k(&self) -> usize {
        if self.examples.len() > 20 {
            7
        } else if self.examples.len() > 10 {
            5
        } else {
            3
        }
    }

    /// Record a selection, then adapt the feature weights toward (or away
    /// from) the selected node profile
    pub fn record(
        &mut self,
        features: Vec<f32>,
        scheme: VisualScheme,
        action: UserAction,
        at_minutes: f32,
    ) {
        let reward = action.reward();
        self.adapt_weights(&features, reward);
        self.examples.push(PreferenceExample {
            features,
            scheme,
            reward,
            timestamp_minutes: at_minutes,
        });
    }

    /// Top scheme groups for a query vector, or empty while the buffer is
    /// too small for meaningful neighbours
    pub fn recommend(&self, query: &[f32], count: usize, at_minutes: f32) -> Vec<VisualScheme> {
        if self.examples.len() < self.config.min_examples_for_recommendation {
            return Vec::new();
        }

        // Score positively rewarded examples by proximity and freshness
        let mut scored: Vec<(f32, &PreferenceExample)> = self
            .examples
            .iter()
            .filter(|e| e.reward > 0.0)
            .map(|example| {
                let distance = self.weighted_distance(query, &example.features);
                let age = (at_minutes - example.timestamp_minutes).max(0.0);
                let recency = self.config.recency_decay_per_minute.powf(age);
                let combined = (1.0 / (distance + 0.1)) * example.reward * recency;
                (combined, example)
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.k());

        // Group by canonical scheme identity, summing combined scores
        let mut groups: BTreeMap<String, (f32, usize, &VisualScheme)> = BTreeMap::new();
        for (combined, example) in &scored {
            let key = example.scheme.canonical_key();
            let entry = groups.entry(key).or_insert((0.0, 0, &example.scheme));
            entry.0 += combined;
            entry.1 += 1;
        }

        let mut ranked: Vec<(f32, usize, &VisualScheme)> = groups.into_values().collect();
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(count);

        ranked
            .into_iter()
            .map(|(score, matches, scheme)| {
                let mut scheme = scheme.clone();
                scheme.source = RecommendationSource::PreferenceLearning;
                scheme.from_preference = true;
                scheme.preference_score = Some(score);
                scheme.match_count = Some(matches);
                scheme
            })
            .collect()
    }

    /// Reset the buffer on session reset or export
    pub fn clear(&mut self) {
        self.examples.clear();
    }

    fn weighted_distance(&self, a: &[f32], b: &[f32]) -> f32 {
        let mut sum = 0.0f32;
        for i in 0..FEATURE_DIM.min(a.len()).min(b.len()) {
            let diff = a[i] - b[i];
            sum += self.weights[i] * diff * diff;
        }
        sum.sqrt()
    }

    /// Nudge the categorical buckets active in this selection
    fn adapt_weights(&mut self, features: &[f32], reward: f32) {
        let adjust = if reward > 0.0 {
            self.config.positive_adjust
        } else {
            -self.config.negative_adjust
        };

        for range in [TYPE_SLOTS, CADENCE_SLOTS, PERIOD_SLOTS] {
            for i in range {
                if features.get(i).copied().unwrap_or(0.0) > 0.0 {
                    self.weights[i] = (self.weights[i] + adjust)
                        .clamp(self.config.weight_min, self.config.weight_max);
                }
            }
        }
    }
}

/// Initial per-feature weights
fn initial_weights() -> Vec<f32> {
    let mut w = vec![0.0f32; FEATURE_DIM];
    for i in TYPE_SLOTS {
        w[i] = 1.0;
    }
    w[6] = 0.5; // confidence
    w[7] = 0.8; // duration
    w[8] = 0.7; // material prime flag
    w[9] = 0.7; // material compound flag
    for i in CADENCE_SLOTS {
        w[i] = 0.9;
    }
    for i in PERIOD_SLOTS {
        w[i] = 0.8;
    }
    w[20] = 0.6; // tempo
    w[21] = 0.6; // dynamics
    w[22] = 0.7; // tension
    w
}
