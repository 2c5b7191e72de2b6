//! Analysis session: owns the score, the tree, the recommender state, and
//! the JSON-friendly export/import layout
//!
//! Import rebuilds the node graph in two passes: create every node first,
//! then link parents and children by their string ids.

use crate::alignment::{align_score, AlignmentResult};
use crate::analysis::{build_full_analysis, Cadence, FormAnalysis, FullAnalysis, Period, Phrase};
use crate::chunking;
use crate::config::Config;
use crate::emotion::{emotion_for_node, AudioSnapshot, EmotionFeatures};
use crate::error::{Result as ScoreResult, ScoreError};
use crate::preference::{PreferenceExample, UserAction};
use crate::recommend::{ActionCounts, LearningEvent, SchemeRecommender};
use crate::schemes::VisualScheme;
use crate::score::{validate_score, AudioFeatures, ParsedScore};
use crate::tree::{
    NodeFeatures, NodeId, StructureNode, StructureTree, StructureType, TooltipData, VisualStyle,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Export format version
pub const EXPORT_VERSION: &str = "1.0.0";

/// One user session over a single score
#[derive(Debug)]
pub struct AnalysisSession {
    pub session_id: String,
    /// Seconds since the Unix epoch
    pub created_at: f64,
    config: Config,
    pub score: ParsedScore,
    pub audio: Option<AudioFeatures>,
    pub analysis: Option<FullAnalysis>,
    pub alignment: Option<AlignmentResult>,
    pub recommender: SchemeRecommender,
    pub visual_mappings: BTreeMap<String, VisualScheme>,
}

impl AnalysisSession {
    /// Create a session stamped with the current wall clock
    pub fn new(score: ParsedScore, config: &Config) -> ScoreResult<Self> {
        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let session_id = format!("session-{}", created_at as u64);
        Self::with_id(score, config, session_id, created_at)
    }

    /// Create a session with explicit identity (tests, import)
    pub fn with_id(
        score: ParsedScore,
        config: &Config,
        session_id: String,
        created_at: f64,
    ) -> ScoreResult<Self> {
        validate_score(&score)?;
        Ok(Self {
            session_id,
            created_at,
            config: config.clone(),
            score,
            audio: None,
            analysis: None,
            alignment: None,
            recommender: SchemeRecommender::new(config),
            visual_mappings: BTreeMap::new(),
        })
    }

    /// Run the analysis pipeline (chunked automatically for long scores)
    pub fn analyze(&mut self) -> ScoreResult<&FullAnalysis> {
        let state = chunking::analyze(self.score.clone(), &self.config)?;
        self.analysis = Some(build_full_analysis(&state));
        Ok(self.analysis.as_ref().unwrap())
    }

    /// Attach decoded audio and compute the score/audio alignment
    pub fn align_audio(&mut self, audio: AudioFeatures) -> &AlignmentResult {
        let alignment = align_score(&self.score, &audio, &self.config.alignment);
        self.audio = Some(audio);
        self.alignment = Some(alignment);
        self.alignment.as_ref().unwrap()
    }

    /// Scheme suggestions for a node, learned preferences first
    pub fn recommend(
        &mut self,
        node_id: &str,
        count: Option<usize>,
        at_minutes: f32,
    ) -> ScoreResult<Vec<VisualScheme>> {
        let (node, emotion, related) = self.node_context(node_id)?;
        Ok(self
            .recommender
            .recommend(&node, &emotion, &related, count, at_minutes))
    }

    /// Record a user decision; accepted and modified schemes become the
    /// node's visual mapping
    pub fn record_selection(
        &mut self,
        node_id: &str,
        scheme: &VisualScheme,
        action: UserAction,
        at_minutes: f32,
    ) -> ScoreResult<()> {
        let (node, emotion, _) = self.node_context(node_id)?;
        self.recommender
            .record_selection(&node, &emotion, scheme, action, at_minutes);

        match action {
            UserAction::Accept | UserAction::Modify => {
                self.visual_mappings
                    .insert(node_id.to_string(), scheme.clone());
            }
            UserAction::Reject => {}
        }
        Ok(())
    }

    /// Drop analysis results and all learned state
    pub fn reset(&mut self) {
        self.analysis = None;
        self.visual_mappings.clear();
        self.recommender.reset();
    }

    fn tree(&self) -> ScoreResult<&StructureTree> {
        self.analysis
            .as_ref()
            .map(|a| &a.tree)
            .ok_or_else(|| ScoreError::SessionError("session has no analysis yet".to_string()))
    }

    /// Node clone, emotion profile, and sibling materials for recommendation
    fn node_context(
        &self,
        node_id: &str,
    ) -> ScoreResult<(StructureNode, EmotionFeatures, Vec<String>)> {
        let tree = self.tree()?;
        let id = tree
            .find_by_string_id(node_id)
            .ok_or_else(|| ScoreError::UnknownNode(node_id.to_string()))?;
        let node = tree.get(id).unwrap().clone();

        let related: Vec<String> = node
            .parent
            .and_then(|p| tree.get(p))
            .map(|parent| {
                parent
                    .children
                    .iter()
                    .filter(|&&c| c != id)
                    .filter_map(|&c| tree.get(c))
                    .map(|sibling| sibling.material.clone())
                    .collect()
            })
            .unwrap_or_default();

        let snapshot = self.audio_snapshot(&node);
        let emotion = emotion_for_node(&node, snapshot.as_ref(), &self.config.emotion);
        Ok((node, emotion, related))
    }

    /// RMS and centroid sampled at the node's aligned start time
    fn audio_snapshot(&self, node: &StructureNode) -> Option<AudioSnapshot> {
        let audio = self.audio.as_ref()?;
        let alignment = self.alignment.as_ref()?;
        if audio.timestamps.is_empty() {
            return None;
        }

        let time = alignment.measure_to_time(node.start_measure);
        let frame = audio
            .timestamps
            .iter()
            .position(|&t| t >= time)
            .unwrap_or(audio.timestamps.len() - 1);

        Some(AudioSnapshot {
            rms: audio.rms.get(frame).copied().unwrap_or(0.0),
            spectral_centroid: audio.spectral_centroid.get(frame).copied().unwrap_or(0.0),
        })
    }

    /// Serialise the session to the persisted-state layout
    pub fn export(&self) -> ScoreResult<SessionExport> {
        let structure = match &self.analysis {
            Some(analysis) => {
                let tree = &analysis.tree;
                let mut nodes = BTreeMap::new();
                for node in tree.nodes() {
                    nodes.insert(
                        node.id.clone(),
                        NodeExport {
                            node_type: node.node_type,
                            start_measure: node.start_measure,
                            end_measure: node.end_measure,
                            material: node.material.clone(),
                            confidence: node.confidence,
                            detect_confidence: node.detect_confidence,
                            features: node.features.clone(),
                            visual_style: node.visual_style,
                            tooltip: node.tooltip.clone(),
                            parent: node
                                .parent
                                .and_then(|p| tree.get(p))
                                .map(|p| p.id.clone()),
                            children: node
                                .children
                                .iter()
                                .filter_map(|&c| tree.get(c))
                                .map(|c| c.id.clone())
                                .collect(),
                        },
                    );
                }
                Some(StructureExport {
                    root: tree.get(tree.root()).map(|n| n.id.clone()).unwrap_or_default(),
                    nodes,
                    form_analysis: Some(analysis.form.clone()),
                    cadences: analysis.cadences.clone(),
                    phrases: analysis.phrases.clone(),
                    periods: analysis.periods.clone(),
                })
            }
            None => None,
        };

        let counts = self.recommender.counts();
        Ok(SessionExport {
            version: EXPORT_VERSION.to_string(),
            session: SessionMeta {
                session_id: self.session_id.clone(),
                created_at: self.created_at,
                parsed_score: self.score.clone(),
                audio_features: self.audio.clone(),
                alignment: self.alignment.as_ref().map(|a| AlignmentExport {
                    measure_to_time: a.measure_to_time.clone(),
                    confidence: a.confidence,
                }),
            },
            structure,
            visual_mappings: self.visual_mappings.clone(),
            preferences: PreferencesExport {
                example_count: self.recommender.learner().example_count(),
                accept_count: counts.accept,
                modify_count: counts.modify,
                reject_count: counts.reject,
                learning_history: self.recommender.history().to_vec(),
                examples: self.recommender.learner().examples().to_vec(),
                weights: self.recommender.learner().weights().to_vec(),
            },
        })
    }

    /// Rebuild a session from an export. The node graph is reconstructed in
    /// two passes (create all, then link by id).
    pub fn import(export: &SessionExport, config: &Config) -> ScoreResult<Self> {
        let mut session = Self::with_id(
            export.session.parsed_score.clone(),
            config,
            export.session.session_id.clone(),
            export.session.created_at,
        )?;

        if let Some(audio) = &export.session.audio_features {
            session.align_audio(audio.clone());
        }

        if let Some(structure) = &export.structure {
            let tree = rebuild_tree(structure)?;
            let mut state = crate::score::ScoreState::new(session.score.clone(), config)?;
            state.cadences = structure.cadences.clone();
            state.phrases = structure.phrases.clone();
            state.periods = structure.periods.clone();
            state.form = structure.form_analysis.clone();
            state.tree = Some(tree);
            session.analysis = Some(build_full_analysis(&state));
        }

        session.visual_mappings = export.visual_mappings.clone();

        // Preference state comes back verbatim: buffer, adapted weights,
        // history, and per-action counters
        session.recommender.restore(
            config,
            export.preferences.examples.clone(),
            export.preferences.weights.clone(),
            export.preferences.learning_history.clone(),
            ActionCounts {
                accept: export.preferences.accept_count,
                modify: export.preferences.modify_count,
                reject: export.preferences.reject_count,
            },
        );
        Ok(session)
    }
}

/// Two-pass node graph reconstruction
fn rebuild_tree(structure: &StructureExport) -> ScoreResult<StructureTree> {
    // Pass 1: create every node, assigning arena slots in key order
    let mut index_of: BTreeMap<&str, NodeId> = BTreeMap::new();
    let mut nodes: Vec<StructureNode> = Vec::with_capacity(structure.nodes.len());

    for (string_id, export) in &structure.nodes {
        index_of.insert(string_id.as_str(), nodes.len());
        nodes.push(StructureNode {
            id: string_id.clone(),
            node_type: export.node_type,
            start_measure: export.start_measure,
            end_measure: export.end_measure,
            parent: None,
            children: Vec::new(),
            material: export.material.clone(),
            confidence: export.confidence,
            detect_confidence: export.detect_confidence,
            features: export.features.clone(),
            visual_style: export.visual_style,
            tooltip: export.tooltip.clone(),
            interval_head: Vec::new(),
        });
    }

    // Pass 2: link parents and children through the id map
    for (string_id, export) in &structure.nodes {
        let id = index_of[string_id.as_str()];
        if let Some(parent_id) = &export.parent {
            nodes[id].parent = index_of.get(parent_id.as_str()).copied();
        }
        nodes[id].children = export
            .children
            .iter()
            .filter_map(|c| index_of.get(c.as_str()).copied())
            .collect();
    }

    let root = index_of
        .get(structure.root.as_str())
        .copied()
        .ok_or_else(|| ScoreError::SessionError("export root node missing".to_string()))?;
    Ok(StructureTree::from_parts(nodes, root))
}

/// Persisted-state layout, JSON-friendly
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    pub version: String,
    pub session: SessionMeta,
    pub structure: Option<StructureExport>,
    pub visual_mappings: BTreeMap<String, VisualScheme>,
    pub preferences: PreferencesExport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub session_id: String,
    pub created_at: f64,
    pub parsed_score: ParsedScore,
    pub audio_features: Option<AudioFeatures>,
    pub alignment: Option<AlignmentExport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentExport {
    pub measure_to_time: BTreeMap<u32, f32>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureExport {
    pub root: String,
    pub nodes: BTreeMap<String, NodeExport>,
    pub form_analysis: Option<FormAnalysis>,
    pub cadences: Vec<Cadence>,
    pub phrases: Vec<Phrase>,
    pub periods: Vec<Period>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExport {
    pub node_type: StructureType,
    pub start_measure: u32,
    pub end_measure: u32,
    pub material: String,
    pub confidence: f32,
    pub detect_confidence: f32,
    pub features: NodeFeatures,
    pub visual_style: VisualStyle,
    pub tooltip: TooltipData,
    pub parent: Option<String>,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesExport {
    pub example_count: usize,
    pub accept_count: usize,
    pub modify_count: usize,
    pub reject_count: usize,
    pub learning_history: Vec<LearningEvent>,
    pub examples: Vec<PreferenceExample>,
    pub weights: Vec<f32>,
}

/// Write an export to disk as pretty JSON
pub fn save_session<P: AsRef<std::path::Path>>(
    export: &SessionExport,
    path: P,
) -> ScoreResult<()> {
    let json = serde_json::to_string_pretty(export)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read an export back from disk
pub fn load_session<P: AsRef<std::path::Path>>(path: P) -> ScoreResult<SessionExport> {
    let content = std::fs::read_to_string(path)?;
    let export: SessionExport = serde_json::from_str(&content)?;
    Ok(export)
}
