//! Emotion feature extraction from structure nodes and optional audio

use crate::analysis::{CadenceType, Closure};
use crate::config::EmotionConfig;
use crate::tree::{StructureNode, StructureType};
use serde::{Deserialize, Serialize};

/// Perceived pace of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempoFeel {
    Fast,
    Moderate,
    Slow,
}

impl TempoFeel {
    /// Numeric encoding used by the preference feature vector
    pub fn value(&self) -> f32 {
        match self {
            TempoFeel::Slow => 0.0,
            TempoFeel::Moderate => 0.5,
            TempoFeel::Fast => 1.0,
        }
    }
}

/// Perceived dynamic level of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicsLevel {
    Strong,
    Moderate,
    Soft,
}

impl DynamicsLevel {
    pub fn value(&self) -> f32 {
        match self {
            DynamicsLevel::Soft => 0.0,
            DynamicsLevel::Moderate => 0.5,
            DynamicsLevel::Strong => 1.0,
        }
    }
}

/// Harmonic tension of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensionLevel {
    Tense,
    Neutral,
    Relaxed,
}

impl TensionLevel {
    pub fn value(&self) -> f32 {
        match self {
            TensionLevel::Relaxed => 0.0,
            TensionLevel::Neutral => 0.5,
            TensionLevel::Tense => 1.0,
        }
    }
}

/// Emotion profile attached to a scheme recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionFeatures {
    pub tempo: TempoFeel,
    pub dynamics: DynamicsLevel,
    pub tension: TensionLevel,
}

/// Per-frame audio scalars sampled at the node's position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioSnapshot {
    pub rms: f32,
    pub spectral_centroid: f32,
}

/// Derive emotion features for a node; audio scalars override the
/// node-derived dynamics and tension when supplied.
pub fn emotion_for_node(
    node: &StructureNode,
    audio: Option<&AudioSnapshot>,
    config: &EmotionConfig,
) -> EmotionFeatures {
    let duration = node.length().max(1) as f32;
    let density = node.children.len() as f32 / duration;

    let tempo = if density > config.fast_density {
        TempoFeel::Fast
    } else if density < config.slow_density {
        TempoFeel::Slow
    } else {
        TempoFeel::Moderate
    };

    let mut dynamics = match node.node_type {
        StructureType::Motive | StructureType::SubPhrase => DynamicsLevel::Soft,
        StructureType::Phrase | StructureType::Period => DynamicsLevel::Moderate,
        StructureType::Theme | StructureType::Section => DynamicsLevel::Strong,
    };

    let mut tension = node_tension(node);

    if let Some(snapshot) = audio {
        if snapshot.rms > config.rms_strong {
            dynamics = DynamicsLevel::Strong;
        } else if snapshot.rms < config.rms_soft {
            dynamics = DynamicsLevel::Soft;
        }
        if snapshot.spectral_centroid > config.centroid_tense_hz {
            tension = TensionLevel::Tense;
        } else if snapshot.spectral_centroid < config.centroid_relaxed_hz {
            tension = TensionLevel::Relaxed;
        }
    }

    EmotionFeatures {
        tempo,
        dynamics,
        tension,
    }
}

fn node_tension(node: &StructureNode) -> TensionLevel {
    match node.features.cadence {
        Some(CadenceType::PerfectAuthentic) => return TensionLevel::Relaxed,
        Some(CadenceType::Half) | Some(CadenceType::Deceptive) => return TensionLevel::Tense,
        _ => {}
    }
    match node.features.closure {
        Some(Closure::Closed) => TensionLevel::Relaxed,
        Some(Closure::Open) => TensionLevel::Tense,
        None => TensionLevel::Neutral,
    }
}
