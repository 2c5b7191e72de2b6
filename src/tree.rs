//! Arena-allocated structure tree with editing operations
//!
//! Nodes are owned by the tree and addressed by index; parent links are
//! non-owning back-references. User edits go through the update methods,
//! which trade confidence for manual intervention but never re-run detection.

use crate::analysis::{
    CadenceType, Closure, FormType, MiddleSectionType, PeriodType, PhraseRelationship, Proportion,
    SectionFunction,
};
use crate::config::TreeConfig;
use crate::error::{Result as ScoreResult, ScoreError};
use serde::{Deserialize, Serialize};

/// Index of a node within the tree arena
pub type NodeId = usize;

/// Hierarchy level of a structure node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureType {
    Motive,
    SubPhrase,
    Phrase,
    Period,
    Theme,
    Section,
}

impl StructureType {
    pub fn name(&self) -> &'static str {
        match self {
            StructureType::Motive => "motive",
            StructureType::SubPhrase => "sub_phrase",
            StructureType::Phrase => "phrase",
            StructureType::Period => "period",
            StructureType::Theme => "theme",
            StructureType::Section => "section",
        }
    }

    /// One-hot slot used by the preference feature vector
    pub fn feature_slot(&self) -> usize {
        match self {
            StructureType::Motive => 0,
            StructureType::SubPhrase => 1,
            StructureType::Phrase => 2,
            StructureType::Period => 3,
            StructureType::Theme => 4,
            StructureType::Section => 5,
        }
    }
}

/// Border rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

/// Uncertainty bucket, ordered low to very high
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UncertaintyLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// Rendering hints derived from confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualStyle {
    pub line_style: LineStyle,
    pub opacity: f32,
    pub border_width: u32,
    pub uncertainty: UncertaintyLevel,
}

impl VisualStyle {
    /// Style table keyed on final node confidence
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence >= 0.8 {
            Self {
                line_style: LineStyle::Solid,
                opacity: 1.0,
                border_width: 2,
                uncertainty: UncertaintyLevel::Low,
            }
        } else if confidence >= 0.6 {
            Self {
                line_style: LineStyle::Solid,
                opacity: 0.85,
                border_width: 2,
                uncertainty: UncertaintyLevel::Medium,
            }
        } else if confidence >= 0.4 {
            Self {
                line_style: LineStyle::Dashed,
                opacity: 0.7,
                border_width: 1,
                uncertainty: UncertaintyLevel::High,
            }
        } else {
            Self {
                line_style: LineStyle::Dotted,
                opacity: 0.5,
                border_width: 1,
                uncertainty: UncertaintyLevel::VeryHigh,
            }
        }
    }
}

/// Role-specific optional features carried by a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFeatures {
    pub cadence: Option<CadenceType>,
    pub closure: Option<Closure>,
    pub period_type: Option<PeriodType>,
    pub proportion: Option<Proportion>,
    pub relationship: Option<PhraseRelationship>,
    pub function: Option<SectionFunction>,
    pub middle_type: Option<MiddleSectionType>,
    pub form_type: Option<FormType>,
    pub similarity: Option<f32>,
}

/// Hover payload for the UI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TooltipData {
    pub title: String,
    pub used_features: Vec<String>,
    pub similarity: Option<f32>,
    pub details: Vec<String>,
    pub model_version: String,
}

/// One node of the structure hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureNode {
    /// Stable string id used by serialisation and the UI
    pub id: String,
    pub node_type: StructureType,
    pub start_measure: u32,
    pub end_measure: u32,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub material: String,
    /// Final confidence after propagation
    pub confidence: f32,
    /// Raw detector confidence before propagation
    pub detect_confidence: f32,
    pub features: NodeFeatures,
    pub visual_style: VisualStyle,
    pub tooltip: TooltipData,
    /// Interval head used by the material relabel pass
    pub interval_head: Vec<f32>,
}

impl StructureNode {
    pub fn length(&self) -> u32 {
        self.end_measure - self.start_measure + 1
    }
}

/// Arena tree over structure nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureTree {
    nodes: Vec<StructureNode>,
    root: NodeId,
}

impl StructureTree {
    /// Create a tree seeded with a root node
    pub fn with_root(mut root_node: StructureNode) -> Self {
        root_node.parent = None;
        Self {
            nodes: vec![root_node],
            root: 0,
        }
    }

    /// Rebuild a tree from pre-linked nodes (session import)
    pub fn from_parts(nodes: Vec<StructureNode>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&StructureNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut StructureNode> {
        self.nodes.get_mut(id)
    }

    /// Look up a node by its stable string id
    pub fn find_by_string_id(&self, id: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Append a child under `parent`, returning its arena index
    pub fn add_child(&mut self, parent: NodeId, mut node: StructureNode) -> NodeId {
        let id = self.nodes.len();
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }

    /// All node indices in arena order (stable across runs)
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.nodes.len()
    }

    pub fn nodes(&self) -> &[StructureNode] {
        &self.nodes
    }

    /// Post-order traversal from the root
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        self.post_order_visit(self.root, &mut order);
        order
    }

    fn post_order_visit(&self, id: NodeId, order: &mut Vec<NodeId>) {
        for &child in &self.nodes[id].children {
            self.post_order_visit(child, order);
        }
        order.push(id);
    }

    /// Move a node's measure boundaries. Costs confidence; never re-detects.
    pub fn update_boundaries(
        &mut self,
        id: NodeId,
        start_measure: u32,
        end_measure: u32,
        config: &TreeConfig,
    ) -> ScoreResult<()> {
        if start_measure > end_measure {
            return Err(ScoreError::InputValidationError(format!(
                "start measure {} after end measure {}",
                start_measure, end_measure
            )));
        }
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ScoreError::UnknownNode(id.to_string()))?;
        if node.start_measure == start_measure && node.end_measure == end_measure {
            return Ok(());
        }
        node.start_measure = start_measure;
        node.end_measure = end_measure;
        Self::apply_edit_penalty(node, config);
        Ok(())
    }

    /// Reclassify a node's structural type
    pub fn update_type(
        &mut self,
        id: NodeId,
        node_type: StructureType,
        config: &TreeConfig,
    ) -> ScoreResult<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ScoreError::UnknownNode(id.to_string()))?;
        if node.node_type == node_type {
            return Ok(());
        }
        node.node_type = node_type;
        Self::apply_edit_penalty(node, config);
        Ok(())
    }

    /// Relabel a node's material. Idempotent for an unchanged label.
    pub fn update_material(
        &mut self,
        id: NodeId,
        material: &str,
        config: &TreeConfig,
    ) -> ScoreResult<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ScoreError::UnknownNode(id.to_string()))?;
        if node.material == material {
            return Ok(());
        }
        node.material = material.to_string();
        Self::apply_edit_penalty(node, config);
        Ok(())
    }

    fn apply_edit_penalty(node: &mut StructureNode, config: &TreeConfig) {
        node.confidence = (node.confidence - config.edit_decrement).max(config.edit_floor);
        node.visual_style = VisualStyle::from_confidence(node.confidence);
    }
}
