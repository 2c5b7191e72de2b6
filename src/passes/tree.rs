//! Hierarchy assembly, confidence propagation, and material relabelling

use crate::analysis::{Period, Phrase};
use crate::config::Config;
use crate::error::Result as ScoreResult;
use crate::score::{Note, ParsedScore, ScoreState};
use crate::tree::{
    NodeFeatures, NodeId, StructureNode, StructureTree, StructureType, TooltipData, VisualStyle,
};

/// Assemble the structure tree and store it on the state
pub fn run(state: &mut ScoreState, config: &Config) -> ScoreResult<()> {
    state.tree = Some(build_hierarchy(state, config));
    Ok(())
}

/// Build the Section -> Theme -> Period -> Phrase -> SubPhrase -> Motive
/// hierarchy, propagate confidence bottom-up, and run the relabel pass.
pub fn build_hierarchy(state: &ScoreState, config: &Config) -> StructureTree {
    let score = &state.score;
    let first = score.first_measure().unwrap_or(1);
    let last = score.last_measure().unwrap_or(first);

    let mut builder = NodeBuilder::default();
    let mut root_features = NodeFeatures::default();
    if let Some(form) = &state.form {
        root_features.form_type = Some(form.form_type);
    }
    let root_node = builder.node(
        StructureType::Section,
        first,
        last,
        String::new(),
        config.tree.root_confidence,
        root_features,
        score,
    );
    let mut tree = StructureTree::with_root(root_node);
    let root = tree.root();

    if let Some(form) = &state.form {
        for section in &form.sections {
            let mut features = NodeFeatures::default();
            features.function = Some(section.function);
            features.middle_type = section.middle_type;
            let theme_node = builder.node(
                StructureType::Theme,
                section.start_measure,
                section.end_measure,
                section.section_type.to_lowercase(),
                form.confidence,
                features,
                score,
            );
            let theme_id = tree.add_child(root, theme_node);

            for &period_idx in &section.periods {
                if let Some(period) = state.periods.get(period_idx) {
                    add_period(&mut tree, theme_id, period, &mut builder, score, config);
                }
            }
        }
    }

    propagate_confidence(&mut tree, config);
    relabel_materials(&mut tree, config);
    refresh_styles_and_tooltips(&mut tree);
    tree
}

fn add_period(
    tree: &mut StructureTree,
    parent: NodeId,
    period: &Period,
    builder: &mut NodeBuilder,
    score: &ParsedScore,
    config: &Config,
) {
    let mut features = NodeFeatures::default();
    features.period_type = Some(period.period_type);
    features.proportion = Some(period.proportion);
    features.closure = Some(period.closure);
    features.cadence = period.cadence.as_ref().map(|c| c.cadence_type);

    let detect = period
        .cadence
        .as_ref()
        .map(|c| c.confidence)
        .unwrap_or(0.7);
    let period_node = builder.node(
        StructureType::Period,
        period.start_measure,
        period.end_measure,
        period.material.clone(),
        detect,
        features,
        score,
    );
    let period_id = tree.add_child(parent, period_node);

    for phrase in &period.phrases {
        add_phrase(tree, period_id, phrase, builder, score, config);
    }
}

fn add_phrase(
    tree: &mut StructureTree,
    parent: NodeId,
    phrase: &Phrase,
    builder: &mut NodeBuilder,
    score: &ParsedScore,
    config: &Config,
) {
    let mut features = NodeFeatures::default();
    features.cadence = phrase.cadence.as_ref().map(|c| c.cadence_type);
    features.closure = Some(phrase.closure);
    features.relationship = phrase.relationship;
    features.similarity = phrase.head_similarity;

    let detect = phrase
        .cadence
        .as_ref()
        .map(|c| c.confidence)
        .unwrap_or(0.65);
    let phrase_node = builder.node(
        StructureType::Phrase,
        phrase.start_measure,
        phrase.end_measure,
        phrase.material.clone(),
        detect,
        features,
        score,
    );
    let phrase_id = tree.add_child(parent, phrase_node);

    // Long phrases derive two halves; short ones take detected sub-phrases
    if phrase.length() >= config.tree.sub_phrase_split_min {
        let mid = phrase.start_measure + phrase.length() / 2 - 1;
        let halves = [
            (phrase.start_measure, mid, format!("{}\u{2081}", phrase.material)),
            (mid + 1, phrase.end_measure, format!("{}\u{2082}", phrase.material)),
        ];
        for (start, end, material) in halves {
            let sub_node = builder.node(
                StructureType::SubPhrase,
                start,
                end,
                material,
                0.7,
                NodeFeatures::default(),
                score,
            );
            let sub_id = tree.add_child(phrase_id, sub_node);
            add_motive_windows(tree, sub_id, start, end, builder, score);
        }
    } else {
        for sub in &phrase.sub_phrases {
            let mut sub_features = NodeFeatures::default();
            sub_features.similarity = sub.similarity;
            let detect = sub.similarity.map(|s| 0.6 + 0.2 * s).unwrap_or(0.7);
            let sub_node = builder.node(
                StructureType::SubPhrase,
                sub.start_measure,
                sub.end_measure,
                sub.material.clone(),
                detect,
                sub_features,
                score,
            );
            let sub_id = tree.add_child(phrase_id, sub_node);
            add_motive_windows(tree, sub_id, sub.start_measure, sub.end_measure, builder, score);
        }
    }
}

/// Motive-level windows: 1-measure stride under short parents, 2 otherwise
fn add_motive_windows(
    tree: &mut StructureTree,
    parent: NodeId,
    start_measure: u32,
    end_measure: u32,
    builder: &mut NodeBuilder,
    score: &ParsedScore,
) {
    let parent_len = end_measure - start_measure + 1;
    let stride = if parent_len <= 2 { 1 } else { 2 };
    let parent_material = tree.get(parent).map(|n| n.material.clone()).unwrap_or_default();

    let mut window_start = start_measure;
    while window_start <= end_measure {
        let window_end = (window_start + stride - 1).min(end_measure);
        if notes_in_range(score, window_start, window_end).is_empty() {
            window_start = window_end + 1;
            continue;
        }
        let motive_node = builder.node(
            StructureType::Motive,
            window_start,
            window_end,
            parent_material.clone(),
            0.6,
            NodeFeatures::default(),
            score,
        );
        tree.add_child(parent, motive_node);
        window_start = window_end + 1;
    }
}

/// Post-order propagation: blend detector confidence with the children's
/// mean, reward cadential support, clamp into [0, 1].
fn propagate_confidence(tree: &mut StructureTree, config: &Config) {
    for id in tree.post_order() {
        let node = tree.get(id).unwrap();
        let detect = node.detect_confidence;
        let has_cadence = node.features.cadence.is_some();
        let children = node.children.clone();

        let mut confidence = if children.is_empty() {
            detect
        } else {
            let child_mean: f32 = children
                .iter()
                .map(|&c| tree.get(c).unwrap().confidence)
                .sum::<f32>()
                / children.len() as f32;
            (detect + child_mean) / 2.0
        };

        if has_cadence {
            confidence += config.tree.cadence_bonus;
        }
        confidence = confidence.clamp(0.0, 1.0);

        tree.get_mut(id).unwrap().confidence = confidence;
    }
}

/// Append a prime to nodes whose interval head repeats an earlier
/// same-level node that carries the same label. Recurrences the detectors
/// already marked (a', av) keep their labels.
fn relabel_materials(tree: &mut StructureTree, config: &Config) {
    let mut registered: Vec<(StructureType, Vec<f32>, String)> = Vec::new();

    for id in tree.ids().collect::<Vec<_>>() {
        let node = tree.get(id).unwrap();
        if id == tree.root() || node.interval_head.is_empty() {
            continue;
        }
        let node_type = node.node_type;
        let head = node.interval_head.clone();
        let material = node.material.clone();

        let matched = registered
            .iter()
            .find(|(t, earlier, _)| *t == node_type && heads_match(earlier, &head, config))
            .map(|(_, _, m)| m.clone());

        match matched {
            Some(earlier_material) if earlier_material == material => {
                let node = tree.get_mut(id).unwrap();
                node.material.push('\'');
            }
            Some(_) => {}
            None => registered.push((node_type, head, material)),
        }
    }
}

fn heads_match(a: &[f32], b: &[f32], config: &Config) -> bool {
    let len = a.len().min(b.len());
    if len == 0 {
        return false;
    }
    let close = a
        .iter()
        .zip(b.iter())
        .filter(|(x, y)| (*x - *y).abs() <= config.tree.relabel_tolerance)
        .count();
    close as f32 / len as f32 > config.tree.relabel_match_ratio
}

/// Final styles and tooltips from the propagated confidences
fn refresh_styles_and_tooltips(tree: &mut StructureTree) {
    for id in tree.ids().collect::<Vec<_>>() {
        let node = tree.get(id).unwrap();
        let tooltip = build_tooltip(node);
        let style = VisualStyle::from_confidence(node.confidence);
        let node = tree.get_mut(id).unwrap();
        node.visual_style = style;
        node.tooltip = tooltip;
    }
}

fn build_tooltip(node: &StructureNode) -> TooltipData {
    let mut used_features: Vec<String> = match node.node_type {
        StructureType::Motive => vec!["interval_pattern", "rhythm_pattern", "contour"],
        StructureType::SubPhrase => vec!["material", "similarity"],
        StructureType::Phrase => vec!["cadence", "closure", "relationship"],
        StructureType::Period => vec!["period_type", "proportion", "closure"],
        StructureType::Theme => vec!["function", "material_pattern"],
        StructureType::Section => vec!["form_type"],
    }
    .into_iter()
    .map(str::to_string)
    .collect();

    let mut details = Vec::new();
    if let Some(cadence) = node.features.cadence {
        used_features.push("cadence_type".to_string());
        details.push(format!("cadence: {}", cadence.name()));
    }
    if let Some(period_type) = node.features.period_type {
        details.push(format!("period type: {}", period_type.name()));
    }
    if let Some(relationship) = node.features.relationship {
        details.push(format!("relationship: {}", relationship.name()));
    }
    if let Some(function) = node.features.function {
        details.push(format!("function: {}", function.name()));
    }
    if let Some(form_type) = node.features.form_type {
        details.push(format!("form: {}", form_type.name()));
    }
    details.push(format!(
        "measures {}-{}, confidence {:.2}",
        node.start_measure, node.end_measure, node.confidence
    ));

    TooltipData {
        title: format!("{} {}", node.node_type.name(), node.material),
        used_features,
        similarity: node.features.similarity,
        details,
        model_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

#[derive(Default)]
struct NodeBuilder {
    next_id: usize,
}

impl NodeBuilder {
    #[allow(clippy::too_many_arguments)]
    fn node(
        &mut self,
        node_type: StructureType,
        start_measure: u32,
        end_measure: u32,
        material: String,
        detect_confidence: f32,
        features: NodeFeatures,
        score: &ParsedScore,
    ) -> StructureNode {
        let id = format!("n{}", self.next_id);
        self.next_id += 1;

        let interval_head = interval_head(score, start_measure, end_measure);

        StructureNode {
            id,
            node_type,
            start_measure,
            end_measure,
            parent: None,
            children: Vec::new(),
            material,
            confidence: detect_confidence,
            detect_confidence,
            features,
            visual_style: VisualStyle::from_confidence(detect_confidence),
            tooltip: TooltipData::default(),
            interval_head,
        }
    }
}

fn notes_in_range(score: &ParsedScore, start: u32, end: u32) -> Vec<&Note> {
    score
        .notes
        .iter()
        .filter(|n| n.measure >= start && n.measure <= end)
        .collect()
}

/// First four intervals of the node's notes, the relabel-pass signature
fn interval_head(score: &ParsedScore, start: u32, end: u32) -> Vec<f32> {
    let midis: Vec<i32> = notes_in_range(score, start, end)
        .iter()
        .filter_map(|n| n.midi())
        .take(5)
        .collect();
    midis.windows(2).map(|w| (w[1] - w[0]) as f32).collect()
}
