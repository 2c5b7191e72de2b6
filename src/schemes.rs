//! Rule-based visual scheme generation
//!
//! Produces 3-5 candidate schemes per structure node from structural and
//! emotion features. Colour and shape vocabularies are fixed tables; the
//! PRNG only draws top-up variants after deduplication.

use crate::emotion::{DynamicsLevel, EmotionFeatures, TempoFeel, TensionLevel};
use crate::tree::{StructureNode, StructureType};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Shape vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeType {
    Circle,
    Square,
    Triangle,
    Diamond,
    Hexagon,
    Octagon,
    Star4,
    Star5,
    Star6,
    Sun,
    Burst,
    Spiral,
    Wave,
}

impl ShapeType {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeType::Circle => "circle",
            ShapeType::Square => "square",
            ShapeType::Triangle => "triangle",
            ShapeType::Diamond => "diamond",
            ShapeType::Hexagon => "hexagon",
            ShapeType::Octagon => "octagon",
            ShapeType::Star4 => "star4",
            ShapeType::Star5 => "star5",
            ShapeType::Star6 => "star6",
            ShapeType::Sun => "sun",
            ShapeType::Burst => "burst",
            ShapeType::Spiral => "spiral",
            ShapeType::Wave => "wave",
        }
    }
}

/// Shape size bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeSize {
    Small,
    Medium,
    Large,
}

/// One shape slot in a scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub shape_type: ShapeType,
    pub size: ShapeSize,
}

/// Animation vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationType {
    Pulse,
    Breathe,
    Sweep,
    Flash,
    Drift,
    Ripple,
    Fade,
}

impl AnimationType {
    pub fn name(&self) -> &'static str {
        match self {
            AnimationType::Pulse => "pulse",
            AnimationType::Breathe => "breathe",
            AnimationType::Sweep => "sweep",
            AnimationType::Flash => "flash",
            AnimationType::Drift => "drift",
            AnimationType::Ripple => "ripple",
            AnimationType::Fade => "fade",
        }
    }
}

/// Spatial arrangement of the shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arrangement {
    Single,
    Sequence,
    Grid,
}

/// Material relationship driving the colour remap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemeRelationship {
    Similar,
    Contrasting,
    Recapitulated,
}

/// Origin of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationSource {
    RuleBased,
    PreferenceLearning,
}

/// One candidate visual scheme for a structure node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualScheme {
    pub id: String,
    pub shapes: Vec<Shape>,
    /// Hex colour strings
    pub colors: Vec<String>,
    pub animation: AnimationType,
    pub arrangement: Arrangement,
    pub relationship: Option<SchemeRelationship>,
    pub emotion: Option<EmotionFeatures>,
    pub source: RecommendationSource,
    pub from_preference: bool,
    pub preference_score: Option<f32>,
    pub match_count: Option<usize>,
}

impl VisualScheme {
    /// Grouping key: schemes that draw the same are the same
    pub fn canonical_key(&self) -> String {
        let shapes: Vec<&str> = self.shapes.iter().map(|s| s.shape_type.name()).collect();
        format!(
            "{}|{}|{}",
            shapes.join(","),
            self.colors.join(","),
            self.animation.name()
        )
    }
}

const WARM_COLORS: [&str; 6] = [
    "#e0533d", "#e8843a", "#f0b429", "#d6452f", "#f2a65a", "#c93756",
];
const COOL_COLORS: [&str; 6] = [
    "#3d6fe0", "#3aa2e8", "#29c8f0", "#2f9ad6", "#5ad2f2", "#5637c9",
];
const TENSE_COLORS: [&str; 3] = ["#c92f2f", "#e06a3a", "#8c2346"];
const RELAXED_COLORS: [&str; 3] = ["#4a7fb5", "#6fae9c", "#9fc7e8"];

fn structural_pool(node_type: StructureType) -> [ShapeType; 3] {
    match node_type {
        StructureType::Motive => [ShapeType::Circle, ShapeType::Diamond, ShapeType::Star4],
        StructureType::SubPhrase => [ShapeType::Square, ShapeType::Triangle, ShapeType::Hexagon],
        StructureType::Phrase => [ShapeType::Circle, ShapeType::Square, ShapeType::Star5],
        StructureType::Period => [ShapeType::Hexagon, ShapeType::Octagon, ShapeType::Star6],
        StructureType::Theme => [ShapeType::Star5, ShapeType::Sun, ShapeType::Burst],
        StructureType::Section => [ShapeType::Octagon, ShapeType::Spiral, ShapeType::Wave],
    }
}

fn dynamics_pool(dynamics: DynamicsLevel) -> Option<[ShapeType; 3]> {
    match dynamics {
        DynamicsLevel::Strong => Some([ShapeType::Burst, ShapeType::Star6, ShapeType::Sun]),
        DynamicsLevel::Soft => Some([ShapeType::Circle, ShapeType::Wave, ShapeType::Triangle]),
        DynamicsLevel::Moderate => None,
    }
}

fn size_for(dynamics: DynamicsLevel) -> ShapeSize {
    match dynamics {
        DynamicsLevel::Strong => ShapeSize::Large,
        DynamicsLevel::Moderate => ShapeSize::Medium,
        DynamicsLevel::Soft => ShapeSize::Small,
    }
}

fn tempo_animations(tempo: TempoFeel) -> Option<[AnimationType; 3]> {
    match tempo {
        TempoFeel::Fast => Some([AnimationType::Pulse, AnimationType::Flash, AnimationType::Ripple]),
        TempoFeel::Slow => Some([AnimationType::Breathe, AnimationType::Drift, AnimationType::Fade]),
        TempoFeel::Moderate => None,
    }
}

fn tension_animations(tension: TensionLevel) -> Option<[AnimationType; 3]> {
    match tension {
        TensionLevel::Tense => Some([AnimationType::Flash, AnimationType::Sweep, AnimationType::Pulse]),
        TensionLevel::Relaxed => Some([AnimationType::Drift, AnimationType::Breathe, AnimationType::Fade]),
        TensionLevel::Neutral => None,
    }
}

fn type_animations(node_type: StructureType) -> [AnimationType; 3] {
    match node_type {
        StructureType::Motive => [AnimationType::Pulse, AnimationType::Ripple, AnimationType::Flash],
        StructureType::SubPhrase => [AnimationType::Ripple, AnimationType::Pulse, AnimationType::Sweep],
        StructureType::Phrase => [AnimationType::Sweep, AnimationType::Breathe, AnimationType::Drift],
        StructureType::Period => [AnimationType::Breathe, AnimationType::Sweep, AnimationType::Fade],
        StructureType::Theme => [AnimationType::Drift, AnimationType::Fade, AnimationType::Breathe],
        StructureType::Section => [AnimationType::Fade, AnimationType::Drift, AnimationType::Sweep],
    }
}

/// Generate candidate schemes for a node.
///
/// `related_materials` carries the material labels of structurally related
/// nodes (siblings at the same level) for the relationship colour logic.
pub fn generate_schemes(
    node: &StructureNode,
    emotion: &EmotionFeatures,
    related_materials: &[String],
    count: usize,
    min_schemes: usize,
    rng: &mut StdRng,
) -> Vec<VisualScheme> {
    let duration = node.length();
    let shape_count = shape_count_for(duration);
    let arrangement = arrangement_for(duration);
    let size = size_for(emotion.dynamics);

    let mut schemes: Vec<VisualScheme> = Vec::new();
    for i in 0..count {
        let shapes = build_shapes(node.node_type, emotion.dynamics, size, shape_count, i);
        let colors = build_colors(node, emotion, shape_count, i);
        let animation = pick_animation(node.node_type, emotion, i);

        let mut scheme = VisualScheme {
            id: format!("scheme-{}-{}", node.id, i),
            shapes,
            colors,
            animation,
            arrangement,
            relationship: None,
            emotion: Some(*emotion),
            source: RecommendationSource::RuleBased,
            from_preference: false,
            preference_score: None,
            match_count: None,
        };
        apply_material_relationship(&mut scheme, node, related_materials);
        schemes.push(scheme);
    }

    dedup_and_top_up(schemes, node, emotion, size, shape_count, arrangement, count, min_schemes, rng)
}

fn shape_count_for(duration: u32) -> usize {
    if duration <= 2 {
        1
    } else if duration <= 4 {
        2
    } else if duration <= 8 {
        3
    } else {
        4
    }
}

fn arrangement_for(duration: u32) -> Arrangement {
    if duration <= 2 {
        Arrangement::Single
    } else if duration <= 8 {
        Arrangement::Sequence
    } else {
        Arrangement::Grid
    }
}

fn build_shapes(
    node_type: StructureType,
    dynamics: DynamicsLevel,
    size: ShapeSize,
    shape_count: usize,
    variant: usize,
) -> Vec<Shape> {
    let pool = dynamics_pool(dynamics).unwrap_or_else(|| structural_pool(node_type));
    (0..shape_count)
        .map(|k| Shape {
            shape_type: pool[(variant + k) % pool.len()],
            size,
        })
        .collect()
}

fn build_colors(
    node: &StructureNode,
    emotion: &EmotionFeatures,
    shape_count: usize,
    variant: usize,
) -> Vec<String> {
    let color_count = shape_count.min(3).max(1);

    // Tension colours claim the first variant outright
    if variant == 0 {
        let tension_palette: Option<&[&str]> = match emotion.tension {
            TensionLevel::Tense => Some(&TENSE_COLORS),
            TensionLevel::Relaxed => Some(&RELAXED_COLORS),
            TensionLevel::Neutral => None,
        };
        if let Some(palette) = tension_palette {
            return cycle_colors(palette, color_count, 0);
        }
    }

    let closed = node.features.closure == Some(crate::analysis::Closure::Closed)
        || node.features.cadence == Some(crate::analysis::CadenceType::PerfectAuthentic);

    let palette: Vec<&str> = match emotion.tempo {
        TempoFeel::Fast => WARM_COLORS.to_vec(),
        TempoFeel::Slow => COOL_COLORS.to_vec(),
        TempoFeel::Moderate => {
            if closed {
                WARM_COLORS.to_vec()
            } else {
                COOL_COLORS.to_vec()
            }
        }
    };

    cycle_colors(&palette, color_count, variant)
}

fn cycle_colors(palette: &[&str], count: usize, offset: usize) -> Vec<String> {
    (0..count)
        .map(|k| palette[(offset + k) % palette.len()].to_string())
        .collect()
}

fn pick_animation(
    node_type: StructureType,
    emotion: &EmotionFeatures,
    variant: usize,
) -> AnimationType {
    let table = tempo_animations(emotion.tempo)
        .or_else(|| tension_animations(emotion.tension))
        .unwrap_or_else(|| type_animations(node_type));
    table[variant % table.len()]
}

/// Material relationship colour logic: shared letters run warm, contrasts
/// run cool, primed materials mark a recapitulation.
fn apply_material_relationship(
    scheme: &mut VisualScheme,
    node: &StructureNode,
    related_materials: &[String],
) {
    let own_letter = node.material.chars().next();

    if let Some(letter) = own_letter {
        let shares = related_materials
            .iter()
            .any(|m| m.chars().next() == Some(letter));
        let contrasts = related_materials
            .iter()
            .any(|m| m.chars().next() != Some(letter));

        if shares {
            scheme.relationship = Some(SchemeRelationship::Similar);
            let count = scheme.colors.len();
            scheme.colors = cycle_colors(&WARM_COLORS, count, 0);
        } else if !related_materials.is_empty() && contrasts {
            scheme.relationship = Some(SchemeRelationship::Contrasting);
            let count = scheme.colors.len();
            scheme.colors = cycle_colors(&COOL_COLORS, count, 0);
        }
    }

    if node.material.ends_with('\'') {
        scheme.relationship = Some(SchemeRelationship::Recapitulated);
        if let Some(letter) = own_letter {
            let idx = (letter as usize) % WARM_COLORS.len();
            if let Some(first) = scheme.colors.first_mut() {
                *first = WARM_COLORS[idx].to_string();
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn dedup_and_top_up(
    schemes: Vec<VisualScheme>,
    node: &StructureNode,
    emotion: &EmotionFeatures,
    size: ShapeSize,
    shape_count: usize,
    arrangement: Arrangement,
    count: usize,
    min_schemes: usize,
    rng: &mut StdRng,
) -> Vec<VisualScheme> {
    let mut seen = std::collections::BTreeSet::new();
    let mut unique: Vec<VisualScheme> = Vec::new();
    for scheme in schemes {
        if seen.insert(scheme.canonical_key()) {
            unique.push(scheme);
        }
    }

    let target = count.max(min_schemes);
    let mut attempts = 0;
    while unique.len() < target && attempts < 32 {
        attempts += 1;
        let scheme = random_scheme(
            node,
            emotion,
            size,
            shape_count,
            arrangement,
            unique.len() + attempts,
            rng,
        );
        if seen.insert(scheme.canonical_key()) {
            unique.push(scheme);
        }
    }

    unique
}


/// Random top-up draw that still respects the emotion tables for size and
/// arrangement
fn random_scheme(
    node: &StructureNode,
    emotion: &EmotionFeatures,
    size: ShapeSize,
    shape_count: usize,
    arrangement: Arrangement,
    seq: usize,
    rng: &mut StdRng,
) -> VisualScheme {
    const ALL_SHAPES: [ShapeType; 13] = [
        ShapeType::Circle,
        ShapeType::Square,
        ShapeType::Triangle,
        ShapeType::Diamond,
        ShapeType::Hexagon,
        ShapeType::Octagon,
        ShapeType::Star4,
        ShapeType::Star5,
        ShapeType::Star6,
        ShapeType::Sun,
        ShapeType::Burst,
        ShapeType::Spiral,
        ShapeType::Wave,
    ];
    const ALL_ANIMATIONS: [AnimationType; 7] = [
        AnimationType::Pulse,
        AnimationType::Breathe,
        AnimationType::Sweep,
        AnimationType::Flash,
        AnimationType::Drift,
        AnimationType::Ripple,
        AnimationType::Fade,
    ];

    let shapes = (0..shape_count)
        .map(|_| Shape {
            shape_type: ALL_SHAPES[rng.gen_range(0..ALL_SHAPES.len())],
            size,
        })
        .collect();

    let palette: &[&str] = match emotion.tension {
        TensionLevel::Tense => &WARM_COLORS,
        TensionLevel::Relaxed => &COOL_COLORS,
        TensionLevel::Neutral => {
            if rng.gen_bool(0.5) {
                &WARM_COLORS
            } else {
                &COOL_COLORS
            }
        }
    };
    let color_count = shape_count.min(3).max(1);
    let offset = rng.gen_range(0..palette.len());
    let colors = cycle_colors(palette, color_count, offset);

    VisualScheme {
        id: format!("scheme-{}-r{}", node.id, seq),
        shapes,
        colors,
        animation: ALL_ANIMATIONS[rng.gen_range(0..ALL_ANIMATIONS.len())],
        arrangement,
        relationship: None,
        emotion: Some(*emotion),
        source: RecommendationSource::RuleBased,
        from_preference: false,
        preference_score: None,
        match_count: None,
    }
}
