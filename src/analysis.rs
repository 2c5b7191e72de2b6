//! Analysis result types and JSON export

use crate::score::Note;
use crate::tree::{StructureTree, TooltipData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cadence classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CadenceType {
    PerfectAuthentic,
    ImperfectAuthentic,
    Half,
    Deceptive,
    Plagal,
    Phrygian,
}

impl CadenceType {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            CadenceType::PerfectAuthentic => "PAC",
            CadenceType::ImperfectAuthentic => "IAC",
            CadenceType::Half => "half",
            CadenceType::Deceptive => "deceptive",
            CadenceType::Plagal => "plagal",
            CadenceType::Phrygian => "phrygian",
        }
    }

    /// Closure weight used for phrase and period boundaries
    pub fn strength_weight(&self) -> f32 {
        match self {
            CadenceType::PerfectAuthentic => 1.0,
            CadenceType::ImperfectAuthentic => 0.8,
            CadenceType::Plagal => 0.7,
            CadenceType::Deceptive => 0.5,
            CadenceType::Half => 0.4,
            CadenceType::Phrygian => 0.3,
        }
    }
}

/// Strength category attached to a detected cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CadenceStrength {
    Strong,
    Moderate,
    Weak,
}

/// Detected cadence at a measure boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cadence {
    pub measure: u32,
    pub beat: f32,
    pub cadence_type: CadenceType,
    pub strength: CadenceStrength,
    pub confidence: f32,
}

/// Closure weight of an optional cadence (absent cadences score 0.3)
pub fn cadence_strength(cadence: Option<&Cadence>) -> f32 {
    cadence.map(|c| c.cadence_type.strength_weight()).unwrap_or(0.3)
}

/// Melodic direction of a note group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Contour {
    Ascending,
    Descending,
    Static,
}

/// Relationship of a motive to its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DevelopmentTechnique {
    Repetition,
    Sequence,
    Variation,
    Fragmentation,
    Inversion,
    New,
}

impl DevelopmentTechnique {
    pub fn name(&self) -> &'static str {
        match self {
            DevelopmentTechnique::Repetition => "repetition",
            DevelopmentTechnique::Sequence => "sequence",
            DevelopmentTechnique::Variation => "variation",
            DevelopmentTechnique::Fragmentation => "fragmentation",
            DevelopmentTechnique::Inversion => "inversion",
            DevelopmentTechnique::New => "new",
        }
    }
}

/// Smallest recognisable melodic unit (1-2 beats)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motive {
    pub index: usize,
    pub measure: u32,
    pub start_beat: f32,
    pub notes: Vec<Note>,
    /// Signed semitones between consecutive notes
    pub interval_pattern: Vec<f32>,
    /// Durations in beats
    pub rhythm_pattern: Vec<f32>,
    pub contour: Contour,
    pub relationship: DevelopmentTechnique,
    pub related_to: Option<usize>,
    /// Semitone shift carried by sequence relationships
    pub transposition: Option<i32>,
    pub confidence: f32,
}

/// Roughly one-measure unit between motive and phrase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPhrase {
    pub index: usize,
    pub start_measure: u32,
    pub end_measure: u32,
    pub start_beat: f32,
    pub end_beat: f32,
    pub notes: Vec<Note>,
    pub motive_indices: Vec<usize>,
    pub material: String,
    pub similar_to: Option<usize>,
    pub similarity: Option<f32>,
}

/// Harmonic closure state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Closure {
    Open,
    Closed,
}

/// Relationship of a phrase to its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhraseRelationship {
    Parallel,
    Contrasting,
    Repetition,
    Development,
    Sequence,
}

impl PhraseRelationship {
    pub fn name(&self) -> &'static str {
        match self {
            PhraseRelationship::Parallel => "parallel",
            PhraseRelationship::Contrasting => "contrasting",
            PhraseRelationship::Repetition => "repetition",
            PhraseRelationship::Development => "development",
            PhraseRelationship::Sequence => "sequence",
        }
    }
}

/// A 2-12 measure unit closed by a cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub index: usize,
    pub start_measure: u32,
    pub end_measure: u32,
    pub cadence: Option<Cadence>,
    pub notes: Vec<Note>,
    pub sub_phrases: Vec<SubPhrase>,
    pub material: String,
    pub closure: Closure,
    pub relationship: Option<PhraseRelationship>,
    pub head_similarity: Option<f32>,
}

impl Phrase {
    /// Inclusive measure span
    pub fn length(&self) -> u32 {
        self.end_measure - self.start_measure + 1
    }
}

/// Period classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodType {
    Parallel,
    Contrasting,
    Sequential,
    ThreePhrase,
    FourPhrase,
    Compound,
}

impl PeriodType {
    pub fn name(&self) -> &'static str {
        match self {
            PeriodType::Parallel => "parallel",
            PeriodType::Contrasting => "contrasting",
            PeriodType::Sequential => "sequential",
            PeriodType::ThreePhrase => "three_phrase",
            PeriodType::FourPhrase => "four_phrase",
            PeriodType::Compound => "compound",
        }
    }
}

/// Phrase-length balance within a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proportion {
    Square,
    Regular,
    NonSquare,
}

/// Ordered group of phrases forming a structural paragraph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub index: usize,
    pub start_measure: u32,
    pub end_measure: u32,
    pub phrases: Vec<Phrase>,
    pub period_type: PeriodType,
    pub proportion: Proportion,
    pub closure: Closure,
    pub material: String,
    /// Cadence of the final phrase
    pub cadence: Option<Cadence>,
}

impl Period {
    pub fn phrase_count(&self) -> usize {
        self.phrases.len()
    }

    /// All notes of the period, in phrase order
    pub fn notes(&self) -> Vec<Note> {
        self.phrases.iter().flat_map(|p| p.notes.clone()).collect()
    }
}

/// Overall form label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormType {
    OnePart,
    BinaryParallel,
    BinaryRounded,
    TernarySimple,
    TernaryParallel,
    TernaryCompound,
    Sonata,
    Rondo,
    Variation,
    Aaba,
    VerseChorus,
}

impl FormType {
    pub fn name(&self) -> &'static str {
        match self {
            FormType::OnePart => "one_part",
            FormType::BinaryParallel => "binary_parallel",
            FormType::BinaryRounded => "binary_rounded",
            FormType::TernarySimple => "ternary_simple",
            FormType::TernaryParallel => "ternary_parallel",
            FormType::TernaryCompound => "ternary_compound",
            FormType::Sonata => "sonata",
            FormType::Rondo => "rondo",
            FormType::Variation => "variation",
            FormType::Aaba => "aaba",
            FormType::VerseChorus => "verse_chorus",
        }
    }
}

/// Functional role of a section within the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionFunction {
    Statement,
    Contrast,
    Restatement,
    Exposition,
    Development,
    Recapitulation,
    Refrain,
    Episode,
    Variation,
    Verse,
    Chorus,
    Bridge,
}

impl SectionFunction {
    pub fn name(&self) -> &'static str {
        match self {
            SectionFunction::Statement => "statement",
            SectionFunction::Contrast => "contrast",
            SectionFunction::Restatement => "restatement",
            SectionFunction::Exposition => "exposition",
            SectionFunction::Development => "development",
            SectionFunction::Recapitulation => "recapitulation",
            SectionFunction::Refrain => "refrain",
            SectionFunction::Episode => "episode",
            SectionFunction::Variation => "variation",
            SectionFunction::Verse => "verse",
            SectionFunction::Chorus => "chorus",
            SectionFunction::Bridge => "bridge",
        }
    }
}

/// Classification of a ternary middle section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MiddleSectionType {
    Trio,
    Development,
    Episode,
}

/// Exposition/recapitulation component of a sonata section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SonataComponent {
    pub name: String,
    pub start_measure: u32,
    pub end_measure: u32,
    pub varied: bool,
}

/// Large-scale section of the form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    /// Material letter name, e.g. "A", "B", "A'"
    pub section_type: String,
    pub start_measure: u32,
    pub end_measure: u32,
    pub function: SectionFunction,
    /// Indices into the period list
    pub periods: Vec<usize>,
    pub middle_type: Option<MiddleSectionType>,
    pub components: Option<Vec<SonataComponent>>,
    pub variation_type: Option<String>,
    pub is_recurrence: Option<bool>,
    pub recapitulation_type: Option<String>,
}

/// Letter pattern summary over the period materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialPattern {
    pub pattern: String,
    pub counts: BTreeMap<char, usize>,
    pub main_material: char,
    pub has_recapitulation: bool,
}

/// Form classification result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormAnalysis {
    pub form_type: FormType,
    pub sections: Vec<Section>,
    pub confidence: f32,
    pub description: String,
}

/// Inclusive measure range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureRange {
    pub start_measure: u32,
    pub end_measure: u32,
}

/// Material outside the period skeleton
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxiliarySections {
    pub introduction: Option<MeasureRange>,
    pub coda: Option<MeasureRange>,
    pub codetta: Option<MeasureRange>,
    pub transitions: Vec<MeasureRange>,
    /// Indices of phrases running past the typical length
    pub extensions: Vec<usize>,
}

/// Candidate scale for mode detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleKind {
    Major,
    NaturalMinor,
    HarmonicMinor,
    Ionian,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Locrian,
    MajorPentatonic,
    EgyptianPentatonic,
    BluesMinorPentatonic,
    BluesMajorPentatonic,
    MinorPentatonic,
}

impl ScaleKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScaleKind::Major => "major",
            ScaleKind::NaturalMinor => "natural_minor",
            ScaleKind::HarmonicMinor => "harmonic_minor",
            ScaleKind::Ionian => "ionian",
            ScaleKind::Dorian => "dorian",
            ScaleKind::Phrygian => "phrygian",
            ScaleKind::Lydian => "lydian",
            ScaleKind::Mixolydian => "mixolydian",
            ScaleKind::Aeolian => "aeolian",
            ScaleKind::Locrian => "locrian",
            ScaleKind::MajorPentatonic => "major_pentatonic",
            ScaleKind::EgyptianPentatonic => "egyptian_pentatonic",
            ScaleKind::BluesMinorPentatonic => "blues_minor_pentatonic",
            ScaleKind::BluesMajorPentatonic => "blues_major_pentatonic",
            ScaleKind::MinorPentatonic => "minor_pentatonic",
        }
    }

    /// Tonic-relative pitch classes of the scale
    pub fn pitch_classes(&self) -> &'static [i32] {
        match self {
            ScaleKind::Major | ScaleKind::Ionian => &[0, 2, 4, 5, 7, 9, 11],
            ScaleKind::NaturalMinor | ScaleKind::Aeolian => &[0, 2, 3, 5, 7, 8, 10],
            ScaleKind::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleKind::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleKind::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleKind::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleKind::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleKind::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            ScaleKind::MajorPentatonic => &[0, 2, 4, 7, 9],
            ScaleKind::EgyptianPentatonic => &[0, 2, 5, 7, 10],
            ScaleKind::BluesMinorPentatonic => &[0, 3, 5, 8, 10],
            ScaleKind::BluesMajorPentatonic => &[0, 2, 5, 7, 9],
            ScaleKind::MinorPentatonic => &[0, 3, 5, 7, 10],
        }
    }

    /// All candidate scales, in fixed evaluation order
    pub fn all() -> &'static [ScaleKind] {
        &[
            ScaleKind::Major,
            ScaleKind::NaturalMinor,
            ScaleKind::HarmonicMinor,
            ScaleKind::Ionian,
            ScaleKind::Dorian,
            ScaleKind::Phrygian,
            ScaleKind::Lydian,
            ScaleKind::Mixolydian,
            ScaleKind::Aeolian,
            ScaleKind::Locrian,
            ScaleKind::MajorPentatonic,
            ScaleKind::EgyptianPentatonic,
            ScaleKind::BluesMinorPentatonic,
            ScaleKind::BluesMajorPentatonic,
            ScaleKind::MinorPentatonic,
        ]
    }
}

/// Best-fitting scale with runner-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeEstimate {
    pub scale: ScaleKind,
    pub confidence: f32,
    pub runner_up: ScaleKind,
    pub runner_up_confidence: f32,
}

/// Processing provenance attached to the analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingInfo {
    pub chunked: bool,
    pub chunk_count: usize,
    pub skipped_chunks: usize,
    pub model_version: String,
}

impl Default for ProcessingInfo {
    fn default() -> Self {
        Self {
            chunked: false,
            chunk_count: 0,
            skipped_chunks: 0,
            model_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Aggregate statistics over one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    pub measure_count: usize,
    pub note_count: usize,
    pub cadence_count: usize,
    pub motive_count: usize,
    pub sub_phrase_count: usize,
    pub phrase_count: usize,
    pub period_count: usize,
    pub section_count: usize,
    pub mean_node_confidence: f32,
}

/// Complete analysis output handed to the UI and export layers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullAnalysis {
    pub tree: StructureTree,
    pub cadences: Vec<Cadence>,
    pub motives: Vec<Motive>,
    pub sub_phrases: Vec<SubPhrase>,
    pub phrases: Vec<Phrase>,
    pub periods: Vec<Period>,
    pub form: FormAnalysis,
    pub mode: Option<ModeEstimate>,
    pub auxiliaries: AuxiliarySections,
    pub statistics: AnalysisStatistics,
    pub tooltips: BTreeMap<String, TooltipData>,
    pub processing: ProcessingInfo,
}

/// Assemble the complete analysis output from a finished pipeline state
pub fn build_full_analysis(state: &crate::score::ScoreState) -> FullAnalysis {
    let tree = state.tree.clone().unwrap_or_else(|| fallback_tree(state));

    let tooltips: BTreeMap<String, TooltipData> = tree
        .nodes()
        .iter()
        .map(|n| (n.id.clone(), n.tooltip.clone()))
        .collect();

    let node_count = tree.len();
    let mean_node_confidence = if node_count > 0 {
        tree.nodes().iter().map(|n| n.confidence).sum::<f32>() / node_count as f32
    } else {
        0.0
    };

    let form = state.form.clone().unwrap_or(FormAnalysis {
        form_type: FormType::OnePart,
        sections: Vec::new(),
        confidence: 0.5,
        description: "Insufficient material for form classification".to_string(),
    });

    let statistics = AnalysisStatistics {
        measure_count: state.score.measure_count(),
        note_count: state.score.notes.len(),
        cadence_count: state.cadences.len(),
        motive_count: state.motives.len(),
        sub_phrase_count: state.sub_phrases.len(),
        phrase_count: state.phrases.len(),
        period_count: state.periods.len(),
        section_count: form.sections.len(),
        mean_node_confidence,
    };

    FullAnalysis {
        tree,
        cadences: state.cadences.clone(),
        motives: state.motives.clone(),
        sub_phrases: state.sub_phrases.clone(),
        phrases: state.phrases.clone(),
        periods: state.periods.clone(),
        form,
        mode: state.mode.clone(),
        auxiliaries: state.auxiliaries.clone(),
        statistics,
        tooltips,
        processing: state.processing.clone(),
    }
}

/// Root-only tree for states where the tree pass could not run
fn fallback_tree(state: &crate::score::ScoreState) -> StructureTree {
    use crate::tree::{NodeFeatures, StructureNode, StructureType, VisualStyle};

    let first = state.score.first_measure().unwrap_or(1);
    let last = state.score.last_measure().unwrap_or(first);
    StructureTree::with_root(StructureNode {
        id: "n0".to_string(),
        node_type: StructureType::Section,
        start_measure: first,
        end_measure: last,
        parent: None,
        children: Vec::new(),
        material: String::new(),
        confidence: 0.5,
        detect_confidence: 0.5,
        features: NodeFeatures::default(),
        visual_style: VisualStyle::from_confidence(0.5),
        tooltip: TooltipData::default(),
        interval_head: Vec::new(),
    })
}

/// Export analysis results to JSON
pub fn export_analysis(
    analysis: &FullAnalysis,
    output_dir: &std::path::Path,
) -> crate::error::Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let analysis_path = output_dir.join("analysis.json");
    let json = serde_json::to_string_pretty(analysis)
        .map_err(|e| crate::error::ScoreError::AnalysisExportError(e.to_string()))?;
    std::fs::write(&analysis_path, json)?;

    println!("Exported analysis results to {}", analysis_path.display());
    Ok(())
}
