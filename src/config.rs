//! Configuration system for the structure analysis pipeline

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub chunking: ChunkingConfig,
    pub similarity: SimilarityConfig,
    pub cadence: CadenceConfig,
    pub motive: MotiveConfig,
    pub sub_phrase: SubPhraseConfig,
    pub phrase: PhraseConfig,
    pub period: PeriodConfig,
    pub form: FormConfig,
    pub tree: TreeConfig,
    pub alignment: AlignmentConfig,
    pub emotion: EmotionConfig,
    pub scheme: SchemeConfig,
    pub preference: PreferenceConfig,
    pub qa: QaConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            chunking: ChunkingConfig::default(),
            similarity: SimilarityConfig::default(),
            cadence: CadenceConfig::default(),
            motive: MotiveConfig::default(),
            sub_phrase: SubPhraseConfig::default(),
            phrase: PhraseConfig::default(),
            period: PeriodConfig::default(),
            form: FormConfig::default(),
            tree: TreeConfig::default(),
            alignment: AlignmentConfig::default(),
            emotion: EmotionConfig::default(),
            scheme: SchemeConfig::default(),
            preference: PreferenceConfig::default(),
            qa: QaConfig::default(),
        }
    }
}

/// Chunked processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_notes_per_chunk: usize,
    pub max_measures_per_chunk: u32,
    pub overlap_measures: u32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_notes_per_chunk: 1000,
            max_measures_per_chunk: 32,
            overlap_measures: 4,
        }
    }
}

/// Similarity kernel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Per-position match tolerance for array comparison
    pub match_tolerance: f32,
    pub interval_weight: f32,
    pub rhythm_weight: f32,
    /// Fraction of positions that must mirror for inversion detection
    pub inversion_match_ratio: f32,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            match_tolerance: 1.0,
            interval_weight: 0.6,
            rhythm_weight: 0.4,
            inversion_match_ratio: 0.8,
        }
    }
}

/// Cadence detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub pac_confidence: f32,
    pub iac_confidence: f32,
    pub iac_leading_tone_confidence: f32,
    pub half_confidence: f32,
    pub deceptive_confidence: f32,
    pub plagal_confidence: f32,
    pub phrygian_confidence: f32,
    /// Cadence strength above which a phrase counts as closed
    pub closure_threshold: f32,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            pac_confidence: 0.95,
            iac_confidence: 0.8,
            iac_leading_tone_confidence: 0.75,
            half_confidence: 0.8,
            deceptive_confidence: 0.85,
            plagal_confidence: 0.75,
            phrygian_confidence: 0.7,
            closure_threshold: 0.7,
        }
    }
}

/// Motive detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotiveConfig {
    pub min_notes: usize,
    pub repetition_interval_sim: f32,
    pub repetition_rhythm_sim: f32,
    pub sequence_interval_sim: f32,
    pub sequence_rhythm_sim: f32,
    pub variation_rhythm_sim: f32,
    pub variation_interval_max: f32,
    pub fragmentation_length_ratio: f32,
    pub fragmentation_prefix_sim: f32,
}

impl Default for MotiveConfig {
    fn default() -> Self {
        Self {
            min_notes: 2,
            repetition_interval_sim: 0.9,
            repetition_rhythm_sim: 0.9,
            sequence_interval_sim: 0.8,
            sequence_rhythm_sim: 0.7,
            variation_rhythm_sim: 0.8,
            variation_interval_max: 0.5,
            fragmentation_length_ratio: 0.8,
            fragmentation_prefix_sim: 0.7,
        }
    }
}

/// Sub-phrase detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubPhraseConfig {
    /// A measure splits only when it carries more notes than this
    pub split_note_count: usize,
    /// Duration (beats) marking an internal rhythmic break
    pub break_duration_beats: f32,
    /// Similarity above which a sub-phrase takes the prime label
    pub prime_threshold: f32,
    /// Similarity above which a sub-phrase takes the variant label
    pub variant_threshold: f32,
}

impl Default for SubPhraseConfig {
    fn default() -> Self {
        Self {
            split_note_count: 4,
            break_duration_beats: 2.0,
            prime_threshold: 0.8,
            variant_threshold: 0.5,
        }
    }
}

/// Phrase detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseConfig {
    pub min_length: u32,
    pub max_length: u32,
    /// Cap on head/tail note counts for relationship comparison
    pub head_note_cap: usize,
    pub parallel_head_sim: f32,
    pub parallel_tail_max: f32,
    pub contrast_head_sim: f32,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            min_length: 2,
            max_length: 12,
            head_note_cap: 8,
            parallel_head_sim: 0.7,
            parallel_tail_max: 0.5,
            contrast_head_sim: 0.3,
        }
    }
}

/// Period grouping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodConfig {
    pub max_phrases: usize,
    /// Cadence strength ending an accumulating period
    pub strong_cadence: f32,
    /// Head similarity below which the next phrase opens a new section
    pub section_break_head_sim: f32,
    pub sequential_interval_sim: f32,
    /// Head similarity for compound AA' detection
    pub compound_head_sim: f32,
    /// Square proportion requires phrase length >= this power of two
    pub square_min_length: u32,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        Self {
            max_phrases: 4,
            strong_cadence: 0.7,
            section_break_head_sim: 0.3,
            sequential_interval_sim: 0.7,
            compound_head_sim: 0.7,
            square_min_length: 4,
        }
    }
}

/// Form classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub variation_sim_min: f32,
    pub variation_sim_max: f32,
    pub variation_ratio: f32,
    pub rondo_min_periods: usize,
    pub rondo_min_refrains: usize,
    pub rondo_min_episodes: usize,
    pub sonata_min_periods: usize,
    pub sonata_recap_sim: f32,
    pub sonata_varied_sim: f32,
    pub binary_recap_head_sim: f32,
    pub middle_development_sim: f32,
    /// Post-period tail longer than this becomes a coda (else codetta)
    pub coda_min_length: u32,
    pub typical_phrase_length: u32,
    pub extension_factor: f32,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            variation_sim_min: 0.3,
            variation_sim_max: 0.9,
            variation_ratio: 0.6,
            rondo_min_periods: 5,
            rondo_min_refrains: 3,
            rondo_min_episodes: 2,
            sonata_min_periods: 6,
            sonata_recap_sim: 0.5,
            sonata_varied_sim: 0.8,
            binary_recap_head_sim: 0.6,
            middle_development_sim: 0.5,
            coda_min_length: 4,
            typical_phrase_length: 4,
            extension_factor: 1.5,
        }
    }
}

/// Structure tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub root_confidence: f32,
    pub cadence_bonus: f32,
    /// Phrases at least this long split into two derived sub-phrase halves
    pub sub_phrase_split_min: u32,
    /// Interval difference tolerated by the material relabel pass
    pub relabel_tolerance: f32,
    pub relabel_match_ratio: f32,
    pub edit_decrement: f32,
    pub edit_floor: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            root_confidence: 0.8,
            cadence_bonus: 0.1,
            sub_phrase_split_min: 4,
            relabel_tolerance: 2.0,
            relabel_match_ratio: 0.7,
            edit_decrement: 0.1,
            edit_floor: 0.5,
        }
    }
}

/// DTW alignment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub frames_per_measure: usize,
    /// Reverse-map quantisation step in seconds
    pub time_quantum: f32,
    pub adjust_penalty: f32,
    pub confidence_floor: f32,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            frames_per_measure: 10,
            time_quantum: 0.1,
            adjust_penalty: 0.05,
            confidence_floor: 0.5,
        }
    }
}

/// Emotion feature extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Children-per-measure density above which a node reads as fast
    pub fast_density: f32,
    pub slow_density: f32,
    pub rms_strong: f32,
    pub rms_soft: f32,
    pub centroid_tense_hz: f32,
    pub centroid_relaxed_hz: f32,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            fast_density: 2.0,
            slow_density: 0.5,
            rms_strong: 0.7,
            rms_soft: 0.3,
            centroid_tense_hz: 3000.0,
            centroid_relaxed_hz: 1000.0,
        }
    }
}

/// Visual scheme generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemeConfig {
    pub default_count: usize,
    pub min_schemes: usize,
    pub rng_seed: u64,
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            default_count: 4,
            min_schemes: 3,
            rng_seed: 0x5c0_2e2f,
        }
    }
}

/// Preference learner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceConfig {
    pub recency_decay_per_minute: f32,
    pub min_examples_for_recommendation: usize,
    pub positive_adjust: f32,
    pub negative_adjust: f32,
    pub weight_min: f32,
    pub weight_max: f32,
}

impl Default for PreferenceConfig {
    fn default() -> Self {
        Self {
            recency_decay_per_minute: 0.95,
            min_examples_for_recommendation: 2,
            positive_adjust: 0.05,
            negative_adjust: 0.03,
            weight_min: 0.1,
            weight_max: 2.0,
        }
    }
}

/// QA artifacts configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    pub generate_images: bool,
    pub image_width: u32,
    pub image_height: u32,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            generate_images: true,
            image_width: 1200,
            image_height: 600,
        }
    }
}

/// Validate configuration parameters
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.phrase.min_length >= config.phrase.max_length {
        anyhow::bail!("phrase.min_length must be < phrase.max_length");
    }

    if config.chunking.overlap_measures >= config.chunking.max_measures_per_chunk {
        anyhow::bail!("chunking.overlap_measures must be < chunking.max_measures_per_chunk");
    }

    let weight_sum = config.similarity.interval_weight + config.similarity.rhythm_weight;
    if (weight_sum - 1.0).abs() > 0.01 {
        anyhow::bail!("similarity interval/rhythm weights must sum to 1.0");
    }

    if config.preference.weight_min >= config.preference.weight_max {
        anyhow::bail!("preference.weight_min must be < preference.weight_max");
    }

    if config.alignment.frames_per_measure == 0 {
        anyhow::bail!("alignment.frames_per_measure must be positive");
    }

    Ok(())
}

/// Load configuration from JSON file
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Save configuration to JSON file
pub fn save_config<P: AsRef<std::path::Path>>(config: &Config, path: P) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
