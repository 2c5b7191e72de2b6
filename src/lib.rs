//! Score-to-Form Structure Analysis System
//!
//! A deterministic, rule-based engine that turns a decoded symbolic score
//! into a hierarchical structural analysis (motives up to overall form) and
//! recommends visual schemes per node, adapting to user feedback within a
//! session.

pub mod alignment;
pub mod analysis;
pub mod chunking;
pub mod config;
pub mod emotion;
pub mod error;
pub mod passes;
pub mod pitch;
pub mod preference;
pub mod qa;
pub mod recommend;
pub mod schemes;
pub mod score;
pub mod session;
pub mod similarity;
pub mod tree;

pub use analysis::FullAnalysis;
pub use config::Config;
pub use error::{Result as ScoreErrorResult, ScoreError};
pub use score::{ParsedScore, ScoreState};
pub use session::AnalysisSession;

use std::path::Path;

/// Main processing pipeline for score structure analysis
pub struct ScoreToForm {
    config: Config,
}

impl ScoreToForm {
    /// Create a new processor with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Analyze a score file and write analysis plus QA artifacts
    pub fn process<P: AsRef<Path>>(&self, input_path: P, output_dir: P) -> ScoreErrorResult<()> {
        // Load and validate the decoded score
        let parsed = score::load_score(input_path)?;

        // Run the analysis pipeline (chunked automatically for long scores)
        let analysis = self.analyze(parsed)?;

        // Export results
        self.export_results(&analysis, output_dir.as_ref())?;

        Ok(())
    }

    /// Run the pipeline on an in-memory score
    pub fn analyze(&self, score: ParsedScore) -> ScoreErrorResult<FullAnalysis> {
        let state = chunking::analyze(score, &self.config)?;
        Ok(analysis::build_full_analysis(&state))
    }

    /// Export analysis JSON and QA artifacts
    fn export_results(
        &self,
        analysis: &FullAnalysis,
        output_dir: &Path,
    ) -> ScoreErrorResult<()> {
        analysis::export_analysis(analysis, output_dir)?;
        qa::generate_artifacts(analysis, output_dir, &self.config)?;
        Ok(())
    }
}

/// Validate configuration and input files
pub fn validate_input<P: AsRef<Path>>(input_path: P, config: &Config) -> ScoreErrorResult<()> {
    // Check input file exists and decodes to a consistent score
    score::load_score(input_path)?;

    // Validate configuration
    config::validate_config(config)?;

    Ok(())
}
