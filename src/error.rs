//! Error types for the structure analysis system

use std::fmt;

/// Custom error type for score analysis
#[derive(Debug, Clone)]
pub enum ScoreError {
    /// E001: Malformed or internally inconsistent score
    InvalidScore(String),
    /// E002: Note references a measure absent from the measure list
    UnknownMeasure(u32),
    /// E003: Configuration validation failed
    ConfigValidationFailed(String),
    /// E004: Key signature out of the supported fifths range
    UnsupportedKeySignature(i32),
    /// E005: Score file I/O error
    ScoreFileError(String),
    /// E006: Processing pipeline error
    ProcessingPipelineError(String),
    /// E007: Analysis export error
    AnalysisExportError(String),
    /// E008: Session serialization or import error
    SessionError(String),
    /// E009: QA artifact generation error
    QaGenerationError(String),
    /// E010: Input validation error
    InputValidationError(String),
    /// E011: Structure tree node lookup failed
    UnknownNode(String),
    /// E012: Alignment input error
    AlignmentError(String),
}

impl fmt::Display for ScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreError::InvalidScore(msg) => {
                write!(f, "E001: Invalid score - {}", msg)
            }
            ScoreError::UnknownMeasure(m) => {
                write!(f, "E002: Note references unknown measure {}", m)
            }
            ScoreError::ConfigValidationFailed(msg) => {
                write!(f, "E003: Configuration validation failed - {}", msg)
            }
            ScoreError::UnsupportedKeySignature(fifths) => {
                write!(f, "E004: Unsupported key signature ({} fifths)", fifths)
            }
            ScoreError::ScoreFileError(msg) => {
                write!(f, "E005: Score file I/O error - {}", msg)
            }
            ScoreError::ProcessingPipelineError(msg) => {
                write!(f, "E006: Processing pipeline error - {}", msg)
            }
            ScoreError::AnalysisExportError(msg) => {
                write!(f, "E007: Analysis export error - {}", msg)
            }
            ScoreError::SessionError(msg) => {
                write!(f, "E008: Session error - {}", msg)
            }
            ScoreError::QaGenerationError(msg) => {
                write!(f, "E009: QA artifact generation error - {}", msg)
            }
            ScoreError::InputValidationError(msg) => {
                write!(f, "E010: Input validation error - {}", msg)
            }
            ScoreError::UnknownNode(id) => {
                write!(f, "E011: Unknown structure node '{}'", id)
            }
            ScoreError::AlignmentError(msg) => {
                write!(f, "E012: Alignment input error - {}", msg)
            }
        }
    }
}

impl std::error::Error for ScoreError {}

// From implementations for common error types
impl From<std::io::Error> for ScoreError {
    fn from(err: std::io::Error) -> Self {
        ScoreError::ScoreFileError(format!("File I/O error: {}", err))
    }
}

impl From<serde_json::Error> for ScoreError {
    fn from(err: serde_json::Error) -> Self {
        ScoreError::SessionError(format!("JSON serialization error: {}", err))
    }
}

impl From<anyhow::Error> for ScoreError {
    fn from(err: anyhow::Error) -> Self {
        ScoreError::ProcessingPipelineError(format!("Generic error: {}", err))
    }
}

/// Result type alias for score analysis operations
pub type Result<T> = std::result::Result<T, ScoreError>;
