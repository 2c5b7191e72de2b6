//! Symbolic score model and pipeline state

use crate::analysis::{
    AuxiliarySections, Cadence, FormAnalysis, ModeEstimate, Motive, Period, Phrase,
    ProcessingInfo, SubPhrase,
};
use crate::config::Config;
use crate::error::{Result as ScoreResult, ScoreError};
use crate::pitch;
use crate::tree::StructureTree;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Diatonic step letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Pitch class of the natural step
    pub fn natural_pitch_class(&self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::C => "C",
            Step::D => "D",
            Step::E => "E",
            Step::F => "F",
            Step::G => "G",
            Step::A => "A",
            Step::B => "B",
        }
    }
}

/// Accidental applied to a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accidental {
    DoubleFlat,
    Flat,
    Natural,
    Sharp,
    DoubleSharp,
}

impl Accidental {
    /// Semitone offset from the natural step
    pub fn offset(&self) -> i32 {
        match self {
            Accidental::DoubleFlat => -2,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::DoubleSharp => 2,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Accidental::DoubleFlat => "bb",
            Accidental::Flat => "b",
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::DoubleSharp => "##",
        }
    }
}

/// Spelled pitch with octave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PitchName {
    pub step: Step,
    pub accidental: Accidental,
    pub octave: i32,
}

impl PitchName {
    pub fn new(step: Step, accidental: Accidental, octave: i32) -> Self {
        Self {
            step,
            accidental,
            octave,
        }
    }

    /// Pitch class in 0..12
    pub fn pitch_class(&self) -> i32 {
        (self.step.natural_pitch_class() + self.accidental.offset()).rem_euclid(12)
    }

    /// MIDI note number
    pub fn midi(&self) -> i32 {
        pitch::pitch_to_midi(self)
    }

    pub fn name(&self) -> String {
        format!("{}{}{}", self.step.name(), self.accidental.suffix(), self.octave)
    }
}

/// Dynamics marking attached to a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynMark {
    Pianissimo,
    Piano,
    MezzoPiano,
    MezzoForte,
    Forte,
    Fortissimo,
}

impl DynMark {
    pub fn name(&self) -> &'static str {
        match self {
            DynMark::Pianissimo => "pp",
            DynMark::Piano => "p",
            DynMark::MezzoPiano => "mp",
            DynMark::MezzoForte => "mf",
            DynMark::Forte => "f",
            DynMark::Fortissimo => "ff",
        }
    }
}

/// One note or rest in the decoded score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// None represents a rest
    pub pitch: Option<PitchName>,
    /// Duration in beats
    pub duration: f32,
    /// 1-based measure number
    pub measure: u32,
    /// Beats from measure start
    pub beat: f32,
    pub voice: u32,
    pub dynamics: Option<DynMark>,
}

impl Note {
    pub fn is_rest(&self) -> bool {
        self.pitch.is_none()
    }

    /// MIDI number, or None for a rest
    pub fn midi(&self) -> Option<i32> {
        self.pitch.as_ref().map(|p| p.midi())
    }
}

/// Key mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyMode {
    Major,
    Minor,
}

/// Key signature as fifths count plus mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeySignature {
    /// -7 (7 flats) .. 7 (7 sharps)
    pub fifths: i32,
    pub mode: KeyMode,
}

impl Default for KeySignature {
    fn default() -> Self {
        Self {
            fifths: 0,
            mode: KeyMode::Major,
        }
    }
}

/// Time signature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats: u32,
    pub beat_type: u32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beats: 4,
            beat_type: 4,
        }
    }
}

/// Measure entry in the decoded score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub number: u32,
}

/// Part metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    pub name: String,
}

/// Decoded symbolic score, produced by the external score decoder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedScore {
    pub measures: Vec<Measure>,
    pub notes: Vec<Note>,
    pub key_signature: KeySignature,
    pub time_signature: TimeSignature,
    /// Tempo in BPM
    pub tempo: f32,
    pub parts: Vec<Part>,
}

impl Default for ParsedScore {
    fn default() -> Self {
        Self {
            measures: Vec::new(),
            notes: Vec::new(),
            key_signature: KeySignature::default(),
            time_signature: TimeSignature::default(),
            tempo: 120.0,
            parts: Vec::new(),
        }
    }
}

impl ParsedScore {
    /// Number of measures
    pub fn measure_count(&self) -> usize {
        self.measures.len()
    }

    /// Notes belonging to one measure, in score order
    pub fn notes_in_measure(&self, measure: u32) -> Vec<&Note> {
        self.notes.iter().filter(|n| n.measure == measure).collect()
    }

    pub fn first_measure(&self) -> Option<u32> {
        self.measures.first().map(|m| m.number)
    }

    pub fn last_measure(&self) -> Option<u32> {
        self.measures.last().map(|m| m.number)
    }
}

/// Audio feature stream from the external audio decoder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub rms: Vec<f32>,
    pub spectral_centroid: Vec<f32>,
    pub zcr: Vec<f32>,
    pub mfcc: Vec<Vec<f32>>,
    /// 12-bin pitch-class energy per frame, rows summing to ~1
    pub chroma: Vec<[f32; 12]>,
    pub timestamps: Vec<f32>,
}

/// Validate a decoded score against the invariants the core relies on
pub fn validate_score(score: &ParsedScore) -> ScoreResult<()> {
    if score.key_signature.fifths < -7 || score.key_signature.fifths > 7 {
        return Err(ScoreError::UnsupportedKeySignature(score.key_signature.fifths));
    }

    if score.time_signature.beats == 0 {
        return Err(ScoreError::InvalidScore(
            "time signature must have at least one beat".to_string(),
        ));
    }

    // Measures contiguous and 1-based
    for (i, measure) in score.measures.iter().enumerate() {
        let expected = i as u32 + 1;
        if measure.number != expected {
            return Err(ScoreError::InvalidScore(format!(
                "measure {} out of sequence (expected {})",
                measure.number, expected
            )));
        }
    }

    // Every note's measure must exist
    let last = score.last_measure().unwrap_or(0);
    for note in &score.notes {
        if note.measure == 0 || note.measure > last {
            return Err(ScoreError::UnknownMeasure(note.measure));
        }
    }

    // Notes sorted by (measure, beat, voice)
    for pair in score.notes.windows(2) {
        let a = (&pair[0].measure, pair[0].beat, pair[0].voice);
        let b = (&pair[1].measure, pair[1].beat, pair[1].voice);
        if a.0 > b.0 || (a.0 == b.0 && (a.1 > b.1 + 1e-6 || (a.1 - b.1).abs() < 1e-6 && a.2 > b.2))
        {
            return Err(ScoreError::InvalidScore(
                "notes not sorted by (measure, beat, voice)".to_string(),
            ));
        }
    }

    Ok(())
}

/// Load a ParsedScore from a JSON file
pub fn load_score<P: AsRef<Path>>(path: P) -> ScoreResult<ParsedScore> {
    let content = std::fs::read_to_string(path)?;
    let score: ParsedScore = serde_json::from_str(&content)
        .map_err(|e| ScoreError::InvalidScore(format!("JSON decode failed: {}", e)))?;
    validate_score(&score)?;
    Ok(score)
}

/// Pipeline state threaded through all analysis passes
#[derive(Debug, Clone)]
pub struct ScoreState {
    pub score: ParsedScore,
    pub config: Config,
    /// Tonic pitch class resolved from the key signature
    pub tonic: i32,

    // Cadence pass
    pub cadences: Vec<Cadence>,

    // Motive / sub-phrase passes (chunk-mergeable)
    pub motives: Vec<Motive>,
    pub sub_phrases: Vec<SubPhrase>,

    // Phrase pass
    pub phrases: Vec<Phrase>,

    // Period pass
    pub periods: Vec<Period>,

    // Form pass
    pub form: Option<FormAnalysis>,
    pub auxiliaries: AuxiliarySections,

    // Mode pass
    pub mode: Option<ModeEstimate>,

    // Tree pass
    pub tree: Option<StructureTree>,

    pub processing: ProcessingInfo,
}

impl ScoreState {
    /// Validate the score and create initial state
    pub fn new(score: ParsedScore, config: &Config) -> ScoreResult<Self> {
        validate_score(&score)?;
        let tonic = pitch::tonic_from_key(score.key_signature.fifths, score.key_signature.mode);
        Ok(Self {
            score,
            config: config.clone(),
            tonic,
            cadences: Vec::new(),
            motives: Vec::new(),
            sub_phrases: Vec::new(),
            phrases: Vec::new(),
            periods: Vec::new(),
            form: None,
            auxiliaries: AuxiliarySections::default(),
            mode: None,
            tree: None,
            processing: ProcessingInfo::default(),
        })
    }

    /// Create a state restricted to a measure window, sharing key and meter.
    /// Used by the chunked driver for leaf detection.
    pub fn window(&self, start_measure: u32, end_measure: u32) -> Self {
        let notes: Vec<Note> = self
            .score
            .notes
            .iter()
            .filter(|n| n.measure >= start_measure && n.measure <= end_measure)
            .cloned()
            .collect();
        let measures: Vec<Measure> = self
            .score
            .measures
            .iter()
            .filter(|m| m.number >= start_measure && m.number <= end_measure)
            .cloned()
            .collect();
        let score = ParsedScore {
            measures,
            notes,
            key_signature: self.score.key_signature,
            time_signature: self.score.time_signature,
            tempo: self.score.tempo,
            parts: self.score.parts.clone(),
        };
        Self {
            score,
            config: self.config.clone(),
            tonic: self.tonic,
            cadences: Vec::new(),
            motives: Vec::new(),
            sub_phrases: Vec::new(),
            phrases: Vec::new(),
            periods: Vec::new(),
            form: None,
            auxiliaries: AuxiliarySections::default(),
            mode: None,
            tree: None,
            processing: ProcessingInfo::default(),
        }
    }

    /// Fewer than 2 measures or no notes: all detectors return empty results
    pub fn is_insufficient(&self) -> bool {
        self.score.measure_count() < 2 || self.score.notes.is_empty()
    }
}
