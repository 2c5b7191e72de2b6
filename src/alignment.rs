//! Chroma-based DTW alignment between symbolic measures and audio time
//!
//! The symbolic side is synthesised from the note stream at a fixed frame
//! rate per measure; the acoustic side comes from the external feature
//! extractor. Degenerate inputs never fail: they produce an empty path with
//! infinite distance and the zero-time convention for lookups.

use crate::config::AlignmentConfig;
use crate::score::{AudioFeatures, ParsedScore};
use ndarray::Array2;
use std::collections::BTreeMap;

/// DTW path plus the bidirectional measure/time maps derived from it
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AlignmentResult {
    /// Monotone (symbolic frame, acoustic frame) pairs
    pub path: Vec<(usize, usize)>,
    pub measure_to_time: BTreeMap<u32, f32>,
    /// Reverse map keyed on quantised time steps
    pub time_to_measure: BTreeMap<i64, u32>,
    pub confidence: f32,
    pub distance: f32,
    frames_per_measure: usize,
    time_quantum: f32,
    adjust_penalty: f32,
    confidence_floor: f32,
}

impl AlignmentResult {
    /// Empty alignment for degenerate input
    pub fn degenerate(config: &AlignmentConfig) -> Self {
        Self {
            path: Vec::new(),
            measure_to_time: BTreeMap::new(),
            time_to_measure: BTreeMap::new(),
            confidence: 0.0,
            distance: f32::INFINITY,
            frames_per_measure: config.frames_per_measure,
            time_quantum: config.time_quantum,
            adjust_penalty: config.adjust_penalty,
            confidence_floor: config.confidence_floor,
        }
    }

    /// Audio timestamp for a measure, interpolating between the two closest
    /// known measures. Unknown territory resolves to 0 by convention.
    pub fn measure_to_time(&self, measure: u32) -> f32 {
        if let Some(&t) = self.measure_to_time.get(&measure) {
            return t;
        }

        let below = self.measure_to_time.range(..measure).next_back();
        let above = self.measure_to_time.range(measure + 1..).next();

        match (below, above) {
            (Some((&m0, &t0)), Some((&m1, &t1))) => {
                let span = (m1 - m0) as f32;
                let frac = (measure - m0) as f32 / span;
                t0 + frac * (t1 - t0)
            }
            (Some((_, &t0)), None) => t0,
            (None, Some((_, &t1))) => t1,
            (None, None) => 0.0,
        }
    }

    /// Nearest-key lookup on the quantised reverse map
    pub fn time_to_measure(&self, time: f32) -> u32 {
        if self.time_to_measure.is_empty() {
            return 0;
        }
        let key = self.quantise(time);
        let below = self.time_to_measure.range(..=key).next_back();
        let above = self.time_to_measure.range(key..).next();
        match (below, above) {
            (Some((&k0, &m0)), Some((&k1, &m1))) => {
                if (key - k0) <= (k1 - key) {
                    m0
                } else {
                    m1
                }
            }
            (Some((_, &m0)), None) => m0,
            (None, Some((_, &m1))) => m1,
            (None, None) => 0,
        }
    }

    /// Manual correction: overwrite both directions, pay a confidence
    /// penalty, never dropping below the floor.
    pub fn adjust(&mut self, measure: u32, time: f32) {
        self.measure_to_time.insert(measure, time);
        self.time_to_measure.insert(self.quantise(time), measure);
        self.confidence = (self.confidence - self.adjust_penalty).max(self.confidence_floor);
    }

    fn quantise(&self, time: f32) -> i64 {
        (time / self.time_quantum).round() as i64
    }
}

/// Synthesise a chroma matrix from the note stream: `frames_per_measure`
/// rows per measure, uniform occupancy weighting, per-frame L1 norm.
pub fn symbolic_chroma(score: &ParsedScore, frames_per_measure: usize) -> Array2<f32> {
    let n_measures = score.measure_count();
    let n_frames = n_measures * frames_per_measure;
    let mut chroma = Array2::<f32>::zeros((n_frames, 12));
    if n_frames == 0 {
        return chroma;
    }

    let beats = score.time_signature.beats as f32;
    let frame_beats = beats / frames_per_measure as f32;

    for note in &score.notes {
        let pitch = match &note.pitch {
            Some(p) => p,
            None => continue,
        };
        let pc = pitch.pitch_class() as usize;
        let note_start = note.beat;
        let note_end = note.beat + note.duration;

        for frame in 0..frames_per_measure {
            let frame_start = frame as f32 * frame_beats;
            let frame_end = frame_start + frame_beats;
            let overlap = note_end.min(frame_end) - note_start.max(frame_start);
            if overlap <= 0.0 {
                continue;
            }
            let row = (note.measure as usize - 1) * frames_per_measure + frame;
            if row < n_frames {
                chroma[(row, pc)] += overlap;
            }
        }
    }

    // L1 normalisation per frame
    for mut row in chroma.rows_mut() {
        let sum: f32 = row.iter().sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        }
    }

    chroma
}

/// Acoustic chroma rows as an ndarray matrix
pub fn acoustic_chroma(audio: &AudioFeatures) -> Array2<f32> {
    let n = audio.chroma.len();
    let mut matrix = Array2::<f32>::zeros((n, 12));
    for (i, frame) in audio.chroma.iter().enumerate() {
        for (j, &v) in frame.iter().enumerate() {
            matrix[(i, j)] = v;
        }
    }
    matrix
}

/// Align a score against decoded audio features
pub fn align_score(
    score: &ParsedScore,
    audio: &AudioFeatures,
    config: &AlignmentConfig,
) -> AlignmentResult {
    let symbolic = symbolic_chroma(score, config.frames_per_measure);
    let acoustic = acoustic_chroma(audio);
    align(&symbolic, &acoustic, &audio.timestamps, config)
}

/// Core DTW over two chroma matrices (rows are frames)
pub fn align(
    symbolic: &Array2<f32>,
    acoustic: &Array2<f32>,
    acoustic_times: &[f32],
    config: &AlignmentConfig,
) -> AlignmentResult {
    let n = symbolic.nrows();
    let m = acoustic.nrows();
    if n == 0 || m == 0 {
        return AlignmentResult::degenerate(config);
    }

    // Cost matrix with the classic three-way recurrence
    let mut cost = Array2::<f32>::from_elem((n + 1, m + 1), f32::INFINITY);
    cost[(0, 0)] = 0.0;

    for i in 1..=n {
        for j in 1..=m {
            let d = frame_distance(symbolic, i - 1, acoustic, j - 1);
            let best = cost[(i - 1, j)]
                .min(cost[(i, j - 1)])
                .min(cost[(i - 1, j - 1)]);
            cost[(i, j)] = d + best;
        }
    }

    // Backtrack preferring the diagonal
    let mut path = Vec::new();
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        path.push((i - 1, j - 1));
        if i == 1 && j == 1 {
            break;
        }
        let diag = cost[(i - 1, j - 1)];
        let left = cost[(i, j - 1)];
        let up = cost[(i - 1, j)];
        if i > 1 && j > 1 && diag <= left && diag <= up {
            i -= 1;
            j -= 1;
        } else if j > 1 && (i == 1 || left <= up) {
            j -= 1;
        } else {
            i -= 1;
        }
    }
    path.reverse();

    let total = cost[(n, m)];
    let confidence = (1.0 - total / (n as f32 * m as f32)).clamp(0.0, 1.0);

    let mut result = AlignmentResult {
        path,
        measure_to_time: BTreeMap::new(),
        time_to_measure: BTreeMap::new(),
        confidence,
        distance: total,
        frames_per_measure: config.frames_per_measure,
        time_quantum: config.time_quantum,
        adjust_penalty: config.adjust_penalty,
        confidence_floor: config.confidence_floor,
    };

    build_maps(&mut result, acoustic_times);
    result
}

/// Euclidean distance over 12 chroma bins
fn frame_distance(a: &Array2<f32>, i: usize, b: &Array2<f32>, j: usize) -> f32 {
    let mut sum = 0.0f32;
    for bin in 0..12 {
        let diff = a[(i, bin)] - b[(j, bin)];
        sum += diff * diff;
    }
    sum.sqrt()
}

/// Derive the measure/time maps from the warp path: each measure maps at
/// its first symbolic frame.
fn build_maps(result: &mut AlignmentResult, acoustic_times: &[f32]) {
    let fpm = result.frames_per_measure.max(1);
    let path = result.path.clone();

    for &(sym_idx, ac_idx) in &path {
        if sym_idx % fpm != 0 {
            continue;
        }
        let measure = (sym_idx / fpm) as u32 + 1;
        if result.measure_to_time.contains_key(&measure) {
            continue;
        }
        let time = acoustic_times
            .get(ac_idx)
            .copied()
            .unwrap_or(ac_idx as f32 * result.time_quantum);
        result.measure_to_time.insert(measure, time);
        let key = (time / result.time_quantum).round() as i64;
        result.time_to_measure.entry(key).or_insert(measure);
    }
}
