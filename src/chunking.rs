//! Chunked processing driver for long scores
//!
//! Leaf detectors (motives, sub-phrases) run per overlapping measure window
//! and merge on an ownership cut inside the overlap region. Cadence, phrase,
//! period, form, and mode detection always run on the whole stream because
//! harmonic context is global.

use crate::analysis::{Motive, SubPhrase};
use crate::config::Config;
use crate::error::Result as ScoreResult;
use crate::passes;
use crate::score::{ParsedScore, ScoreState};

/// Analyze a score, choosing chunked processing automatically for long input
pub fn analyze(score: ParsedScore, config: &Config) -> ScoreResult<ScoreState> {
    let needs_chunking = score.notes.len() >= 2 * config.chunking.max_notes_per_chunk
        || score.measure_count() as u32 >= 2 * config.chunking.max_measures_per_chunk;

    if needs_chunking {
        analyze_complete_chunked(score, config)
    } else {
        analyze_complete(score, config)
    }
}

/// Run the full pipeline on the whole note stream
pub fn analyze_complete(score: ParsedScore, config: &Config) -> ScoreResult<ScoreState> {
    let mut state = ScoreState::new(score, config)?;
    passes::run_all(&mut state, config)?;
    state.processing.chunked = false;
    state.processing.chunk_count = 1;
    Ok(state)
}

/// Run leaf detectors per chunk, merge, then run the global passes
pub fn analyze_complete_chunked(score: ParsedScore, config: &Config) -> ScoreResult<ScoreState> {
    let mut state = ScoreState::new(score, config)?;

    let first = state.score.first_measure().unwrap_or(1);
    let last = state.score.last_measure().unwrap_or(first);
    let ranges = chunk_ranges(
        first,
        last,
        config.chunking.max_measures_per_chunk,
        config.chunking.overlap_measures,
    );

    let mut motives: Vec<Motive> = Vec::new();
    let mut sub_phrases: Vec<SubPhrase> = Vec::new();
    let mut skipped = 0usize;

    for (k, &(range_start, range_end)) in ranges.iter().enumerate() {
        let mut window = state.window(range_start, range_end);
        let result = passes::motives::run(&mut window, config)
            .and_then(|_| passes::sub_phrases::run(&mut window, config));

        if let Err(err) = result {
            eprintln!(
                "Warning: chunk {}-{} failed, skipping leaf detection: {}",
                range_start, range_end, err
            );
            skipped += 1;
            continue;
        }

        // Ownership cut: the first half of the overlap belongs to the
        // preceding chunk
        let own_start = if k == 0 {
            first
        } else {
            range_start + config.chunking.overlap_measures / 2
        };
        let own_end = if k + 1 == ranges.len() {
            last
        } else {
            ranges[k + 1].0 + config.chunking.overlap_measures / 2 - 1
        };

        motives.extend(
            window
                .motives
                .into_iter()
                .filter(|m| m.measure >= own_start && m.measure <= own_end),
        );
        sub_phrases.extend(
            window
                .sub_phrases
                .into_iter()
                .filter(|s| s.start_measure >= own_start && s.start_measure <= own_end),
        );
    }

    // Restore stream-wide indexing and predecessor links
    for (i, motive) in motives.iter_mut().enumerate() {
        motive.index = i;
        if motive.related_to.is_some() {
            motive.related_to = if i > 0 { Some(i - 1) } else { None };
        }
    }
    passes::sub_phrases::relabel_materials(&mut sub_phrases, config);

    // Window-local motive indices are stale after the merge; re-link by
    // position
    for sub in &mut sub_phrases {
        sub.motive_indices = motives
            .iter()
            .filter(|m| {
                m.measure == sub.start_measure
                    && m.start_beat >= sub.start_beat
                    && m.start_beat < sub.end_beat
            })
            .map(|m| m.index)
            .collect();
    }

    state.motives = motives;
    state.sub_phrases = sub_phrases;
    passes::run_global(&mut state, config)?;

    state.processing.chunked = true;
    state.processing.chunk_count = ranges.len();
    state.processing.skipped_chunks = skipped;
    Ok(state)
}

/// Overlapping measure windows with stride `max_measures - overlap`
pub fn chunk_ranges(first: u32, last: u32, max_measures: u32, overlap: u32) -> Vec<(u32, u32)> {
    let stride = max_measures.saturating_sub(overlap).max(1);
    let mut ranges = Vec::new();
    let mut start = first;

    loop {
        let end = (start + max_measures - 1).min(last);
        ranges.push((start, end));
        if end >= last {
            break;
        }
        start += stride;
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_ranges_cover_and_overlap() {
        let ranges = chunk_ranges(1, 100, 32, 4);
        assert_eq!(ranges.first(), Some(&(1, 32)));
        // Stride 28: next window starts inside the previous one
        assert_eq!(ranges[1].0, 29);
        assert_eq!(ranges.last().unwrap().1, 100);
        for pair in ranges.windows(2) {
            assert!(pair[1].0 <= pair[0].1, "windows must overlap");
        }
    }

    #[test]
    fn test_chunk_ranges_single_window() {
        let ranges = chunk_ranges(1, 20, 32, 4);
        assert_eq!(ranges, vec![(1, 20)]);
    }
}
