//! Ordered analysis passes
//!
//! Leaf passes (motives, sub_phrases) may run per chunk; every pass from
//! cadences onward needs the full note stream for harmonic context.

pub mod cadences;
pub mod form;
pub mod mode;
pub mod motives;
pub mod periods;
pub mod phrases;
pub mod sub_phrases;
pub mod tree;

use crate::config::Config;
use crate::error::Result as ScoreResult;
use crate::score::ScoreState;

/// Run the complete pass sequence on a whole-stream state
pub fn run_all(state: &mut ScoreState, config: &Config) -> ScoreResult<()> {
    cadences::run(state, config)?;
    motives::run(state, config)?;
    sub_phrases::run(state, config)?;
    phrases::run(state, config)?;
    periods::run(state, config)?;
    form::run(state, config)?;
    mode::run(state, config)?;
    tree::run(state, config)?;
    Ok(())
}

/// Run only the harmonically global passes, assuming leaf results
/// (motives, sub-phrases) are already merged into the state
pub fn run_global(state: &mut ScoreState, config: &Config) -> ScoreResult<()> {
    cadences::run(state, config)?;
    phrases::run(state, config)?;
    periods::run(state, config)?;
    form::run(state, config)?;
    mode::run(state, config)?;
    tree::run(state, config)?;
    Ok(())
}
