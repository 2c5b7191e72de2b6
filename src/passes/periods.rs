//! Greedy period grouping, classification, and compound-period merging

use crate::analysis::{
    cadence_strength, Closure, Period, PeriodType, Phrase, PhraseRelationship, Proportion,
};
use crate::config::Config;
use crate::error::Result as ScoreResult;
use crate::score::ScoreState;
use crate::similarity;

use super::phrases::compare_phrase_heads;

/// Group phrases into periods and store them on the state
pub fn run(state: &mut ScoreState, config: &Config) -> ScoreResult<()> {
    if state.is_insufficient() {
        state.periods = Vec::new();
        return Ok(());
    }
    let grouped = group_periods(&state.phrases, config);
    state.periods = merge_compound_periods(grouped, config);
    Ok(())
}

/// Greedy accumulation: a period ends on a strong cadence once it holds two
/// phrases, at four phrases, or when the next phrase opens a new section.
pub fn group_periods(phrases: &[Phrase], config: &Config) -> Vec<Period> {
    let mut periods: Vec<Period> = Vec::new();
    let mut group: Vec<Phrase> = Vec::new();

    for (i, phrase) in phrases.iter().enumerate() {
        group.push(phrase.clone());

        let strong =
            cadence_strength(phrase.cadence.as_ref()) > config.period.strong_cadence;
        let next_breaks = strong
            && phrases
                .get(i + 1)
                .map(|next| {
                    compare_phrase_heads(phrase, next, config)
                        < config.period.section_break_head_sim
                })
                .unwrap_or(false);

        let close = (strong && group.len() >= 2)
            || group.len() >= config.period.max_phrases
            || next_breaks;

        if close {
            periods.push(build_period(periods.len(), std::mem::take(&mut group), config));
        }
    }

    if !group.is_empty() {
        periods.push(build_period(periods.len(), group, config));
    }

    periods
}

fn build_period(index: usize, phrases: Vec<Phrase>, config: &Config) -> Period {
    let start_measure = phrases.first().map(|p| p.start_measure).unwrap_or(1);
    let end_measure = phrases.last().map(|p| p.end_measure).unwrap_or(start_measure);
    let period_type = classify_period_type(&phrases, config);
    let proportion = classify_proportion(&phrases, config);
    let closure = phrases.last().map(|p| p.closure).unwrap_or(Closure::Open);
    let material = phrases.first().map(|p| p.material.clone()).unwrap_or_default();
    let cadence = phrases.last().and_then(|p| p.cadence.clone());

    Period {
        index,
        start_measure,
        end_measure,
        phrases,
        period_type,
        proportion,
        closure,
        material,
        cadence,
    }
}

/// Period type from phrase count and pairwise relationships
pub fn classify_period_type(phrases: &[Phrase], config: &Config) -> PeriodType {
    match phrases.len() {
        0 | 1 => PeriodType::Parallel,
        2 => {
            let consequent = &phrases[1];
            let head_sim = consequent.head_similarity.unwrap_or(0.0);
            if consequent.relationship == Some(PhraseRelationship::Parallel)
                || head_sim > config.period.compound_head_sim
            {
                PeriodType::Parallel
            } else if is_sequential_relation(&phrases[0], consequent, config) {
                PeriodType::Sequential
            } else {
                PeriodType::Contrasting
            }
        }
        3 => PeriodType::ThreePhrase,
        4 => PeriodType::FourPhrase,
        _ => PeriodType::Compound,
    }
}

/// Sequence test: strongly matching intervals at a nonzero transposition
pub fn is_sequential_relation(a: &Phrase, b: &Phrase, config: &Config) -> bool {
    let interval_sim = similarity::interval_similarity(
        &similarity::interval_pattern(&a.notes),
        &similarity::interval_pattern(&b.notes),
        &config.similarity,
    );
    let transposition = similarity::detect_transposition(&a.notes, &b.notes);
    interval_sim > config.period.sequential_interval_sim && transposition != 0
}

/// Square needs equal phrase lengths at a power of two; equal otherwise is
/// regular; unequal is non-square.
pub fn classify_proportion(phrases: &[Phrase], config: &Config) -> Proportion {
    if phrases.is_empty() {
        return Proportion::NonSquare;
    }
    let first_len = phrases[0].length();
    let all_equal = phrases.iter().all(|p| p.length() == first_len);
    if !all_equal {
        return Proportion::NonSquare;
    }
    if first_len >= config.period.square_min_length && first_len.is_power_of_two() {
        Proportion::Square
    } else {
        Proportion::Regular
    }
}

/// Merge consecutive AA' period pairs into compound periods: matching
/// openings with the second pair member closing more strongly.
pub fn merge_compound_periods(periods: Vec<Period>, config: &Config) -> Vec<Period> {
    let mut merged: Vec<Period> = Vec::new();
    let mut i = 0;

    while i < periods.len() {
        let is_compound_pair = i + 1 < periods.len() && {
            let p1 = &periods[i];
            let p2 = &periods[i + 1];
            match (p1.phrases.first(), p2.phrases.first()) {
                (Some(h1), Some(h2)) => {
                    compare_phrase_heads(h1, h2, config) > config.period.compound_head_sim
                        && cadence_strength(p2.cadence.as_ref())
                            > cadence_strength(p1.cadence.as_ref())
                }
                _ => false,
            }
        };

        if is_compound_pair {
            let p1 = periods[i].clone();
            let p2 = periods[i + 1].clone();
            let mut phrases = p1.phrases;
            phrases.extend(p2.phrases);
            let proportion = classify_proportion(&phrases, config);
            merged.push(Period {
                index: merged.len(),
                start_measure: p1.start_measure,
                end_measure: p2.end_measure,
                phrases,
                period_type: PeriodType::Compound,
                proportion,
                closure: p2.closure,
                material: p1.material,
                cadence: p2.cadence,
            });
            i += 2;
        } else {
            let mut period = periods[i].clone();
            period.index = merged.len();
            merged.push(period);
            i += 1;
        }
    }

    merged
}
