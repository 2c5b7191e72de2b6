//! Form classification cascade and auxiliary-section detection

use crate::analysis::{
    AuxiliarySections, Closure, FormAnalysis, FormType, MaterialPattern, MeasureRange,
    MiddleSectionType, Period, Phrase, Section, SectionFunction, SonataComponent,
};
use crate::config::Config;
use crate::error::Result as ScoreResult;
use crate::score::{ParsedScore, ScoreState};
use crate::similarity;

use super::phrases::compare_phrase_heads;

/// Classify the overall form and detect auxiliary sections
pub fn run(state: &mut ScoreState, config: &Config) -> ScoreResult<()> {
    state.form = Some(detect_form(&state.periods, config));
    state.auxiliaries = detect_auxiliaries(&state.score, &state.periods, &state.phrases, config);
    Ok(())
}

/// Letter pattern summary over the period materials
pub fn material_pattern(periods: &[Period]) -> MaterialPattern {
    let letters: Vec<char> = periods
        .iter()
        .map(|p| p.material.chars().next().unwrap_or('a'))
        .collect();
    let pattern: String = letters.iter().collect();

    let mut counts = std::collections::BTreeMap::new();
    for &letter in &letters {
        *counts.entry(letter).or_insert(0) += 1;
    }

    // Most frequent letter; ties resolve to the earliest appearance
    let mut main_material = letters.first().copied().unwrap_or('a');
    let mut main_count = 0usize;
    for &letter in &letters {
        let count = counts[&letter];
        if count > main_count {
            main_count = count;
            main_material = letter;
        }
    }

    let has_recapitulation =
        letters.len() >= 3 && letters.first() == letters.last();

    MaterialPattern {
        pattern,
        counts,
        main_material,
        has_recapitulation,
    }
}

/// Melodic similarity between two whole periods
pub fn period_similarity(a: &Period, b: &Period, config: &Config) -> f32 {
    similarity::note_similarity(&a.notes(), &b.notes(), &config.similarity)
}

/// Prioritised form cascade over the period list
pub fn detect_form(periods: &[Period], config: &Config) -> FormAnalysis {
    let n = periods.len();
    let pattern = material_pattern(periods);

    let mut result = match n {
        0 => FormAnalysis {
            form_type: FormType::OnePart,
            sections: Vec::new(),
            confidence: 0.5,
            description: "Insufficient material for form classification".to_string(),
        },
        1 => FormAnalysis {
            form_type: FormType::OnePart,
            sections: vec![simple_section(0, "A", SectionFunction::Statement, &periods[0])],
            confidence: 0.9,
            description: "One-part form (single period)".to_string(),
        },
        2 => classify_binary(periods, config),
        3 => classify_ternary(periods, &pattern, config),
        _ => classify_large(periods, &pattern, config),
    };

    // Popular-form probe can replace a weaker winner
    if let Some(popular) = probe_popular_form(periods, &pattern) {
        if popular.confidence > result.confidence {
            result = popular;
        }
    }

    result
}

fn classify_binary(periods: &[Period], config: &Config) -> FormAnalysis {
    let rounded = match (periods[0].phrases.first(), periods[1].phrases.last()) {
        (Some(opening), Some(closing)) => {
            compare_phrase_heads(opening, closing, config) > config.form.binary_recap_head_sim
        }
        _ => false,
    };

    let mut second = simple_section(1, "B", SectionFunction::Contrast, &periods[1]);
    if rounded {
        second.recapitulation_type = Some("partial".to_string());
    }

    FormAnalysis {
        form_type: if rounded {
            FormType::BinaryRounded
        } else {
            FormType::BinaryParallel
        },
        sections: vec![
            simple_section(0, "A", SectionFunction::Statement, &periods[0]),
            second,
        ],
        confidence: 0.8,
        description: if rounded {
            "Rounded binary form (opening material returns)".to_string()
        } else {
            "Parallel binary form".to_string()
        },
    }
}

fn classify_ternary(
    periods: &[Period],
    pattern: &MaterialPattern,
    config: &Config,
) -> FormAnalysis {
    if pattern.has_recapitulation {
        let middle_type = classify_middle_section(&periods[1], &periods[0], config);
        let mut middle = simple_section(1, "B", SectionFunction::Contrast, &periods[1]);
        middle.middle_type = Some(middle_type);

        let recap_sim = period_similarity(&periods[0], &periods[2], config);
        let mut reprise = simple_section(2, "A'", SectionFunction::Restatement, &periods[2]);
        reprise.recapitulation_type = Some(recap_type(recap_sim, config));

        FormAnalysis {
            form_type: FormType::TernarySimple,
            sections: vec![
                simple_section(0, "A", SectionFunction::Statement, &periods[0]),
                middle,
                reprise,
            ],
            confidence: 0.8,
            description: "Simple ternary form (A B A')".to_string(),
        }
    } else {
        FormAnalysis {
            form_type: FormType::TernaryParallel,
            sections: vec![
                simple_section(0, "A", SectionFunction::Statement, &periods[0]),
                simple_section(1, "B", SectionFunction::Contrast, &periods[1]),
                simple_section(2, "C", SectionFunction::Contrast, &periods[2]),
            ],
            confidence: 0.8,
            description: "Parallel ternary form (A B C)".to_string(),
        }
    }
}

/// Cascade for four or more periods:
/// variation, rondo, sonata, compound ternary, then fallback.
fn classify_large(
    periods: &[Period],
    pattern: &MaterialPattern,
    config: &Config,
) -> FormAnalysis {
    if let Some(form) = try_variation(periods, config) {
        return form;
    }
    if let Some(form) = try_rondo(periods, pattern, config) {
        return form;
    }
    if let Some(form) = try_sonata(periods, config) {
        return form;
    }
    if pattern.has_recapitulation {
        return classify_ternary_compound(periods, config);
    }

    // Fallback: sectional one-part reading, one section per period
    let sections = periods
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let letter = p.material.chars().next().unwrap_or('a');
            simple_section(
                i,
                &letter.to_uppercase().to_string(),
                SectionFunction::Statement,
                p,
            )
        })
        .collect();
    FormAnalysis {
        form_type: FormType::OnePart,
        sections,
        confidence: 0.5,
        description: "Through-composed sectional form".to_string(),
    }
}

fn try_variation(periods: &[Period], config: &Config) -> Option<FormAnalysis> {
    let n = periods.len();
    let mut in_band = 0usize;
    let mut sims = Vec::new();
    for period in &periods[1..] {
        let sim = period_similarity(&periods[0], period, config);
        sims.push(sim);
        if sim > config.form.variation_sim_min && sim < config.form.variation_sim_max {
            in_band += 1;
        }
    }

    let ratio = in_band as f32 / (n - 1) as f32;
    if ratio < config.form.variation_ratio {
        return None;
    }

    let mut sections = vec![simple_section(
        0,
        "Theme",
        SectionFunction::Statement,
        &periods[0],
    )];
    for (i, period) in periods[1..].iter().enumerate() {
        let mut section = simple_section(
            i + 1,
            &format!("Var. {}", i + 1),
            SectionFunction::Variation,
            period,
        );
        section.variation_type = Some(if sims[i] >= config.form.variation_sim_max {
            "ornamental".to_string()
        } else {
            "character".to_string()
        });
        sections.push(section);
    }

    Some(FormAnalysis {
        form_type: FormType::Variation,
        sections,
        confidence: 0.7 + 0.2 * ratio,
        description: format!("Theme and {} variations", n - 1),
    })
}

fn try_rondo(
    periods: &[Period],
    pattern: &MaterialPattern,
    config: &Config,
) -> Option<FormAnalysis> {
    let n = periods.len();
    if n < config.form.rondo_min_periods {
        return None;
    }

    let main = pattern.main_material;
    let main_count = *pattern.counts.get(&main).unwrap_or(&0);
    if main_count < config.form.rondo_min_refrains {
        return None;
    }

    let episode_count = pattern.counts.keys().filter(|&&c| c != main).count();
    if episode_count < config.form.rondo_min_episodes {
        return None;
    }

    let mut refrain_seen = 0usize;
    let sections = periods
        .iter()
        .enumerate()
        .map(|(i, period)| {
            let letter = period.material.chars().next().unwrap_or('a');
            if letter == main {
                refrain_seen += 1;
                let mut section =
                    simple_section(i, &main.to_uppercase().to_string(), SectionFunction::Refrain, period);
                section.is_recurrence = Some(refrain_seen > 1);
                section
            } else {
                simple_section(
                    i,
                    &letter.to_uppercase().to_string(),
                    SectionFunction::Episode,
                    period,
                )
            }
        })
        .collect();

    let confidence =
        (0.5 + 0.1 * main_count as f32 + 0.1 * episode_count as f32).min(0.9);

    Some(FormAnalysis {
        form_type: FormType::Rondo,
        sections,
        confidence,
        description: format!(
            "Rondo with {} refrain statements and {} episode materials",
            main_count, episode_count
        ),
    })
}

fn try_sonata(periods: &[Period], config: &Config) -> Option<FormAnalysis> {
    let n = periods.len();
    if n < config.form.sonata_min_periods {
        return None;
    }

    let third = (n / 3).max(1);
    let recap_start = n - third;

    // The final third must restate opening material
    let recap_sims: Vec<f32> = periods[recap_start..]
        .iter()
        .map(|p| period_similarity(&periods[0], p, config))
        .collect();
    if !recap_sims.iter().any(|&s| s > config.form.sonata_recap_sim) {
        return None;
    }

    let region = |label: &str,
                  function: SectionFunction,
                  idx: usize,
                  range: std::ops::Range<usize>,
                  components: Option<Vec<SonataComponent>>| {
        let start = periods[range.start].start_measure;
        let end = periods[range.end - 1].end_measure;
        Section {
            id: format!("s{}", idx),
            name: label.to_string(),
            section_type: label.to_string(),
            start_measure: start,
            end_measure: end,
            function,
            periods: range.collect(),
            middle_type: None,
            components,
            variation_type: None,
            is_recurrence: None,
            recapitulation_type: None,
        }
    };

    let expo_components: Vec<SonataComponent> = periods[..third]
        .iter()
        .map(|p| SonataComponent {
            name: format!("theme group {}", p.index + 1),
            start_measure: p.start_measure,
            end_measure: p.end_measure,
            varied: false,
        })
        .collect();
    let recap_components: Vec<SonataComponent> = periods[recap_start..]
        .iter()
        .zip(recap_sims.iter())
        .map(|(p, &sim)| SonataComponent {
            name: format!("theme group {}", p.index + 1),
            start_measure: p.start_measure,
            end_measure: p.end_measure,
            varied: sim < config.form.sonata_varied_sim,
        })
        .collect();

    let sections = vec![
        region(
            "Exposition",
            SectionFunction::Exposition,
            0,
            0..third,
            Some(expo_components),
        ),
        region(
            "Development",
            SectionFunction::Development,
            1,
            third..recap_start,
            None,
        ),
        region(
            "Recapitulation",
            SectionFunction::Recapitulation,
            2,
            recap_start..n,
            Some(recap_components),
        ),
    ];

    Some(FormAnalysis {
        form_type: FormType::Sonata,
        sections,
        confidence: 0.7,
        description: "Sonata form (exposition, development, recapitulation)".to_string(),
    })
}

fn classify_ternary_compound(periods: &[Period], config: &Config) -> FormAnalysis {
    let n = periods.len();
    let letters: Vec<char> = periods
        .iter()
        .map(|p| p.material.chars().next().unwrap_or('a'))
        .collect();
    let main = letters[0];

    // Outer sections absorb the leading and trailing runs of main material;
    // everything between is the contrasting B region
    let mut lead = letters.iter().take_while(|&&c| c == main).count();
    let mut trail = letters.iter().rev().take_while(|&&c| c == main).count();
    if lead + trail >= n {
        lead = 1;
        trail = 1;
    }
    let b_range = lead..n - trail;

    let recap_sim = period_similarity(&periods[0], &periods[n - 1], config);

    let a_section = Section {
        id: "s0".to_string(),
        name: "A".to_string(),
        section_type: "A".to_string(),
        start_measure: periods[0].start_measure,
        end_measure: periods[lead - 1].end_measure,
        function: SectionFunction::Statement,
        periods: (0..lead).collect(),
        middle_type: None,
        components: None,
        variation_type: None,
        is_recurrence: None,
        recapitulation_type: None,
    };

    let b_section = Section {
        id: "s1".to_string(),
        name: "B".to_string(),
        section_type: "B".to_string(),
        start_measure: periods[b_range.start].start_measure,
        end_measure: periods[b_range.end - 1].end_measure,
        function: SectionFunction::Contrast,
        periods: b_range.clone().collect(),
        middle_type: Some(classify_middle_section(
            &periods[b_range.start],
            &periods[0],
            config,
        )),
        components: None,
        variation_type: None,
        is_recurrence: None,
        recapitulation_type: None,
    };

    let mut reprise = Section {
        id: "s2".to_string(),
        name: "A'".to_string(),
        section_type: "A'".to_string(),
        start_measure: periods[n - trail].start_measure,
        end_measure: periods[n - 1].end_measure,
        function: SectionFunction::Restatement,
        periods: (n - trail..n).collect(),
        middle_type: None,
        components: None,
        variation_type: None,
        is_recurrence: None,
        recapitulation_type: None,
    };
    reprise.recapitulation_type = Some(recap_type(recap_sim, config));

    FormAnalysis {
        form_type: FormType::TernaryCompound,
        sections: vec![a_section, b_section, reprise],
        confidence: 0.85,
        description: "Compound ternary form (A B A')".to_string(),
    }
}

/// Middle-section classification, ordered trio > development > episode
pub fn classify_middle_section(
    middle: &Period,
    opening: &Period,
    config: &Config,
) -> MiddleSectionType {
    if middle.closure == Closure::Closed && middle.phrase_count() >= 2 {
        return MiddleSectionType::Trio;
    }
    let sim = period_similarity(opening, middle, config);
    if sim > config.form.middle_development_sim && middle.phrase_count() < 2 {
        return MiddleSectionType::Development;
    }
    MiddleSectionType::Episode
}

/// Two-material alternation and AABA probes
fn probe_popular_form(periods: &[Period], pattern: &MaterialPattern) -> Option<FormAnalysis> {
    if pattern.counts.len() != 2 {
        return None;
    }

    let letters: Vec<char> = pattern.pattern.chars().collect();
    let a = letters[0];
    let b = *letters.iter().find(|&&c| c != a)?;

    if pattern.pattern == "aaba" {
        let functions = [
            SectionFunction::Verse,
            SectionFunction::Verse,
            SectionFunction::Bridge,
            SectionFunction::Verse,
        ];
        let sections = periods
            .iter()
            .zip(functions.iter())
            .enumerate()
            .map(|(i, (p, &f))| {
                let letter = p.material.chars().next().unwrap_or('a');
                simple_section(i, &letter.to_uppercase().to_string(), f, p)
            })
            .collect();
        return Some(FormAnalysis {
            form_type: FormType::Aaba,
            sections,
            confidence: 0.8,
            description: "Thirty-two-bar AABA song form".to_string(),
        });
    }

    if is_alternating(&letters, a, b) || is_alternating(&letters, b, a) {
        let sections = periods
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let letter = p.material.chars().next().unwrap_or('a');
                let function = if letter == a {
                    SectionFunction::Verse
                } else {
                    SectionFunction::Chorus
                };
                simple_section(i, &letter.to_uppercase().to_string(), function, p)
            })
            .collect();
        return Some(FormAnalysis {
            form_type: FormType::VerseChorus,
            sections,
            confidence: 0.75,
            description: "Alternating verse-chorus form".to_string(),
        });
    }

    None
}

/// Matches `(xy)+x?`: strict alternation starting at `x`
fn is_alternating(letters: &[char], x: char, y: char) -> bool {
    if letters.len() < 2 || letters[0] != x {
        return false;
    }
    for (i, &c) in letters.iter().enumerate() {
        let expected = if i % 2 == 0 { x } else { y };
        if c != expected {
            return false;
        }
    }
    // At least one complete xy pair
    letters.len() >= 2 && letters[1] == y
}

fn recap_type(similarity: f32, config: &Config) -> String {
    if similarity >= config.form.sonata_varied_sim {
        "complete".to_string()
    } else {
        "varied".to_string()
    }
}

fn simple_section(index: usize, name: &str, function: SectionFunction, period: &Period) -> Section {
    Section {
        id: format!("s{}", index),
        name: name.to_string(),
        section_type: name.to_string(),
        start_measure: period.start_measure,
        end_measure: period.end_measure,
        function,
        periods: vec![period.index],
        middle_type: None,
        components: None,
        variation_type: None,
        is_recurrence: None,
        recapitulation_type: None,
    }
}

/// Introduction, coda/codetta, transitions, and over-length phrase extensions
pub fn detect_auxiliaries(
    score: &ParsedScore,
    periods: &[Period],
    phrases: &[Phrase],
    config: &Config,
) -> AuxiliarySections {
    let mut aux = AuxiliarySections::default();

    let first = match score.first_measure() {
        Some(m) => m,
        None => return aux,
    };
    let last = score.last_measure().unwrap_or(first);

    if let (Some(head), Some(tail)) = (periods.first(), periods.last()) {
        if head.start_measure > first {
            aux.introduction = Some(MeasureRange {
                start_measure: first,
                end_measure: head.start_measure - 1,
            });
        }
        if tail.end_measure < last {
            let range = MeasureRange {
                start_measure: tail.end_measure + 1,
                end_measure: last,
            };
            let length = range.end_measure - range.start_measure + 1;
            if length > config.form.coda_min_length {
                aux.coda = Some(range);
            } else {
                aux.codetta = Some(range);
            }
        }
    }

    for pair in periods.windows(2) {
        if pair[1].start_measure > pair[0].end_measure + 1 {
            aux.transitions.push(MeasureRange {
                start_measure: pair[0].end_measure + 1,
                end_measure: pair[1].start_measure - 1,
            });
        }
    }

    let extension_limit =
        config.form.typical_phrase_length as f32 * config.form.extension_factor;
    for phrase in phrases {
        if phrase.length() as f32 > extension_limit {
            aux.extensions.push(phrase.index);
        }
    }

    aux
}
