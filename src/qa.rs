//! QA artifacts generation

use crate::analysis::FullAnalysis;
use crate::config::Config;
use crate::error::{Result as ScoreResult, ScoreError};
use crate::tree::{StructureTree, StructureType};
use plotters::prelude::*;
use std::fs;

/// Generate QA artifacts (structure timeline, confidence heatmap, report)
pub fn generate_artifacts(
    analysis: &FullAnalysis,
    output_dir: &std::path::Path,
    config: &Config,
) -> ScoreResult<()> {
    let qa_dir = output_dir.join("qa");
    fs::create_dir_all(&qa_dir)?;

    println!("Generating QA artifacts...");

    if config.qa.generate_images {
        generate_structure_plot(analysis, &qa_dir, config)?;
        generate_confidence_plot(analysis, &qa_dir, config)?;
    }
    generate_report(analysis, &qa_dir)?;

    println!("QA artifacts generated in {}", qa_dir.display());
    Ok(())
}

/// Node depth from the root, for timeline stacking
fn node_depth(tree: &StructureTree, mut id: usize) -> usize {
    let mut depth = 0;
    while let Some(parent) = tree.get(id).and_then(|n| n.parent) {
        depth += 1;
        id = parent;
    }
    depth
}

fn level_color(node_type: StructureType) -> RGBColor {
    match node_type {
        StructureType::Section => RGBColor(66, 103, 178),
        StructureType::Theme => RGBColor(88, 166, 92),
        StructureType::Period => RGBColor(222, 165, 56),
        StructureType::Phrase => RGBColor(204, 88, 66),
        StructureType::SubPhrase => RGBColor(142, 96, 188),
        StructureType::Motive => RGBColor(96, 150, 180),
    }
}

/// Timeline of structure nodes: measures on x, hierarchy depth on y
fn generate_structure_plot(
    analysis: &FullAnalysis,
    output_dir: &std::path::Path,
    config: &Config,
) -> ScoreResult<()> {
    let path = output_dir.join("structure.png");
    let root = BitMapBackend::new(&path, (config.qa.image_width, config.qa.image_height))
        .into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ScoreError::QaGenerationError(format!("fill failed: {:?}", e)))?;

    let tree = &analysis.tree;
    let max_measure = tree
        .nodes()
        .iter()
        .map(|n| n.end_measure)
        .max()
        .unwrap_or(1) as f32;
    let max_depth = tree
        .ids()
        .map(|id| node_depth(tree, id))
        .max()
        .unwrap_or(0) as f32;

    let mut chart = ChartBuilder::on(&root)
        .caption("Structure timeline", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0f32..max_measure + 1.0, 0f32..max_depth + 1.0)
        .map_err(|e| ScoreError::QaGenerationError(format!("chart build failed: {:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("Measure")
        .y_desc("Depth")
        .draw()
        .map_err(|e| ScoreError::QaGenerationError(format!("mesh draw failed: {:?}", e)))?;

    let bars: Vec<_> = tree
        .ids()
        .filter_map(|id| tree.get(id).map(|n| (id, n)))
        .map(|(id, node)| {
            let depth = node_depth(tree, id) as f32;
            let color = level_color(node.node_type).mix(node.visual_style.opacity as f64);
            Rectangle::new(
                [
                    (node.start_measure as f32, depth + 0.1),
                    (node.end_measure as f32 + 1.0, depth + 0.9),
                ],
                color.filled(),
            )
        })
        .collect();

    chart
        .draw_series(bars)
        .map_err(|e| ScoreError::QaGenerationError(format!("series draw failed: {:?}", e)))?;

    root.present()
        .map_err(|e| ScoreError::QaGenerationError(format!("present failed: {:?}", e)))?;
    Ok(())
}

/// Per-node confidence bars in arena order
fn generate_confidence_plot(
    analysis: &FullAnalysis,
    output_dir: &std::path::Path,
    config: &Config,
) -> ScoreResult<()> {
    let path = output_dir.join("confidence.png");
    let root = BitMapBackend::new(&path, (config.qa.image_width, config.qa.image_height))
        .into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ScoreError::QaGenerationError(format!("fill failed: {:?}", e)))?;

    let tree = &analysis.tree;
    let n = tree.len().max(1) as f32;

    let mut chart = ChartBuilder::on(&root)
        .caption("Node confidence", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0f32..n, 0f32..1.05f32)
        .map_err(|e| ScoreError::QaGenerationError(format!("chart build failed: {:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("Node")
        .y_desc("Confidence")
        .draw()
        .map_err(|e| ScoreError::QaGenerationError(format!("mesh draw failed: {:?}", e)))?;

    let bars: Vec<_> = tree
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let color = level_color(node.node_type);
            Rectangle::new(
                [(i as f32 + 0.1, 0.0), (i as f32 + 0.9, node.confidence)],
                color.filled(),
            )
        })
        .collect();

    chart
        .draw_series(bars)
        .map_err(|e| ScoreError::QaGenerationError(format!("series draw failed: {:?}", e)))?;

    root.present()
        .map_err(|e| ScoreError::QaGenerationError(format!("present failed: {:?}", e)))?;
    Ok(())
}

/// Plain-text statistics report
fn generate_report(analysis: &FullAnalysis, output_dir: &std::path::Path) -> ScoreResult<()> {
    let stats = &analysis.statistics;
    let mut report = String::new();

    report.push_str("Structure analysis report\n");
    report.push_str("=========================\n\n");
    report.push_str(&format!(
        "Form: {} (confidence {:.2})\n",
        analysis.form.form_type.name(),
        analysis.form.confidence
    ));
    report.push_str(&format!("{}\n\n", analysis.form.description));
    report.push_str(&format!("Measures:      {}\n", stats.measure_count));
    report.push_str(&format!("Notes:         {}\n", stats.note_count));
    report.push_str(&format!("Cadences:      {}\n", stats.cadence_count));
    report.push_str(&format!("Motives:       {}\n", stats.motive_count));
    report.push_str(&format!("Sub-phrases:   {}\n", stats.sub_phrase_count));
    report.push_str(&format!("Phrases:       {}\n", stats.phrase_count));
    report.push_str(&format!("Periods:       {}\n", stats.period_count));
    report.push_str(&format!("Sections:      {}\n", stats.section_count));
    report.push_str(&format!(
        "Mean node confidence: {:.3}\n",
        stats.mean_node_confidence
    ));

    if let Some(mode) = &analysis.mode {
        report.push_str(&format!(
            "\nMode: {} ({:.2}), runner-up {} ({:.2})\n",
            mode.scale.name(),
            mode.confidence,
            mode.runner_up.name(),
            mode.runner_up_confidence
        ));
    }

    if analysis.processing.chunked {
        report.push_str(&format!(
            "\nChunked processing: {} chunks, {} skipped\n",
            analysis.processing.chunk_count, analysis.processing.skipped_chunks
        ));
    }

    fs::write(output_dir.join("report.txt"), report)?;
    Ok(())
}
