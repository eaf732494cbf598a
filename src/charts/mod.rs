//! Evaluation statistics and chart rendering.
//!
//! Pure statistics over evaluation rows plus PNG renderers built on plotters.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::ChartError;
use crate::tools::evaluations::EvaluationRow;

const DIMENSIONS: &[(&str, fn(&EvaluationRow) -> i64)] = &[
    ("Testability", |e| e.testability_score),
    ("Specificity", |e| e.specificity_score),
    ("Realism", |e| e.realism_score),
    ("Safety", |e| e.safety_score),
    ("Learning Value", |e| e.learning_value_score),
];

/// Aggregate statistics over a set of hypothesis evaluations.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationStats {
    pub count: usize,
    pub overall_mean: f64,
    pub overall_min: f64,
    pub overall_max: f64,
    /// Mean per score dimension, keyed by dimension name.
    pub dimension_means: BTreeMap<String, f64>,
    /// Evaluations per whole-point overall-score bucket ("1".."5").
    pub score_distribution: BTreeMap<String, usize>,
}

/// Metadata about a rendered chart.
#[derive(Debug, Clone, Serialize)]
pub struct ChartOutput {
    pub chart_type: String,
    pub path: PathBuf,
    pub hypothesis_count: usize,
}

/// Compute aggregate statistics; `None` when there are no evaluations.
pub fn compute_statistics(evaluations: &[EvaluationRow]) -> Option<EvaluationStats> {
    if evaluations.is_empty() {
        return None;
    }

    let count = evaluations.len();
    let overall: Vec<f64> = evaluations.iter().map(|e| e.overall_score).collect();
    let overall_mean = overall.iter().sum::<f64>() / count as f64;
    let overall_min = overall.iter().cloned().fold(f64::INFINITY, f64::min);
    let overall_max = overall.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let mut dimension_means = BTreeMap::new();
    for (name, score_of) in DIMENSIONS {
        let mean =
            evaluations.iter().map(|e| score_of(e) as f64).sum::<f64>() / count as f64;
        dimension_means.insert((*name).to_string(), mean);
    }

    let mut score_distribution = BTreeMap::new();
    for bucket in 1..=5 {
        score_distribution.insert(bucket.to_string(), 0);
    }
    for evaluation in evaluations {
        let bucket = (evaluation.overall_score.floor() as i64).clamp(1, 5);
        *score_distribution.entry(bucket.to_string()).or_insert(0) += 1;
    }

    Some(EvaluationStats {
        count,
        overall_mean,
        overall_min,
        overall_max,
        dimension_means,
        score_distribution,
    })
}

/// Render a bar chart of overall scores, one bar per hypothesis.
pub fn render_score_bar_chart(
    evaluations: &[EvaluationRow],
    path: &Path,
) -> Result<ChartOutput, ChartError> {
    if evaluations.is_empty() {
        return Err(ChartError::NoData);
    }

    let root = BitMapBackend::new(path, (1024, 640)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Hypothesis Evaluation Scores", ("sans-serif", 24))
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(48)
        .build_cartesian_2d(0f64..evaluations.len() as f64, 0f64..5.5f64)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .y_desc("Overall score")
        .x_desc("Hypothesis")
        .disable_x_mesh()
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(evaluations.iter().enumerate().map(|(i, evaluation)| {
            let x0 = i as f64 + 0.15;
            let x1 = i as f64 + 0.85;
            Rectangle::new([(x0, 0.0), (x1, evaluation.overall_score)], BLUE.mix(0.6).filled())
        }))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;

    info!(path = %path.display(), count = evaluations.len(), "Rendered score bar chart");
    Ok(ChartOutput {
        chart_type: "bar".to_string(),
        path: path.to_path_buf(),
        hypothesis_count: evaluations.len(),
    })
}

/// Render a heatmap of per-dimension scores, one row per hypothesis.
pub fn render_dimension_heatmap(
    evaluations: &[EvaluationRow],
    path: &Path,
) -> Result<ChartOutput, ChartError> {
    if evaluations.is_empty() {
        return Err(ChartError::NoData);
    }

    let height = (240 + evaluations.len() * 28).min(2048) as u32;
    let root = BitMapBackend::new(path, (900, height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Evaluation Score Heatmap", ("sans-serif", 24))
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(48)
        .build_cartesian_2d(0f64..DIMENSIONS.len() as f64, 0f64..evaluations.len() as f64)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Dimension")
        .y_desc("Hypothesis")
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(evaluations.iter().enumerate().flat_map(|(row, evaluation)| {
            DIMENSIONS.iter().enumerate().map(move |(col, (_, score_of))| {
                let score = score_of(evaluation);
                // 1 (worst) reads red, 5 (best) reads green
                let intensity = (score - 1) as f64 / 4.0;
                let color = RGBColor(
                    (220.0 * (1.0 - intensity)) as u8 + 30,
                    (200.0 * intensity) as u8 + 40,
                    60,
                );
                Rectangle::new(
                    [
                        (col as f64 + 0.05, row as f64 + 0.05),
                        (col as f64 + 0.95, row as f64 + 0.95),
                    ],
                    color.filled(),
                )
            })
        }))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;

    info!(path = %path.display(), count = evaluations.len(), "Rendered dimension heatmap");
    Ok(ChartOutput {
        chart_type: "heatmap".to_string(),
        path: path.to_path_buf(),
        hypothesis_count: evaluations.len(),
    })
}

fn render_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Render {
        message: e.to_string(),
    }
}
