use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::Serialize;

use crate::classifier::PredictionRecord;
use crate::fixtures::KICKOFF_FORMAT;
use crate::merge::MergedPrediction;

pub const TOP_TEAMS: usize = 5;
pub const SAMPLE_PREDICTIONS: usize = 10;
pub const SAMPLE_MERGED: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfusionCounts {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionCounts {
    pub fn from_predictions(predictions: &[PredictionRecord]) -> Self {
        let mut counts = Self::default();
        for p in predictions {
            match (p.actual, p.predicted) {
                (0, 0) => counts.true_negative += 1,
                (0, _) => counts.false_positive += 1,
                (_, 0) => counts.false_negative += 1,
                _ => counts.true_positive += 1,
            }
        }
        counts
    }

    /// Share of predicted wins that were wins. `None` without any predicted win.
    pub fn precision(&self) -> Option<f64> {
        let predicted_wins = self.true_positive + self.false_positive;
        (predicted_wins > 0).then(|| self.true_positive as f64 / predicted_wins as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamAccuracy {
    pub team: String,
    pub accuracy: f64,
    pub matches: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub accuracy: f64,
    pub precision: Option<f64>,
    pub confusion: ConfusionCounts,
    pub top_teams: Vec<TeamAccuracy>,
    pub merged_pairs: usize,
    pub consistent_pairs: usize,
}

pub fn summarize(predictions: &[PredictionRecord], merged: &[MergedPrediction]) -> Result<ReportSummary> {
    let total = predictions.len();
    let correct = predictions.iter().filter(|p| p.is_correct()).count();
    let confusion = ConfusionCounts::from_predictions(predictions);

    let mut top_teams = team_accuracy(predictions)?;
    top_teams.truncate(TOP_TEAMS);

    Ok(ReportSummary {
        total,
        correct,
        incorrect: total - correct,
        accuracy: if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        },
        precision: confusion.precision(),
        confusion,
        top_teams,
        merged_pairs: merged.len(),
        consistent_pairs: merged.iter().filter(|m| m.is_consistent()).count(),
    })
}

/// Per-team share of correct predictions, best first, ties by name.
pub fn team_accuracy(predictions: &[PredictionRecord]) -> Result<Vec<TeamAccuracy>> {
    if predictions.is_empty() {
        return Ok(Vec::new());
    }

    let teams: Vec<&str> = predictions
        .iter()
        .map(|p| p.features.row().team.as_str())
        .collect();
    let correct: Vec<f64> = predictions
        .iter()
        .map(|p| if p.is_correct() { 1.0 } else { 0.0 })
        .collect();

    let ranked = df!("team" => teams, "correct" => correct)?
        .lazy()
        .group_by([col("team")])
        .agg([
            col("correct").mean().alias("accuracy"),
            len().cast(DataType::Int64).alias("matches"),
        ])
        .collect()?;

    let team_col = ranked.column("team")?.str()?;
    let accuracy_col = ranked.column("accuracy")?.f64()?;
    let matches_col = ranked.column("matches")?.i64()?;

    let mut out: Vec<TeamAccuracy> = team_col
        .into_iter()
        .zip(accuracy_col.into_iter())
        .zip(matches_col.into_iter())
        .filter_map(|((team, accuracy), matches)| {
            Some(TeamAccuracy {
                team: team?.to_string(),
                accuracy: accuracy?,
                matches: matches?,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        b.accuracy
            .total_cmp(&a.accuracy)
            .then_with(|| a.team.cmp(&b.team))
    });
    Ok(out)
}

pub fn predictions_frame(predictions: &[PredictionRecord], limit: usize) -> PolarsResult<DataFrame> {
    let rows = &predictions[..limit.min(predictions.len())];
    df!(
        "date" => rows.iter().map(|p| p.features.row().kickoff.format(KICKOFF_FORMAT).to_string()).collect::<Vec<_>>(),
        "team" => rows.iter().map(|p| p.features.row().team.clone()).collect::<Vec<_>>(),
        "opponent" => rows.iter().map(|p| p.features.row().opponent.clone()).collect::<Vec<_>>(),
        "result" => rows.iter().map(|p| p.features.row().result.code()).collect::<Vec<_>>(),
        "actual" => rows.iter().map(|p| u32::from(p.actual)).collect::<Vec<_>>(),
        "prediction" => rows.iter().map(|p| u32::from(p.predicted)).collect::<Vec<_>>(),
    )
}

pub fn merged_frame(merged: &[MergedPrediction], limit: usize) -> PolarsResult<DataFrame> {
    let rows = &merged[..limit.min(merged.len())];
    df!(
        "date" => rows.iter().map(|m| m.kickoff.format(KICKOFF_FORMAT).to_string()).collect::<Vec<_>>(),
        "home" => rows.iter().map(|m| m.home.team.clone()).collect::<Vec<_>>(),
        "away" => rows.iter().map(|m| m.away.team.clone()).collect::<Vec<_>>(),
        "home_actual" => rows.iter().map(|m| u32::from(m.home.actual)).collect::<Vec<_>>(),
        "home_pred" => rows.iter().map(|m| u32::from(m.home.predicted)).collect::<Vec<_>>(),
        "away_actual" => rows.iter().map(|m| u32::from(m.away.actual)).collect::<Vec<_>>(),
        "away_pred" => rows.iter().map(|m| u32::from(m.away.predicted)).collect::<Vec<_>>(),
    )
}

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

pub fn print_report(
    summary: &ReportSummary,
    predictions: &[PredictionRecord],
    merged: &[MergedPrediction],
    competition: &str,
) -> Result<()> {
    let rule = "=".repeat(80);
    let thin = "-".repeat(80);

    println!("\n{rule}");
    println!("PREDICTION RESULTS - {}", competition.to_uppercase());
    println!("{rule}");
    println!("\nAccuracy: {}", percent(summary.accuracy));
    match summary.precision {
        Some(precision) => println!("Precision: {}", percent(precision)),
        None => println!("Precision: n/a (no win predicted)"),
    }
    println!("Predictions: {}", summary.total);
    println!("Correct: {}", summary.correct);
    println!("Incorrect: {}", summary.incorrect);

    let c = &summary.confusion;
    println!("\nConfusion (actual x predicted):");
    println!("              pred 0   pred 1");
    println!("  actual 0  {:>7}  {:>7}", c.true_negative, c.false_positive);
    println!("  actual 1  {:>7}  {:>7}", c.false_negative, c.true_positive);

    println!("\nBest team accuracy:");
    for team in &summary.top_teams {
        println!("  {:<28} {} ({} matches)", team.team, percent(team.accuracy), team.matches);
    }

    println!("\n{thin}");
    println!("SAMPLE PREDICTIONS (first {})", SAMPLE_PREDICTIONS);
    println!("{thin}");
    println!("{}", predictions_frame(predictions, SAMPLE_PREDICTIONS)?);

    println!("\n{thin}");
    println!("MERGED HOME/AWAY PREDICTIONS (first {})", SAMPLE_MERGED);
    println!("{thin}");
    println!("{}", merged_frame(merged, SAMPLE_MERGED)?);
    println!(
        "Merged fixtures: {} ({} with at most one predicted winner)",
        summary.merged_pairs, summary.consistent_pairs
    );
    println!("\n{rule}");

    Ok(())
}

pub fn write_summary_json(summary: &ReportSummary, out_file: &Path) -> Result<()> {
    if let Some(parent) = out_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let serialized = serde_json::to_vec_pretty(summary)?;
    fs::write(out_file, serialized)
        .with_context(|| format!("write report {}", out_file.display()))?;
    Ok(())
}
