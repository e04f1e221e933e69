//! End-to-end runs over a results feed: preparing the per-team match table,
//! predicting and reporting, and the league table views.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::classifier::{Classifier, ModelKind, PredictionRecord, TemporalSplit, TreeParams, make_predictions};
use crate::encode::encode;
use crate::enrich::{CsvShotStats, EnrichConfig, MatchRow, SyntheticShotStats, competition_label, enrich};
use crate::error::PipelineError;
use crate::expand::{ParticipantRecord, expand_fixtures};
use crate::export::write_features_parquet;
use crate::fixtures::{Fixture, SourceFilter, load_fixtures};
use crate::form::{DEFAULT_WINDOW, FormAggregator};
use crate::match_table::{describe, read_match_table, write_match_table};
use crate::merge::{MergedPrediction, merge_predictions};
use crate::report::{ReportSummary, print_report, summarize, write_summary_json};
use crate::standings::{
    HeadToHeadRow, StandingRow, head_to_head, head_to_head_frame, home_away_frame, standings,
    standings_frame,
};
use crate::team_names::TeamNameMap;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source: SourceFilter,
    pub enrich: EnrichConfig,
    pub window: usize,
    pub split: TemporalSplit,
    /// Seed for synthetic shot stats; `None` draws from entropy.
    pub seed: Option<u64>,
    pub model: ModelKind,
    pub tree: TreeParams,
    pub shot_stats: Option<PathBuf>,
    pub team_names: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: SourceFilter::default(),
            enrich: EnrichConfig::default(),
            window: DEFAULT_WINDOW,
            split: TemporalSplit::default(),
            seed: None,
            model: ModelKind::default(),
            tree: TreeParams::default(),
            shot_stats: None,
            team_names: None,
        }
    }
}

impl PipelineConfig {
    pub fn classifier(&self) -> Box<dyn Classifier> {
        self.model.build(self.tree)
    }

    pub fn team_name_map(&self) -> Result<TeamNameMap> {
        match &self.team_names {
            Some(path) => TeamNameMap::load(path),
            None => Ok(TeamNameMap::ligue1()),
        }
    }
}

/// How the shot columns of a built table were filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotStatsCoverage {
    Synthetic,
    /// Rows looked up in a stats file; `misses` fell back to synthetic draws.
    File { rows: usize, misses: usize },
}

fn enrich_records(
    records: &[ParticipantRecord],
    config: &PipelineConfig,
) -> Result<(Vec<MatchRow>, ShotStatsCoverage)> {
    let synthetic = SyntheticShotStats::new(config.seed);
    match &config.shot_stats {
        Some(path) => {
            let mut source = CsvShotStats::load(path, synthetic)?;
            let rows = enrich(records, &config.enrich, &mut source);
            let coverage = ShotStatsCoverage::File {
                rows: rows.len(),
                misses: source.misses(),
            };
            Ok((rows, coverage))
        }
        None => {
            let mut source = synthetic;
            let rows = enrich(records, &config.enrich, &mut source);
            Ok((rows, ShotStatsCoverage::Synthetic))
        }
    }
}

/// Where `predict` reads its rows from.
#[derive(Debug, Clone, Copy)]
pub enum PredictInput<'a> {
    /// The raw results feed.
    Source(&'a Path),
    /// A match table written earlier by `prepare`.
    Matches(&'a Path),
}

/// Optional files written by [`run_predict`].
#[derive(Debug, Clone, Default)]
pub struct PredictOutputs {
    pub features: Option<PathBuf>,
    pub report_json: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PredictOutcome {
    pub predictions: Vec<PredictionRecord>,
    pub merged: Vec<MergedPrediction>,
    pub summary: ReportSummary,
}

/// Expands fixtures into two team rows each and fills in the placeholder
/// columns.
pub fn build_match_table(fixtures: &[Fixture], config: &PipelineConfig) -> Result<Vec<MatchRow>> {
    let (records, undefined) = expand_fixtures(fixtures);
    if undefined > 0 {
        warn!("Dropped {} fixtures without a usable score", undefined);
    }
    if records.is_empty() {
        return Err(PipelineError::EmptyPartitionAfterFilter {
            stage: "row expansion",
        }
        .into());
    }

    let (rows, coverage) = enrich_records(&records, config)?;
    match coverage {
        ShotStatsCoverage::File { rows: looked_up, misses } => info!(
            looked_up,
            synthetic_fallback = misses,
            "Shot stats from file, {} of {} rows drawn synthetically",
            misses,
            looked_up
        ),
        ShotStatsCoverage::Synthetic => info!("Shot stats are synthetic for every row"),
    }
    info!(
        fixtures = fixtures.len(),
        rows = rows.len(),
        competition = %competition_label(&config.source.competition),
        "Built match table"
    );
    Ok(rows)
}

pub fn prepare(input: &Path, out_file: &Path, config: &PipelineConfig) -> Result<Vec<MatchRow>> {
    let fixtures = load_fixtures(input, &config.source)?;
    let rows = build_match_table(&fixtures, config)?;
    write_match_table(&rows, out_file)?;
    describe(&rows);
    Ok(rows)
}

/// Encoding, form aggregation, classification and merge over prepared rows.
/// Writes the feature table first when `features_out` is given.
pub fn predict(
    rows: Vec<MatchRow>,
    config: &PipelineConfig,
    classifier: &mut dyn Classifier,
    names: &TeamNameMap,
    features_out: Option<&Path>,
) -> Result<PredictOutcome> {
    let encoded = encode(rows)?;
    let features = FormAggregator::new(config.window).aggregate(encoded);
    if features.is_empty() {
        return Err(PipelineError::EmptyPartitionAfterFilter {
            stage: "form aggregation",
        }
        .into());
    }

    if let Some(path) = features_out {
        write_features_parquet(&features, path)?;
    }

    let predictions = make_predictions(features, &config.split, classifier)?;
    let merged = merge_predictions(&predictions, names);
    let summary = summarize(&predictions, &merged)?;

    Ok(PredictOutcome {
        predictions,
        merged,
        summary,
    })
}

pub fn load_rows(input: PredictInput<'_>, config: &PipelineConfig) -> Result<Vec<MatchRow>> {
    match input {
        PredictInput::Source(path) => {
            let fixtures = load_fixtures(path, &config.source)?;
            build_match_table(&fixtures, config)
        }
        PredictInput::Matches(path) => read_match_table(path),
    }
}

pub fn run_predict(
    input: PredictInput<'_>,
    config: &PipelineConfig,
    outputs: &PredictOutputs,
) -> Result<PredictOutcome> {
    let rows = load_rows(input, config)?;
    let names = config.team_name_map()?;
    let mut classifier = config.classifier();

    let outcome = predict(
        rows,
        config,
        classifier.as_mut(),
        &names,
        outputs.features.as_deref(),
    )?;

    print_report(
        &outcome.summary,
        &outcome.predictions,
        &outcome.merged,
        &competition_label(&config.source.competition),
    )?;

    if let Some(path) = &outputs.report_json {
        write_summary_json(&outcome.summary, path)?;
        info!("Wrote report to {}", path.display());
    }

    Ok(outcome)
}

pub fn run_standings(input: &Path, config: &PipelineConfig) -> Result<Vec<StandingRow>> {
    let fixtures = load_fixtures(input, &config.source)?;
    let names = config.team_name_map()?;
    let rows = standings(&fixtures, &names);

    let label = competition_label(&config.source.competition);
    println!("{} standings ({} teams)", label, rows.len());
    println!("{}", standings_frame(&rows)?);
    println!("\nHome / away");
    println!("{}", home_away_frame(&rows)?);
    Ok(rows)
}

pub fn run_head_to_head(input: &Path, team: &str, config: &PipelineConfig) -> Result<Vec<HeadToHeadRow>> {
    let fixtures = load_fixtures(input, &config.source)?;
    let names = config.team_name_map()?;
    let rows = head_to_head(&fixtures, &names, team);

    if rows.is_empty() {
        warn!("No finished fixtures found for {}", team);
    }
    println!("Head-to-head for {} ({} opponents)", team, rows.len());
    println!("{}", head_to_head_frame(&rows)?);
    Ok(rows)
}
