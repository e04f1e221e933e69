use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::PipelineError;

pub const REQUIRED_COLUMNS: [&str; 7] = [
    "date_utc",
    "competition_code",
    "home_team",
    "away_team",
    "fulltime_home",
    "fulltime_away",
    "status",
];

pub const KICKOFF_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What to do with a finished fixture whose score cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ScorePolicy {
    /// Keep the fixture with an undefined score; it yields no team rows.
    #[default]
    Skip,
    /// Abort the run with `InvalidScoreValue`.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStatus {
    Finished,
    Other(String),
}

impl MatchStatus {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == "FINISHED" {
            MatchStatus::Finished
        } else {
            MatchStatus::Other(trimmed.to_string())
        }
    }
}

/// One source match as it appears in the results feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub kickoff: NaiveDateTime,
    pub competition: String,
    pub home_team: String,
    pub away_team: String,
    pub score: Option<Score>,
    pub status: MatchStatus,
}

#[derive(Debug, Clone)]
pub struct SourceFilter {
    pub competition: String,
    pub score_policy: ScorePolicy,
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self {
            competition: "FL1".to_string(),
            score_policy: ScorePolicy::Skip,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourceRow {
    date_utc: String,
    competition_code: String,
    home_team: String,
    away_team: String,
    #[serde(default)]
    fulltime_home: String,
    #[serde(default)]
    fulltime_away: String,
    status: String,
}

/// Reads the results feed and keeps finished fixtures of one competition.
pub fn load_fixtures(path: &Path, filter: &SourceFilter) -> Result<Vec<Fixture>> {
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open source file {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("read header of {}", path.display()))?
        .clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(PipelineError::MissingRequiredColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
            }
            .into());
        }
    }

    let mut fixtures = Vec::new();
    let mut total = 0usize;
    let mut other_competition = 0usize;
    let mut unfinished = 0usize;
    let mut bad_timestamps = 0usize;

    for (idx, row) in reader.deserialize::<SourceRow>().enumerate() {
        let row = row.with_context(|| format!("parse row {} of {}", idx + 2, path.display()))?;
        total += 1;

        if row.competition_code != filter.competition {
            other_competition += 1;
            continue;
        }

        let status = MatchStatus::parse(&row.status);
        if status != MatchStatus::Finished {
            unfinished += 1;
            continue;
        }

        let kickoff = match parse_kickoff(&row.date_utc) {
            Ok(kickoff) => kickoff,
            Err(err) if filter.score_policy == ScorePolicy::Skip => {
                warn!("Skipping {} vs {}: {}", row.home_team, row.away_team, err);
                bad_timestamps += 1;
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let score = match (parse_goals(&row.fulltime_home), parse_goals(&row.fulltime_away)) {
            (Some(home), Some(away)) => Some(Score { home, away }),
            (home, _) => {
                if filter.score_policy == ScorePolicy::Reject {
                    let value = if home.is_none() {
                        row.fulltime_home.clone()
                    } else {
                        row.fulltime_away.clone()
                    };
                    return Err(PipelineError::InvalidScoreValue {
                        value,
                        home: row.home_team,
                        away: row.away_team,
                        date: row.date_utc,
                    }
                    .into());
                }
                debug!(
                    "Undefined score for {} vs {} on {}",
                    row.home_team, row.away_team, row.date_utc
                );
                None
            }
        };

        fixtures.push(Fixture {
            kickoff,
            competition: row.competition_code,
            home_team: row.home_team,
            away_team: row.away_team,
            score,
            status,
        });
    }

    info!(
        total,
        kept = fixtures.len(),
        other_competition,
        unfinished,
        bad_timestamps,
        "Loaded {} fixtures from {}",
        filter.competition,
        path.display()
    );

    if fixtures.is_empty() {
        return Err(PipelineError::EmptyPartitionAfterFilter {
            stage: "competition and status filter",
        }
        .into());
    }

    Ok(fixtures)
}

/// Goals as published by the feed. Float renderings such as `2.0` are
/// accepted; blanks and anything fractional or negative are undefined.
pub fn parse_goals(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = trimmed.parse::<u32>() {
        return Some(value);
    }
    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

pub fn parse_kickoff(raw: &str) -> Result<NaiveDateTime, PipelineError> {
    let value = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.naive_utc());
    }
    for format in [KICKOFF_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| PipelineError::InvalidTimestamp {
            value: value.to_string(),
        })
}
