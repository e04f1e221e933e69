use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::classifier::PredictionRecord;
use crate::expand::{MatchResult, Venue};
use crate::team_names::TeamNameMap;

#[derive(Debug, Clone, PartialEq)]
pub struct SidePrediction {
    pub team: String,
    pub opponent: String,
    pub result: MatchResult,
    pub actual: u8,
    pub predicted: u8,
}

impl SidePrediction {
    fn from_record(record: &PredictionRecord) -> Self {
        let row = record.features.row();
        Self {
            team: row.team.clone(),
            opponent: row.opponent.clone(),
            result: row.result,
            actual: record.actual,
            predicted: record.predicted,
        }
    }
}

/// Both sides of one fixture, home on the left.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedPrediction {
    pub kickoff: NaiveDateTime,
    pub home: SidePrediction,
    pub away: SidePrediction,
}

impl MergedPrediction {
    /// At most one side is predicted to win.
    pub fn is_consistent(&self) -> bool {
        !(self.home.predicted == 1 && self.away.predicted == 1)
    }
}

/// Pairs every home prediction with the away prediction of the same
/// fixture. Team and opponent names are compared after canonicalisation;
/// rows whose counterpart is missing are dropped.
pub fn merge_predictions(
    predictions: &[PredictionRecord],
    names: &TeamNameMap,
) -> Vec<MergedPrediction> {
    let unmapped: BTreeSet<&str> = predictions
        .iter()
        .flat_map(|p| {
            let row = p.features.row();
            [row.team.as_str(), row.opponent.as_str()]
        })
        .filter(|name| names.lookup(name).is_err())
        .collect();
    if !unmapped.is_empty() {
        debug!(?unmapped, "Names without a short form keep their own name");
    }

    // (kickoff, canonical opponent) -> away-side rows
    let mut away_by_opponent: HashMap<(NaiveDateTime, &str), Vec<&PredictionRecord>> =
        HashMap::new();
    for record in predictions {
        let row = record.features.row();
        if row.venue == Venue::Away {
            away_by_opponent
                .entry((row.kickoff, names.canonical(&row.opponent)))
                .or_default()
                .push(record);
        }
    }

    let mut merged = Vec::new();
    let mut unmatched_home = 0usize;
    for left in predictions {
        let row = left.features.row();
        if row.venue != Venue::Home {
            continue;
        }

        let key = (row.kickoff, names.canonical(&row.team));
        let partner = away_by_opponent.get(&key).and_then(|candidates| {
            candidates.iter().find(|right| {
                names.canonical(&right.features.row().team) == names.canonical(&row.opponent)
            })
        });

        match partner {
            Some(right) => merged.push(MergedPrediction {
                kickoff: row.kickoff,
                home: SidePrediction::from_record(left),
                away: SidePrediction::from_record(right),
            }),
            None => unmatched_home += 1,
        }
    }

    let away_rows = predictions
        .iter()
        .filter(|p| p.features.row().venue == Venue::Away)
        .count();
    info!(
        predictions = predictions.len(),
        merged = merged.len(),
        unmatched_home,
        unmatched_away = away_rows.saturating_sub(merged.len()),
        "Merged home/away predictions"
    );

    merged
}
