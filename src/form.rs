//! Per-team form features.
//!
//! Two kinds of aggregate are attached to every row: full-history team
//! strength (for the team and its opponent) and a rolling mean over the
//! team's previous matches. The rolling window never includes the row's own
//! match, and rows without a full window of history are left out.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::encode::EncodedRow;
use crate::enrich::MatchRow;

pub const DEFAULT_WINDOW: usize = 3;

pub const ROLLING_COLUMNS: [&str; 8] = ["gf", "ga", "sh", "sot", "dist", "fk", "pk", "pkatt"];

pub const FEATURE_NAMES: [&str; 18] = [
    "h/a",
    "opp",
    "hour",
    "day",
    "avg_gf",
    "avg_ga",
    "win_rate",
    "avg_gf_opp",
    "avg_ga_opp",
    "win_rate_opp",
    "gf_rolling",
    "ga_rolling",
    "sh_rolling",
    "sot_rolling",
    "dist_rolling",
    "fk_rolling",
    "pk_rolling",
    "pkatt_rolling",
];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TeamStrength {
    pub avg_gf: f64,
    pub avg_ga: f64,
    pub win_rate: f64,
}

/// Means of [`ROLLING_COLUMNS`], in that order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RollingForm(pub [f64; 8]);

impl RollingForm {
    pub fn goals_for(&self) -> f64 {
        self.0[0]
    }

    pub fn goals_against(&self) -> f64 {
        self.0[1]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub encoded: EncodedRow,
    pub strength: TeamStrength,
    pub opponent_strength: TeamStrength,
    pub rolling: RollingForm,
}

impl FeatureRow {
    pub fn row(&self) -> &MatchRow {
        &self.encoded.row
    }

    pub fn target(&self) -> u8 {
        self.encoded.row.target()
    }

    /// Classifier inputs, in [`FEATURE_NAMES`] order.
    pub fn features(&self) -> [f64; 18] {
        let e = &self.encoded;
        let mut out = [0.0; 18];
        out[0] = f64::from(e.venue_code);
        out[1] = f64::from(e.opponent_code);
        out[2] = f64::from(e.hour);
        out[3] = f64::from(e.weekday);
        out[4] = self.strength.avg_gf;
        out[5] = self.strength.avg_ga;
        out[6] = self.strength.win_rate;
        out[7] = self.opponent_strength.avg_gf;
        out[8] = self.opponent_strength.avg_ga;
        out[9] = self.opponent_strength.win_rate;
        out[10..].copy_from_slice(&self.rolling.0);
        out
    }
}

fn stat_values(row: &MatchRow) -> [f64; 8] {
    [
        f64::from(row.goals_for),
        f64::from(row.goals_against),
        f64::from(row.sh),
        f64::from(row.sot),
        row.dist,
        f64::from(row.fk),
        f64::from(row.pk),
        f64::from(row.pkatt),
    ]
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// All-time mean goals for/against and win rate per team, to 2 decimals.
pub fn team_strengths(rows: &[EncodedRow]) -> HashMap<String, TeamStrength> {
    let mut totals: HashMap<&str, (f64, f64, f64, usize)> = HashMap::new();
    for encoded in rows {
        let row = &encoded.row;
        let entry = totals.entry(row.team.as_str()).or_insert((0.0, 0.0, 0.0, 0));
        entry.0 += f64::from(row.goals_for);
        entry.1 += f64::from(row.goals_against);
        entry.2 += f64::from(row.target());
        entry.3 += 1;
    }

    totals
        .into_iter()
        .map(|(team, (gf, ga, wins, n))| {
            let n = n as f64;
            (
                team.to_string(),
                TeamStrength {
                    avg_gf: round2(gf / n),
                    avg_ga: round2(ga / n),
                    win_rate: round2(wins / n),
                },
            )
        })
        .collect()
}

/// Rolling means for one team's rows, already in kickoff order. Entry `i`
/// averages rows `i - window .. i`; the first `window` entries are `None`.
pub fn rolling_form(history: &[EncodedRow], window: usize) -> Vec<Option<RollingForm>> {
    (0..history.len())
        .map(|idx| {
            if window == 0 || idx < window {
                return None;
            }
            let mut sums = [0.0; 8];
            for prior in &history[idx - window..idx] {
                for (sum, value) in sums.iter_mut().zip(stat_values(&prior.row)) {
                    *sum += value;
                }
            }
            Some(RollingForm(sums.map(|sum| sum / window as f64)))
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct FormAggregator {
    window: usize,
}

impl Default for FormAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl FormAggregator {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    /// Output is grouped by team (lexical order), each group in kickoff order.
    pub fn aggregate(&self, rows: Vec<EncodedRow>) -> Vec<FeatureRow> {
        let strengths = team_strengths(&rows);
        let input_rows = rows.len();

        let mut by_team: BTreeMap<String, Vec<EncodedRow>> = BTreeMap::new();
        for row in rows {
            by_team.entry(row.row.team.clone()).or_default().push(row);
        }

        let mut out = Vec::with_capacity(input_rows);
        let mut cold_start = 0usize;
        let mut unknown_opponent = 0usize;

        for (team, mut history) in by_team {
            history.sort_by_key(|r| r.row.kickoff);
            let windows = rolling_form(&history, self.window);
            let strength = strengths.get(&team).copied().unwrap_or_default();

            for (encoded, rolling) in history.into_iter().zip(windows) {
                let Some(rolling) = rolling else {
                    cold_start += 1;
                    continue;
                };
                let Some(opponent_strength) = strengths.get(&encoded.row.opponent).copied() else {
                    debug!("No history for opponent {}", encoded.row.opponent);
                    unknown_opponent += 1;
                    continue;
                };
                out.push(FeatureRow {
                    encoded,
                    strength,
                    opponent_strength,
                    rolling,
                });
            }
        }

        info!(
            input_rows,
            kept = out.len(),
            cold_start,
            unknown_opponent,
            window = self.window,
            "Computed rolling form"
        );
        out
    }
}
