//! League table and head-to-head records built from the same fixtures the
//! predictor consumes.

use std::cmp::Ordering;
use std::collections::HashMap;

use polars::prelude::*;
use serde::Serialize;

use crate::fixtures::Fixture;
use crate::team_names::{TeamNameMap, is_same_team, normalize_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TableLine {
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
}

impl TableLine {
    pub fn apply(&mut self, goals_for: u32, goals_against: u32) {
        self.played += 1;
        self.goals_for += goals_for;
        self.goals_against += goals_against;
        match goals_for.cmp(&goals_against) {
            Ordering::Greater => {
                self.won += 1;
                self.points += 3;
            }
            Ordering::Equal => {
                self.drawn += 1;
                self.points += 1;
            }
            Ordering::Less => self.lost += 1,
        }
    }

    pub fn goal_difference(&self) -> i64 {
        i64::from(self.goals_for) - i64::from(self.goals_against)
    }

    /// `None` before the first match.
    pub fn points_per_match(&self) -> Option<f64> {
        (self.played > 0).then(|| f64::from(self.points) / f64::from(self.played))
    }
}

fn rank(a_name: &str, a: &TableLine, b_name: &str, b: &TableLine) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.goal_difference().cmp(&a.goal_difference()))
        .then_with(|| b.goals_for.cmp(&a.goals_for))
        .then_with(|| normalize_name(a_name).cmp(&normalize_name(b_name)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingRow {
    pub team: String,
    pub overall: TableLine,
    pub home: TableLine,
    pub away: TableLine,
}

pub fn standings(fixtures: &[Fixture], names: &TeamNameMap) -> Vec<StandingRow> {
    let mut by_team: HashMap<String, StandingRow> = HashMap::new();

    for fixture in fixtures {
        let Some(score) = fixture.score else {
            continue;
        };
        let home = names.canonical(&fixture.home_team).to_string();
        let away = names.canonical(&fixture.away_team).to_string();

        let entry = by_team.entry(home.clone()).or_insert_with(|| StandingRow {
            team: home,
            overall: TableLine::default(),
            home: TableLine::default(),
            away: TableLine::default(),
        });
        entry.overall.apply(score.home, score.away);
        entry.home.apply(score.home, score.away);

        let entry = by_team.entry(away.clone()).or_insert_with(|| StandingRow {
            team: away,
            overall: TableLine::default(),
            home: TableLine::default(),
            away: TableLine::default(),
        });
        entry.overall.apply(score.away, score.home);
        entry.away.apply(score.away, score.home);
    }

    let mut rows: Vec<StandingRow> = by_team.into_values().collect();
    rows.sort_by(|a, b| rank(&a.team, &a.overall, &b.team, &b.overall));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadToHeadRow {
    pub opponent: String,
    pub line: TableLine,
}

/// Record of `team` against every opponent it met. `team` is matched
/// loosely (see [`is_same_team`]).
pub fn head_to_head(fixtures: &[Fixture], names: &TeamNameMap, team: &str) -> Vec<HeadToHeadRow> {
    let mut by_opponent: HashMap<String, TableLine> = HashMap::new();

    for fixture in fixtures {
        let Some(score) = fixture.score else {
            continue;
        };
        let home = names.canonical(&fixture.home_team);
        let away = names.canonical(&fixture.away_team);

        let (opponent, goals_for, goals_against) = if is_same_team(team, home) {
            (away, score.home, score.away)
        } else if is_same_team(team, away) {
            (home, score.away, score.home)
        } else {
            continue;
        };

        by_opponent
            .entry(opponent.to_string())
            .or_default()
            .apply(goals_for, goals_against);
    }

    let mut rows: Vec<HeadToHeadRow> = by_opponent
        .into_iter()
        .map(|(opponent, line)| HeadToHeadRow { opponent, line })
        .collect();
    rows.sort_by(|a, b| rank(&a.opponent, &a.line, &b.opponent, &b.line));
    rows
}

fn line_columns(prefix: &str, lines: &[TableLine]) -> Vec<Series> {
    let column = |name: &str, f: fn(&TableLine) -> i64| {
        Series::new(
            &format!("{prefix}{name}"),
            lines.iter().map(f).collect::<Vec<i64>>(),
        )
    };
    vec![
        column("MP", |l| i64::from(l.played)),
        column("W", |l| i64::from(l.won)),
        column("D", |l| i64::from(l.drawn)),
        column("L", |l| i64::from(l.lost)),
        column("GF", |l| i64::from(l.goals_for)),
        column("GA", |l| i64::from(l.goals_against)),
        column("GD", |l| l.goal_difference()),
        column("Pts", |l| i64::from(l.points)),
    ]
}

fn ranked_frame(label: &str, names: Vec<String>, sections: &[(&str, Vec<TableLine>)]) -> PolarsResult<DataFrame> {
    let ranks: Vec<u32> = (1..=names.len() as u32).collect();
    let mut columns = vec![Series::new("Rk", ranks), Series::new(label, names)];
    for (prefix, lines) in sections {
        columns.extend(line_columns(prefix, lines));
    }
    DataFrame::new(columns)
}

/// Overall table with a `Pts/MP` column, blank for a side without matches.
pub fn standings_frame(rows: &[StandingRow]) -> PolarsResult<DataFrame> {
    let names = rows.iter().map(|r| r.team.clone()).collect();
    let overall: Vec<TableLine> = rows.iter().map(|r| r.overall).collect();
    let per_match: Vec<String> = overall
        .iter()
        .map(|line| {
            line.points_per_match()
                .map(|ppm| format!("{ppm:.2}"))
                .unwrap_or_default()
        })
        .collect();

    let mut df = ranked_frame("Squad", names, &[("", overall)])?;
    df.with_column(Series::new("Pts/MP", per_match))?;
    Ok(df)
}

pub fn home_away_frame(rows: &[StandingRow]) -> PolarsResult<DataFrame> {
    let names = rows.iter().map(|r| r.team.clone()).collect();
    let home = rows.iter().map(|r| r.home).collect();
    let away = rows.iter().map(|r| r.away).collect();
    ranked_frame("Squad", names, &[("Home ", home), ("Away ", away)])
}

pub fn head_to_head_frame(rows: &[HeadToHeadRow]) -> PolarsResult<DataFrame> {
    let names = rows.iter().map(|r| r.opponent.clone()).collect();
    let lines = rows.iter().map(|r| r.line).collect();
    ranked_frame("Opponent", names, &[("", lines)])
}
