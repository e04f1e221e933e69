//! Fills the columns the per-team match table expects but the results feed
//! does not carry.
//!
//! The shot and set-piece numbers produced by [`SyntheticShotStats`] are
//! random draws. They only give the form aggregator a complete table and say
//! nothing about what happened on the pitch. Supply a [`CsvShotStats`] when
//! real numbers are available.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::expand::{MatchResult, ParticipantRecord, Venue};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShotStats {
    pub shots: u32,
    pub shots_on_target: u32,
    pub distance: f64,
    pub free_kicks: u32,
    pub penalties: u32,
    pub penalty_attempts: u32,
}

pub trait ShotStatsSource {
    fn stats_for(&mut self, record: &ParticipantRecord) -> ShotStats;
}

/// Independent uniform draws per record. Penalty attempts mirror penalties.
pub struct SyntheticShotStats {
    rng: StdRng,
}

impl SyntheticShotStats {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl ShotStatsSource for SyntheticShotStats {
    fn stats_for(&mut self, _record: &ParticipantRecord) -> ShotStats {
        let penalties = self.rng.gen_range(0..2);
        ShotStats {
            shots: self.rng.gen_range(10..25),
            shots_on_target: self.rng.gen_range(3..10),
            distance: self.rng.gen_range(15.0..25.0),
            free_kicks: self.rng.gen_range(0..5),
            penalties,
            penalty_attempts: penalties,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ShotStatsRow {
    date: String,
    team: String,
    sh: u32,
    sot: u32,
    dist: f64,
    fk: u32,
    pk: u32,
    pkatt: u32,
}

/// Real per-match numbers keyed by (match day, team), with a synthetic
/// fallback for rows the file does not cover.
pub struct CsvShotStats {
    by_match: HashMap<(NaiveDate, String), ShotStats>,
    fallback: SyntheticShotStats,
    misses: usize,
}

impl CsvShotStats {
    pub fn load(path: &Path, fallback: SyntheticShotStats) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("open shot stats {}", path.display()))?;

        let mut by_match = HashMap::new();
        for (idx, row) in reader.deserialize::<ShotStatsRow>().enumerate() {
            let row = row.with_context(|| format!("parse row {} of {}", idx + 2, path.display()))?;
            let date = crate::fixtures::parse_kickoff(&row.date)?.date();
            let stats = ShotStats {
                shots: row.sh,
                shots_on_target: row.sot,
                distance: row.dist,
                free_kicks: row.fk,
                penalties: row.pk,
                penalty_attempts: row.pkatt,
            };
            by_match.insert((date, row.team), stats);
        }

        info!("Loaded {} shot stat rows from {}", by_match.len(), path.display());
        Ok(Self::from_map(by_match, fallback))
    }

    pub fn from_map(
        by_match: HashMap<(NaiveDate, String), ShotStats>,
        fallback: SyntheticShotStats,
    ) -> Self {
        Self {
            by_match,
            fallback,
            misses: 0,
        }
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl ShotStatsSource for CsvShotStats {
    fn stats_for(&mut self, record: &ParticipantRecord) -> ShotStats {
        let key = (record.kickoff.date(), record.team.clone());
        match self.by_match.get(&key) {
            Some(stats) => *stats,
            None => {
                self.misses += 1;
                debug!("No shot stats for {} on {}", record.team, key.0);
                self.fallback.stats_for(record)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub kickoff_time: String,
    pub formation: String,
    pub season: String,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            kickoff_time: "20:00".to_string(),
            formation: "4-3-3".to_string(),
            season: "2025".to_string(),
        }
    }
}

/// One row of the per-team match table, fields in file column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    #[serde(rename = "date", with = "kickoff_format")]
    pub kickoff: NaiveDateTime,
    pub time: String,
    pub comp: String,
    pub round: String,
    pub day: String,
    pub venue: Venue,
    pub result: MatchResult,
    #[serde(rename = "gf")]
    pub goals_for: u32,
    #[serde(rename = "ga")]
    pub goals_against: u32,
    pub opponent: String,
    pub attendance: u32,
    pub captain: String,
    pub formation: String,
    pub referee: String,
    #[serde(rename = "match report")]
    pub match_report: String,
    pub notes: String,
    pub sh: u32,
    pub sot: u32,
    pub dist: f64,
    pub fk: u32,
    pub pk: u32,
    pub pkatt: u32,
    pub season: String,
    pub team: String,
}

impl MatchRow {
    pub fn shots(&self) -> ShotStats {
        ShotStats {
            shots: self.sh,
            shots_on_target: self.sot,
            distance: self.dist,
            free_kicks: self.fk,
            penalties: self.pk,
            penalty_attempts: self.pkatt,
        }
    }

    /// 1 for a win, 0 otherwise.
    pub fn target(&self) -> u8 {
        u8::from(self.result.is_win())
    }
}

pub fn competition_label(code: &str) -> String {
    match code {
        "FL1" => "Ligue 1",
        "PL" => "Premier League",
        "BL1" => "Bundesliga",
        "SA" => "Serie A",
        "PD" => "La Liga",
        "DED" => "Eredivisie",
        "PPL" => "Primeira Liga",
        "ELC" => "Championship",
        "CL" => "Champions League",
        other => other,
    }
    .to_string()
}

/// Adds placeholder columns and per-team round labels. Rounds count each
/// team's appearances in kickoff order; output keeps the input order.
pub fn enrich(
    records: &[ParticipantRecord],
    config: &EnrichConfig,
    source: &mut dyn ShotStatsSource,
) -> Vec<MatchRow> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by_key(|&idx| records[idx].kickoff);

    let mut rounds = vec![0usize; records.len()];
    let mut appearances: HashMap<&str, usize> = HashMap::new();
    for idx in order {
        let count = appearances.entry(records[idx].team.as_str()).or_insert(0);
        *count += 1;
        rounds[idx] = *count;
    }

    records
        .iter()
        .zip(rounds)
        .map(|(record, round)| {
            let shots = source.stats_for(record);
            MatchRow {
                kickoff: record.kickoff,
                time: config.kickoff_time.clone(),
                comp: competition_label(&record.competition),
                round: format!("Matchweek {}", round),
                day: record.kickoff.format("%a").to_string(),
                venue: record.venue,
                result: record.result,
                goals_for: record.goals_for,
                goals_against: record.goals_against,
                opponent: record.opponent.clone(),
                attendance: 0,
                captain: String::new(),
                formation: config.formation.clone(),
                referee: String::new(),
                match_report: String::new(),
                notes: String::new(),
                sh: shots.shots,
                sot: shots.shots_on_target,
                dist: shots.distance,
                fk: shots.free_kicks,
                pk: shots.penalties,
                pkatt: shots.penalty_attempts,
                season: config.season.clone(),
                team: record.team.clone(),
            }
        })
        .collect()
}

pub(crate) mod kickoff_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::fixtures::{KICKOFF_FORMAT, parse_kickoff};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(KICKOFF_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_kickoff(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(team: &str, opponent: &str, day: u32) -> ParticipantRecord {
        ParticipantRecord {
            kickoff: NaiveDate::from_ymd_opt(2024, 9, day)
                .unwrap()
                .and_hms_opt(19, 0, 0)
                .unwrap(),
            competition: "FL1".to_string(),
            team: team.to_string(),
            opponent: opponent.to_string(),
            venue: Venue::Home,
            goals_for: 1,
            goals_against: 0,
            result: MatchResult::Win,
        }
    }

    #[test]
    fn synthetic_draws_stay_in_range() {
        let mut source = SyntheticShotStats::new(Some(7));
        let base = record("Lille OSC", "FC Nantes", 1);
        for _ in 0..500 {
            let stats = source.stats_for(&base);
            assert!((10..25).contains(&stats.shots));
            assert!((3..10).contains(&stats.shots_on_target));
            assert!((15.0..25.0).contains(&stats.distance));
            assert!(stats.free_kicks < 5);
            assert!(stats.penalties < 2);
            assert_eq!(stats.penalty_attempts, stats.penalties);
        }
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let base = record("Lille OSC", "FC Nantes", 1);
        let mut a = SyntheticShotStats::new(Some(42));
        let mut b = SyntheticShotStats::new(Some(42));
        for _ in 0..20 {
            assert_eq!(a.stats_for(&base), b.stats_for(&base));
        }
    }

    #[test]
    fn rounds_count_appearances_in_kickoff_order() {
        let records = vec![
            record("Lille OSC", "FC Nantes", 20),
            record("Lille OSC", "AJ Auxerre", 5),
            record("FC Nantes", "Lille OSC", 20),
            record("Lille OSC", "Angers SCO", 12),
        ];
        let mut source = SyntheticShotStats::new(Some(1));

        let rows = enrich(&records, &EnrichConfig::default(), &mut source);
        let rounds: Vec<&str> = rows.iter().map(|r| r.round.as_str()).collect();
        assert_eq!(rounds, ["Matchweek 3", "Matchweek 1", "Matchweek 1", "Matchweek 2"]);
        assert_eq!(rows[0].comp, "Ligue 1");
        assert_eq!(rows[0].time, "20:00");
        assert_eq!(rows[0].formation, "4-3-3");
        assert_eq!(rows[0].day, "Fri");
        assert_eq!(rows[0].target(), 1);
    }

    #[test]
    fn csv_source_falls_back_for_missing_rows() {
        let known = record("Lille OSC", "FC Nantes", 1);
        let real = ShotStats {
            shots: 31,
            shots_on_target: 12,
            distance: 14.2,
            free_kicks: 2,
            penalties: 1,
            penalty_attempts: 1,
        };
        let mut by_match = HashMap::new();
        by_match.insert((known.kickoff.date(), known.team.clone()), real);
        let mut source = CsvShotStats::from_map(by_match, SyntheticShotStats::new(Some(3)));

        assert_eq!(source.stats_for(&known), real);
        let fallback = source.stats_for(&record("FC Nantes", "Lille OSC", 1));
        assert!((10..25).contains(&fallback.shots));
        assert_eq!(source.misses(), 1);
    }

    #[test]
    fn unknown_competition_codes_label_as_themselves() {
        assert_eq!(competition_label("PL"), "Premier League");
        assert_eq!(competition_label("WC"), "WC");
    }
}
