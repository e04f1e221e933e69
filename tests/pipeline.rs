use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use ligue1_predictor::classifier::ModelKind;
use ligue1_predictor::encode::encode;
use ligue1_predictor::fixtures::ScorePolicy;
use ligue1_predictor::form::FormAggregator;
use ligue1_predictor::pipeline::{self, PipelineConfig, PredictInput, PredictOutputs};
use ligue1_predictor::team_names::TeamNameMap;
use ligue1_predictor::PipelineError;
use tempfile::TempDir;

const TEAMS: [&str; 4] = [
    "Paris Saint-Germain FC",
    "Lille OSC",
    "OGC Nice",
    "AS Monaco FC",
];

const MATCH_TABLE_HEADER: &str = "date,time,comp,round,day,venue,result,gf,ga,opponent,attendance,captain,formation,referee,match report,notes,sh,sot,dist,fk,pk,pkatt,season,team";

/// Twenty weekly rounds for four clubs from 2024-09-01, a two-match pair of
/// clubs, one finished fixture without a score and rows the filter drops.
fn season_csv() -> String {
    let mut out = String::from(
        "date_utc,competition_code,home_team,away_team,fulltime_home,fulltime_away,status\n",
    );
    let start = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();

    for round in 0..20u32 {
        let date = start.checked_add_days(Days::new(u64::from(7 * round))).unwrap();
        let pairs = match round % 3 {
            0 => [(0, 1), (2, 3)],
            1 => [(0, 2), (1, 3)],
            _ => [(0, 3), (1, 2)],
        };
        for (i, (a, b)) in pairs.into_iter().enumerate() {
            let (home, away) = if (round / 3) % 2 == 0 { (a, b) } else { (b, a) };
            let home_goals = (round + i as u32) % 4;
            let away_goals = (round * 2 + i as u32) % 3;
            writeln!(
                out,
                "{}T19:00:00Z,FL1,{},{},{},{},FINISHED",
                date, TEAMS[home], TEAMS[away], home_goals, away_goals
            )
            .unwrap();
        }
    }

    out.push_str("2024-10-02T19:00:00Z,FL1,FC Lorient,Stade de Reims,1,0,FINISHED\n");
    out.push_str("2024-11-06 19:00:00,FL1,Stade de Reims,FC Lorient,2.0,2.0,FINISHED\n");
    out.push_str("2024-11-13T19:00:00Z,FL1,OGC Nice,Lille OSC,,,FINISHED\n");
    out.push_str("2024-09-14T14:00:00Z,PL,Arsenal FC,Chelsea FC,2,1,FINISHED\n");
    out.push_str("2025-03-01T20:00:00Z,FL1,Lille OSC,OGC Nice,,,TIMED\n");
    out
}

fn write_season(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("results.csv");
    fs::write(&path, season_csv()).unwrap();
    path
}

fn config(model: ModelKind) -> PipelineConfig {
    PipelineConfig {
        seed: Some(7),
        model,
        ..PipelineConfig::default()
    }
}

fn first_line(path: &Path) -> String {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

#[test]
fn prepare_writes_two_rows_per_scored_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_season(&dir);
    let out = dir.path().join("data").join("matches.csv");

    let rows = pipeline::prepare(&input, &out, &config(ModelKind::Majority)).unwrap();

    assert_eq!(rows.len(), 2 * 42);
    assert_eq!(first_line(&out), MATCH_TABLE_HEADER);
    assert!(rows.iter().all(|r| r.comp == "Ligue 1"));
    assert!(rows.iter().all(|r| r.pkatt == r.pk));

    let lorient: Vec<&str> = rows
        .iter()
        .filter(|r| r.team == "FC Lorient")
        .map(|r| r.round.as_str())
        .collect();
    assert_eq!(lorient, ["Matchweek 1", "Matchweek 2"]);
}

#[test]
fn clubs_with_two_matches_produce_no_feature_rows() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_season(&dir);
    let config = config(ModelKind::Majority);

    let rows = pipeline::load_rows(PredictInput::Source(&input), &config).unwrap();
    let features = FormAggregator::new(config.window).aggregate(encode(rows).unwrap());

    // 20 matches per club, the first 3 of each have no window
    assert_eq!(features.len(), 4 * 17);
    assert!(
        features
            .iter()
            .all(|f| f.row().team != "FC Lorient" && f.row().team != "Stade de Reims")
    );
}

#[test]
fn predict_reports_on_matches_after_the_cutoff() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_season(&dir);
    let outputs = PredictOutputs {
        features: Some(dir.path().join("features.parquet")),
        report_json: Some(dir.path().join("report").join("summary.json")),
    };

    let outcome = pipeline::run_predict(
        PredictInput::Source(&input),
        &config(ModelKind::Majority),
        &outputs,
    )
    .unwrap();

    // seven rounds from 2024-12-01 on, two fixtures each, two sides each
    assert_eq!(outcome.predictions.len(), 28);
    assert_eq!(outcome.summary.total, 28);
    assert_eq!(outcome.summary.correct + outcome.summary.incorrect, 28);
    let cutoff = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
    assert!(
        outcome
            .predictions
            .iter()
            .all(|p| p.features.row().kickoff.date() >= cutoff)
    );

    assert_eq!(outcome.merged.len(), 14);
    assert!(outcome.merged.len() * 2 <= outcome.predictions.len());
    let names = TeamNameMap::ligue1();
    for merged in &outcome.merged {
        assert_eq!(
            names.canonical(&merged.home.team),
            names.canonical(&merged.away.opponent)
        );
        assert_eq!(merged.home.opponent, merged.away.team);
    }

    assert!(outputs.features.as_ref().unwrap().exists());
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(outputs.report_json.as_ref().unwrap()).unwrap())
            .unwrap();
    assert_eq!(json["total"], 28);
    assert_eq!(json["merged_pairs"], 14);
}

#[test]
fn prepared_table_predicts_like_the_source() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_season(&dir);
    let table = dir.path().join("matches.csv");
    let config = config(ModelKind::Tree);

    pipeline::prepare(&input, &table, &config).unwrap();

    let from_source =
        pipeline::run_predict(PredictInput::Source(&input), &config, &PredictOutputs::default())
            .unwrap();
    let from_table =
        pipeline::run_predict(PredictInput::Matches(&table), &config, &PredictOutputs::default())
            .unwrap();

    assert_eq!(from_source.summary, from_table.summary);
}

#[test]
fn standings_count_every_scored_fixture_twice() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_season(&dir);

    let rows = pipeline::run_standings(&input, &PipelineConfig::default()).unwrap();

    assert_eq!(rows.len(), 6);
    let played: u32 = rows.iter().map(|r| r.overall.played).sum();
    assert_eq!(played, 2 * 42);
    for row in &rows {
        assert_eq!(row.overall.played, row.home.played + row.away.played);
    }

    let h2h = pipeline::run_head_to_head(&input, "lorient", &PipelineConfig::default()).unwrap();
    assert_eq!(h2h.len(), 1);
    assert_eq!(h2h[0].opponent, "Reims");
    assert_eq!(h2h[0].line.points, 4);
}

#[test]
fn season_too_short_for_the_window_has_nothing_to_predict() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("results.csv");
    // one round robin: every club plays three times
    let mut csv = String::from(
        "date_utc,competition_code,home_team,away_team,fulltime_home,fulltime_away,status\n",
    );
    let mut day = 1;
    for (i, home) in TEAMS.iter().enumerate() {
        for away in TEAMS.iter().skip(i + 1) {
            writeln!(csv, "2024-11-{day:02}T19:00:00Z,FL1,{home},{away},2,1,FINISHED").unwrap();
            day += 1;
        }
    }
    fs::write(&input, csv).unwrap();

    let err = pipeline::run_predict(
        PredictInput::Source(&input),
        &config(ModelKind::Majority),
        &PredictOutputs::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::EmptyPartitionAfterFilter { stage }) if *stage == "form aggregation"
    ));
}

#[test]
fn reject_policy_fails_on_a_missing_score() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_season(&dir);
    let mut config = PipelineConfig::default();
    config.source.score_policy = ScorePolicy::Reject;

    let err = pipeline::load_rows(PredictInput::Source(&input), &config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::InvalidScoreValue { home, .. }) if home == "OGC Nice"
    ));
}

#[test]
fn missing_column_is_reported_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("results.csv");
    fs::write(
        &input,
        "date_utc,competition_code,home_team,away_team,fulltime_home,fulltime_away\n\
         2024-09-01T19:00:00Z,FL1,Lille OSC,OGC Nice,1,0\n",
    )
    .unwrap();

    let err = pipeline::prepare(&input, &dir.path().join("out.csv"), &PipelineConfig::default())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::MissingRequiredColumn { column, .. }) if column == "status"
    ));
}
