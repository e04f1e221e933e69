use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::info;

use crate::form::{FEATURE_NAMES, FeatureRow};

/// Feature rows as a frame: identifying columns, the 18 model inputs and
/// the target.
pub fn features_frame(rows: &[FeatureRow]) -> PolarsResult<DataFrame> {
    let dates: Vec<String> = rows
        .iter()
        .map(|r| r.row().kickoff.date().to_string())
        .collect();
    let teams: Vec<&str> = rows.iter().map(|r| r.row().team.as_str()).collect();
    let opponents: Vec<&str> = rows.iter().map(|r| r.row().opponent.as_str()).collect();

    let mut columns = vec![
        Series::new("date", dates),
        Series::new("team", teams),
        Series::new("opponent", opponents),
    ];

    let matrix: Vec<[f64; 18]> = rows.iter().map(FeatureRow::features).collect();
    for (idx, name) in FEATURE_NAMES.iter().enumerate() {
        let values: Vec<f64> = matrix.iter().map(|f| f[idx]).collect();
        columns.push(Series::new(name, values));
    }

    let target: Vec<u32> = rows.iter().map(|r| u32::from(r.target())).collect();
    columns.push(Series::new("target", target));

    DataFrame::new(columns)
}

pub fn write_features_parquet(rows: &[FeatureRow], out_file: &Path) -> Result<()> {
    if let Some(parent) = out_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut df = features_frame(rows)?;
    let mut file = fs::File::create(out_file)
        .with_context(|| format!("create {}", out_file.display()))?;
    ParquetWriter::new(&mut file).finish(&mut df)?;

    info!(
        rows = df.height(),
        columns = df.width(),
        "Wrote feature table to {}",
        out_file.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;
    use crate::enrich::{EnrichConfig, SyntheticShotStats, enrich};
    use crate::expand::expand_fixtures;
    use crate::fixtures::{Fixture, MatchStatus, Score};
    use crate::form::FormAggregator;
    use chrono::NaiveDate;

    fn feature_rows() -> Vec<FeatureRow> {
        let fixtures: Vec<Fixture> = (1..=6)
            .map(|day| Fixture {
                kickoff: NaiveDate::from_ymd_opt(2024, 10, day * 4)
                    .unwrap()
                    .and_hms_opt(21, 0, 0)
                    .unwrap(),
                competition: "FL1".to_string(),
                home_team: if day % 2 == 0 { "FC Nantes" } else { "Stade Rennais FC 1901" }
                    .to_string(),
                away_team: if day % 2 == 0 { "Stade Rennais FC 1901" } else { "FC Nantes" }
                    .to_string(),
                score: Some(Score { home: day % 3, away: 1 }),
                status: MatchStatus::Finished,
            })
            .collect();
        let (records, _) = expand_fixtures(&fixtures);
        let rows = enrich(&records, &EnrichConfig::default(), &mut SyntheticShotStats::new(Some(9)));
        FormAggregator::new(3).aggregate(encode(rows).unwrap())
    }

    #[test]
    fn frame_has_identifiers_features_and_target() {
        let rows = feature_rows();
        assert_eq!(rows.len(), 6);

        let df = features_frame(&rows).unwrap();
        assert_eq!(df.height(), 6);
        assert_eq!(df.width(), 3 + FEATURE_NAMES.len() + 1);
        assert!(df.column("gf_rolling").is_ok());
        assert!(df.column("h/a").is_ok());
    }

    #[test]
    fn parquet_is_written_and_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("features.parquet");
        write_features_parquet(&feature_rows(), &path).unwrap();

        let file = fs::File::open(&path).unwrap();
        let df = ParquetReader::new(file).finish().unwrap();
        assert_eq!(df.height(), 6);
    }
}
