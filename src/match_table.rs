use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;
use tracing::info;

use crate::enrich::MatchRow;
use crate::error::PipelineError;
use crate::fixtures::KICKOFF_FORMAT;

pub fn write_match_table(rows: &[MatchRow], out_file: &Path) -> Result<()> {
    if let Some(parent) = out_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = Writer::from_path(out_file)
        .with_context(|| format!("create match table {}", out_file.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("Wrote {} team rows to {}", rows.len(), out_file.display());
    Ok(())
}

pub fn read_match_table(path: &Path) -> Result<Vec<MatchRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open match table {}", path.display()))?;

    let mut rows = Vec::new();
    for (idx, row) in reader.deserialize::<MatchRow>().enumerate() {
        rows.push(row.with_context(|| format!("parse row {} of {}", idx + 2, path.display()))?);
    }

    if rows.is_empty() {
        return Err(PipelineError::EmptyPartitionAfterFilter {
            stage: "reading the match table",
        }
        .into());
    }

    info!("Read {} team rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Teams, date range and result distribution of a prepared table.
pub fn describe(rows: &[MatchRow]) {
    let teams: BTreeSet<&str> = rows.iter().map(|r| r.team.as_str()).collect();
    println!("Extracted {} team rows", rows.len());
    println!("Teams included ({}):", teams.len());
    for team in &teams {
        println!("  {}", team);
    }

    let first = rows.iter().map(|r| r.kickoff).min();
    let last = rows.iter().map(|r| r.kickoff).max();
    if let (Some(first), Some(last)) = (first, last) {
        println!(
            "Date range: {} to {}",
            first.format(KICKOFF_FORMAT),
            last.format(KICKOFF_FORMAT)
        );
    }

    let mut results: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        *results.entry(row.result.code()).or_insert(0) += 1;
    }
    println!("Results distribution:");
    for (result, count) in results {
        println!("  {:<2} {}", result, count);
    }
}
