use std::path::PathBuf;

use thiserror::Error;

/// Failures the pipeline can name precisely. Everything else (I/O, csv,
/// polars) is carried through `anyhow` at the call site with context.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing required column `{column}` in {}", path.display())]
    MissingRequiredColumn { column: String, path: PathBuf },

    #[error("invalid score value {value:?} in {home} vs {away} ({date})")]
    InvalidScoreValue {
        value: String,
        home: String,
        away: String,
        date: String,
    },

    #[error("invalid kickoff timestamp {value:?}")]
    InvalidTimestamp { value: String },

    #[error("no rows left after {stage}")]
    EmptyPartitionAfterFilter { stage: &'static str },

    #[error("team name {name:?} has no entry in the name map")]
    UnmappedTeamName { name: String },
}
