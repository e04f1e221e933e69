//! Match outcome prediction for a single football league.
//!
//! A results feed is expanded into one row per team per fixture, enriched
//! with the columns a per-team match table carries, encoded, and turned into
//! trailing form features. A classifier trained on matches before a cutoff
//! date labels the rest, and the two sides of each fixture are merged back
//! together for the report.

pub mod classifier;
pub mod encode;
pub mod enrich;
pub mod error;
pub mod expand;
pub mod export;
pub mod fixtures;
pub mod form;
pub mod match_table;
pub mod merge;
pub mod pipeline;
pub mod report;
pub mod standings;
pub mod team_names;

pub use error::PipelineError;
pub use pipeline::{PipelineConfig, PredictInput, PredictOutcome, PredictOutputs};
