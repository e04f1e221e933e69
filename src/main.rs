use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ligue1_predictor::classifier::{ModelKind, TemporalSplit, TreeParams};
use ligue1_predictor::enrich::EnrichConfig;
use ligue1_predictor::fixtures::{ScorePolicy, SourceFilter};
use ligue1_predictor::pipeline::{self, PipelineConfig, PredictInput, PredictOutputs};

#[derive(Parser, Debug)]
#[command(
    name = "ligue1-predictor",
    about = "Form-based match outcome prediction for one football league",
    version
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the per-team match table from a results feed
    Prepare {
        /// Results feed (CSV)
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = "data/matches.csv")]
        out: PathBuf,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        enrich: EnrichArgs,
    },

    /// Train on matches before the cutoff, predict the rest and report
    Predict {
        /// Results feed (CSV)
        #[arg(long, required_unless_present = "from_matches", conflicts_with = "from_matches")]
        input: Option<PathBuf>,

        /// Match table written by `prepare`
        #[arg(long = "from-matches")]
        from_matches: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        enrich: EnrichArgs,

        #[command(flatten)]
        model: ModelArgs,

        /// Write the feature table as parquet
        #[arg(long = "features-out")]
        features_out: Option<PathBuf>,

        /// Write the report summary as JSON
        #[arg(long = "report-json")]
        report_json: Option<PathBuf>,
    },

    /// League table, overall and split home/away
    Standings {
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// One team's record against each opponent
    H2h {
        #[arg(long)]
        input: PathBuf,

        /// Team name, matched loosely
        #[arg(long)]
        team: String,

        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Competition code to keep
    #[arg(long, default_value = "FL1")]
    competition: String,

    /// What to do with finished fixtures whose score cannot be read
    #[arg(long = "score-policy", value_enum, default_value_t = ScorePolicy::Skip)]
    score_policy: ScorePolicy,

    /// CSV with `official,short` team names (defaults to the built-in Ligue 1 table)
    #[arg(long = "team-names")]
    team_names: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EnrichArgs {
    #[arg(long, default_value = "2025")]
    season: String,

    #[arg(long = "kickoff-time", default_value = "20:00")]
    kickoff_time: String,

    #[arg(long, default_value = "4-3-3")]
    formation: String,

    /// Seed for the synthetic shot stats
    #[arg(long)]
    seed: Option<u64>,

    /// CSV with real `date,team,sh,sot,dist,fk,pk,pkatt` rows
    #[arg(long = "shot-stats")]
    shot_stats: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Trailing form window, in matches
    #[arg(long, default_value_t = 3)]
    window: usize,

    /// First day of the test period
    #[arg(long, default_value = "2024-12-01")]
    cutoff: NaiveDate,

    #[arg(long, value_enum, default_value_t = ModelKind::Tree)]
    model: ModelKind,

    #[arg(long = "max-depth", default_value_t = 10)]
    max_depth: usize,

    #[arg(long = "min-split", default_value_t = 5.0)]
    min_split: f32,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn base_config(source: SourceArgs) -> PipelineConfig {
    PipelineConfig {
        source: SourceFilter {
            competition: source.competition,
            score_policy: source.score_policy,
        },
        team_names: source.team_names,
        ..PipelineConfig::default()
    }
}

fn with_enrich(config: PipelineConfig, enrich: EnrichArgs) -> PipelineConfig {
    PipelineConfig {
        enrich: EnrichConfig {
            kickoff_time: enrich.kickoff_time,
            formation: enrich.formation,
            season: enrich.season,
        },
        seed: enrich.seed,
        shot_stats: enrich.shot_stats,
        ..config
    }
}

fn with_model(config: PipelineConfig, model: ModelArgs) -> PipelineConfig {
    PipelineConfig {
        window: model.window,
        split: TemporalSplit {
            cutoff: model.cutoff,
        },
        model: model.model,
        tree: TreeParams {
            max_depth: Some(model.max_depth),
            min_weight_split: model.min_split,
        },
        ..config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Prepare {
            input,
            out,
            source,
            enrich,
        } => {
            let config = with_enrich(base_config(source), enrich);
            pipeline::prepare(&input, &out, &config)?;
        }
        Command::Predict {
            input,
            from_matches,
            source,
            enrich,
            model,
            features_out,
            report_json,
        } => {
            let config = with_model(with_enrich(base_config(source), enrich), model);
            let outputs = PredictOutputs {
                features: features_out,
                report_json,
            };
            let input = match (&input, &from_matches) {
                (_, Some(path)) => PredictInput::Matches(path),
                (Some(path), None) => PredictInput::Source(path),
                (None, None) => anyhow::bail!("either --input or --from-matches is required"),
            };
            pipeline::run_predict(input, &config, &outputs)?;
        }
        Command::Standings { input, source } => {
            pipeline::run_standings(&input, &base_config(source))?;
        }
        Command::H2h {
            input,
            team,
            source,
        } => {
            pipeline::run_head_to_head(&input, &team, &base_config(source))?;
        }
    }

    Ok(())
}
