use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use schoolrec::{Engine, EngineConfig, FeatureWeights, FitOutcome, JsonFileSource};
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Content-based school recommender
#[derive(Parser, Debug)]
#[command(name = "schoolrec")]
#[command(about = "Recommend schools similar to the ones you like", long_about = None)]
struct Args {
    /// Path to the school records (JSON array of objects)
    #[arg(short, long, default_value = "./data/schools.json")]
    data: PathBuf,

    /// Directory holding the persisted model
    #[arg(short, long, default_value = "./models")]
    model_dir: PathBuf,

    /// JSON file with per-attribute feature weights
    #[arg(short, long)]
    weights: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit the model, reusing the persisted one when the data is unchanged
    Train {
        /// Retrain even if the persisted model is current
        #[arg(long)]
        force: bool,
    },
    /// Show the persisted model
    Info,
    /// Recommend schools similar to the given ones
    Recommend {
        /// School name (repeatable)
        #[arg(short, long = "school", required = true)]
        schools: Vec<String>,

        /// Number of recommendations
        #[arg(short, long, default_value_t = 5)]
        n: usize,
    },
    /// Load data and model, then recommend for the first school
    Selftest,
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let log_level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if std::env::var_os("RUST_LOG").is_some() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting schoolrec v{}", env!("CARGO_PKG_VERSION"));
    info!("Data: {:?}", args.data);
    info!("Model directory: {:?}", args.model_dir);

    let mut config = EngineConfig::new(&args.model_dir);
    if let Some(path) = &args.weights {
        let weights = FeatureWeights::from_json_file(path)
            .with_context(|| format!("reading feature weights from {}", path.display()))?;
        config = config.with_feature_weights(weights);
    }
    let engine = Engine::new(config, JsonFileSource::new(&args.data))?;

    match args.command {
        Command::Train { force } => {
            let outcome = engine.retrain(force).context("training failed")?;
            match outcome {
                FitOutcome::Reused => println!("Model is up to date, no retraining needed"),
                FitOutcome::Trained => println!("Training completed successfully"),
            }
            println!("{}", serde_json::to_string_pretty(&engine.model_info())?);
        }
        Command::Info => {
            if !engine.load_model() {
                bail!("no model found in {}", args.model_dir.display());
            }
            println!("{}", serde_json::to_string_pretty(&engine.model_info())?);
        }
        Command::Recommend { schools, n } => {
            if !engine.load_model() {
                info!("No usable persisted model, training");
                engine.retrain(false).context("training failed")?;
            }
            let recommendations = engine.get_recommendations(&schools, n)?;
            let out = json!({ "recommendations": recommendations });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Selftest => {
            if !engine.load_data() {
                bail!("failed to load school data");
            }
            if !engine.load_model() {
                bail!("failed to load models");
            }
            let records = engine.records().context("no records loaded")?;
            let test_school = records
                .first()
                .map(|r| r.name.clone())
                .context("record table is empty")?;
            info!("Testing with school: {}", test_school);

            let recommendations = engine.get_recommendations(std::slice::from_ref(&test_school), 3)?;
            let out = json!({
                "status": "success",
                "test_school": test_school,
                "recommendations": recommendations,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
