//! Mobility Predict evaluation binary.
//!
//! Trains a context-trie model from a binary trace and runs one of the two
//! evaluations against a held-out trace: ranked prediction or average
//! log-loss. The XML report goes to stdout; all diagnostics go to stderr.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{info, trace, warn};
use tracing_subscriber::EnvFilter;

use mp_common::{Error, ResearchQuestion};
use mp_core::config::ModelConfig;
use mp_core::driver::{self, DriverError};
use mp_core::model::Model;
use mp_core::report::{self, XmlReport};
use mp_core::stats;

/// Mobility trace prediction: where next, and when.
#[derive(Parser)]
#[command(name = "mp-core")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Training trace (little-endian 16-bit symbols)
    #[arg(short = 'f', long = "train", value_name = "FILE")]
    train: PathBuf,

    /// Run ranked-prediction evaluation against this trace
    #[arg(short = 'p', long = "predict", value_name = "FILE", conflicts_with = "logloss")]
    predict: Option<PathBuf>,

    /// Compute average log-loss of this trace under the trained model
    #[arg(long, value_name = "FILE")]
    logloss: Option<PathBuf>,

    /// Model order override
    #[arg(short = 'o', long, value_name = "N")]
    order: Option<usize>,

    /// Count predictions as accepted up to this cumulative probability
    /// (percent); WHEN runs only
    #[arg(short = 'c', long, value_name = "LEVEL",
          value_parser = clap::value_parser!(u8).range(0..=100))]
    confidence: Option<u8>,

    /// Answer the WHEN question (swap time/location pairs)
    #[arg(long)]
    when: bool,

    /// JSON model configuration (symbol windows, order, budgets)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit trie-shape statistics into the report
    #[arg(long)]
    model_stats: bool,

    /// Append per-query prediction counts to this CSV file
    #[arg(long, value_name = "FILE")]
    prediction_counts: Option<PathBuf>,

    /// Increase stderr log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let mut config = match &cli.config {
        Some(path) => ModelConfig::from_file(path).map_err(|e| Error::Config(e.to_string()))?,
        None => ModelConfig::default(),
    };
    if let Some(order) = cli.order {
        config.max_order = order;
    }
    config.validate().map_err(|e| Error::Config(e.to_string()))?;

    let question = if cli.when {
        ResearchQuestion::When
    } else {
        ResearchQuestion::Where
    };
    if question == ResearchQuestion::When && config.max_order % 2 == 0 {
        warn!(
            order = config.max_order,
            "WHEN pair prediction expects an odd model order"
        );
    }
    let confidence = match (cli.confidence, question) {
        (Some(level), ResearchQuestion::When) => Some(level),
        (Some(_), ResearchQuestion::Where) => {
            warn!("confidence level only applies to WHEN runs; ignoring");
            None
        }
        (None, _) => None,
    };

    let max_order = config.max_order;
    let mut model = Model::new(config).map_err(|e| Error::Model(e.to_string()))?;

    let stdout = io::stdout();
    let mut report = XmlReport::begin(stdout.lock()).map_err(stdout_err)?;
    report.question(question).map_err(stdout_err)?;
    report.training_file(&cli.train).map_err(stdout_err)?;

    let mut training = open(&cli.train)?;
    let outcome = driver::train_model(&mut model, &mut training, question)
        .map_err(|e| driver_err(&cli.train, e))?;
    info!(
        trained = outcome.trained,
        skipped = outcome.skipped,
        tables = model.node_count(),
        "training complete"
    );
    if tracing::enabled!(tracing::Level::TRACE) {
        trace!(model = %stats::dump(&model), "trained model");
    }

    if cli.model_stats {
        report
            .model_stats(&stats::survey(&model, question))
            .map_err(stdout_err)?;
    }

    if let Some(test_path) = &cli.predict {
        report.test_file(test_path).map_err(stdout_err)?;
        let mut reader = open(test_path)?;
        let mut test =
            driver::read_test_buffer(&mut reader).map_err(|e| driver_err(test_path, e))?;
        let eval = driver::evaluate(&mut model, &mut test, question, confidence)
            .map_err(|e| driver_err(test_path, e))?;
        report.counters(&eval.counters, confidence).map_err(stdout_err)?;
        if let Some(csv_path) = &cli.prediction_counts {
            // The side file keeps the test path exactly as given on the
            // command line; only the XML element strips it to a name.
            let test_file = test_path.display().to_string();
            report::append_prediction_counts(csv_path, &test_file, confidence, &eval.per_query)
                .map_err(|e| Error::io(csv_path, e))?;
        }
    } else if let Some(test_path) = &cli.logloss {
        report.test_file(test_path).map_err(stdout_err)?;
        let mut reader = open(test_path)?;
        let test =
            driver::read_test_buffer(&mut reader).map_err(|e| driver_err(test_path, e))?;
        let average = model
            .compute_logloss(&test)
            .map_err(|e| Error::Model(e.to_string()))?;
        report.logloss(max_order, average).map_err(stdout_err)?;
    }

    report.finish().map_err(stdout_err)
}

fn open(path: &Path) -> Result<BufReader<File>, Error> {
    Ok(BufReader::new(
        File::open(path).map_err(|e| Error::io(path, e))?,
    ))
}

fn driver_err(path: &Path, err: DriverError) -> Error {
    match err {
        DriverError::Io(source) => Error::io(path, source),
        DriverError::Model(model) => Error::Model(model.to_string()),
    }
}

fn stdout_err(err: io::Error) -> Error {
    Error::io("<stdout>", err)
}
