//! Courier Detect command-line classifier.
//!
//! Prints one JSON report per tracking number, in input order. Numbers come
//! from the arguments, or one per line on stdin when none are given.
//!
//! Usage:
//!   courierdetect-classify 1Z999AA1234567890 123456789012
//!   cat numbers.txt | courierdetect-classify --catalog carriers.json

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use courierdetect::{Catalog, Classifier, Config};

#[derive(Parser, Debug)]
#[command(about = "Detect the shipping carrier of tracking numbers")]
struct Args {
    /// JSON carrier catalog replacing the built-in one
    /// (defaults to CARRIER_CATALOG_PATH when set)
    #[arg(long = "catalog", value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Tracking numbers to classify; read from stdin when omitted
    #[arg(value_name = "NUMBER")]
    numbers: Vec<String>,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays pure JSON lines
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true).with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let catalog_path = args
        .catalog
        .or_else(|| Config::from_env().carrier_catalog_path);
    let catalog = Catalog::load(catalog_path.as_deref()).context("loading carrier catalog")?;
    let classifier = Classifier::new(catalog).context("compiling carrier catalog")?;
    debug!(carriers = classifier.catalog().len(), "classifier_ready");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.numbers.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line.context("reading stdin")?;
            if line.trim().is_empty() {
                continue;
            }
            print_report(&mut out, &classifier, &line)?;
        }
    } else {
        for number in &args.numbers {
            print_report(&mut out, &classifier, number)?;
        }
    }

    out.flush().context("flushing stdout")?;
    Ok(())
}

fn print_report(out: &mut impl Write, classifier: &Classifier, input: &str) -> Result<()> {
    let report = classifier.report(input.trim());
    let json = serde_json::to_string(&report).context("serializing report")?;
    writeln!(out, "{}", json).context("writing report")?;
    Ok(())
}
