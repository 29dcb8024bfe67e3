use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

use shelect::output::{OutputFormat, Printer};
use shelect::repl::{run_query, run_repl};
use shelect::validation::validate_config;
use shelect::{storage, Config, Session};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQL to run; files are queried by name, e.g. SELECT * FROM "data.csv".
    /// Starts an interactive shell when omitted.
    queries: Vec<String>,

    /// Output format (table on a terminal, csv otherwise)
    #[arg(short = 'o', long = "format", value_enum)]
    format: Option<OutputFormat>,

    /// Config file path
    #[arg(short, long, env = "SHELECT_CONFIG")]
    config: Option<PathBuf>,

    /// Log import details to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "shelect=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    // Update config with command line arguments
    if let Some(format) = args.format {
        config.output.format = Some(format);
    }
    validate_config(&config)?;

    let format = config.output.format.unwrap_or_else(|| {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Csv
        }
    });
    let printer = Printer::new(format, config.output.null_text.clone());

    let storage = Arc::new(storage::from_config(&config.storage));
    let mut session = Session::new(config, storage);

    if args.queries.is_empty() {
        // Nothing to do when input is piped in without a query
        if std::io::stdin().is_terminal() {
            run_repl(&mut session, &printer).await?;
        }
        return Ok(());
    }

    for query in &args.queries {
        run_query(&mut session, &printer, query).await?;
    }
    Ok(())
}
