use anyhow::{Context, Result};
use clap::Parser;
use contract_fixtures::Config;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "contract-fixtures")]
#[command(about = "Generate DOCX and PDF contract fixtures from text templates")]
#[command(version)]
struct Cli {
    /// Directory holding the contract .txt files (defaults to the current directory)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = cli.dir {
        config.work_dir = dir;
    }

    info!("Starting contract fixture generation");
    let report = contract_fixtures::generate(&config);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!("{report}");
    }

    Ok(())
}
