use agq::core::log::init_logging;
use anyhow::Result;
use chrono::{Days, NaiveDate, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List available products
    Products,
    /// Display historical prices for a product
    Prices {
        /// Product code, e.g. BGI or SOJ
        code: String,

        /// Start of the date range (YYYY-MM-DD), defaults to a year ago
        #[arg(short, long)]
        start: Option<NaiveDate>,

        /// End of the date range (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        end: Option<NaiveDate>,

        /// Write the series to a CSV file instead of the terminal
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Display moving averages and price changes for a product
    Analyze {
        /// Product code, e.g. BGI or SOJ
        code: String,

        /// Start of the date range (YYYY-MM-DD), defaults to a year ago
        #[arg(short, long)]
        start: Option<NaiveDate>,

        /// End of the date range (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        end: Option<NaiveDate>,
    },
}

fn default_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    let today = Utc::now().date_naive();
    let end = end.unwrap_or(today);
    let start = start.unwrap_or_else(|| end.checked_sub_days(Days::new(365)).unwrap_or(end));
    (start, end)
}

impl From<Commands> for agq::AppCommand {
    fn from(cmd: Commands) -> agq::AppCommand {
        match cmd {
            Commands::Products => agq::AppCommand::Products,
            Commands::Prices {
                code,
                start,
                end,
                output,
            } => {
                let (start, end) = default_range(start, end);
                agq::AppCommand::Prices {
                    code,
                    start,
                    end,
                    output,
                }
            }
            Commands::Analyze { code, start, end } => {
                let (start, end) = default_range(start, end);
                agq::AppCommand::Analyze { code, start, end }
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => agq::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = agq::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
providers:
  cepea:
    base_url: "https://www.cepea.esalq.usp.br"
  ipeadata:
    base_url: "http://www.ipeadata.gov.br"
  bcb:
    base_url: "https://api.bcb.gov.br"
  ptax:
    base_url: "https://olinda.bcb.gov.br"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
