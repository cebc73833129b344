pub mod analytics;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod providers;
pub mod service;
pub mod store;

use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub enum AppCommand {
    Products,
    Prices {
        code: String,
        start: NaiveDate,
        end: NaiveDate,
        output: Option<PathBuf>,
    },
    Analyze {
        code: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Wires the service from configured provider endpoints and the local store.
pub fn build_service(config: &config::AppConfig) -> Result<service::PriceService> {
    let store = store::Store::open(&config.data_path()?)?;
    let catalog = Arc::new(catalog::ProductCatalog::new(&store)?);
    let cache = Arc::new(cache::PriceCache::new(&store)?);
    let rates = Arc::new(providers::ptax::PtaxRateProvider::new(
        config.providers.ptax_base_url(),
    ));

    let sources = service::SourceSet {
        scraped: Arc::new(providers::cepea::CepeaSource::new(
            config.providers.cepea_base_url(),
        )),
        statistical: Arc::new(providers::ipeadata::IpeadataSource::new(
            config.providers.ipeadata_base_url(),
        )),
        central_bank: Arc::new(providers::bcb_sgs::BcbSgsSource::new(
            config.providers.bcb_base_url(),
        )),
    };

    Ok(service::PriceService::new(catalog, cache, rates, sources))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let service = build_service(&config)?;

    match command {
        AppCommand::Products => cli::products::run(&service),
        AppCommand::Prices {
            code,
            start,
            end,
            output,
        } => cli::prices::run(&service, &code, start, end, output.as_deref()).await,
        AppCommand::Analyze { code, start, end } => {
            cli::analyze::run(&service, &code, start, end).await
        }
    }
}
