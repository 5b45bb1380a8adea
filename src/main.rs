use std::{process::ExitCode, sync::Arc};

use domain_watch::{Config, Domain, Domains, Gauges, Integrations, WhoisClient, watch};
use log::{error, info};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let integrations = match Integrations::from_config(&config).await {
        Ok(integrations) => integrations,
        Err(e) => {
            error!("Failed to set up integrations: {e}");
            return ExitCode::FAILURE;
        }
    };

    let registry = Arc::new(WhoisClient::new().with_timeout(config.timeout()));
    let mut domains = Domains::new(config.sleep(), registry, Arc::new(Gauges::new()));
    let thresholds: Arc<[i64]> = config.config.thresholds.clone().into();
    for name in &config.config.domains {
        domains.add(Domain::new(name.clone(), thresholds.clone()));
    }

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                shutdown.cancel();
            }
            Err(e) => error!("Unable to listen for shutdown signal: {e}"),
        }
    });

    watch(domains, integrations, config.every(), token).await;
    ExitCode::SUCCESS
}
