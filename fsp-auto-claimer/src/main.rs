//! fsp-auto-claimer
//!
//! Service that keeps claiming FSP rewards as new epochs are finalized.
//!
//! Architecture:
//! 1. Load configuration from the environment
//! 2. Build one claim pipeline per configured claim type
//! 3. Poll every claim type on the auto-claim interval
//! 4. Stop on Ctrl-C after the running cycles finish

use anyhow::bail;
use fsp_claimer::{connect, AutoClaimer, ClaimPipeline, ClaimerConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const LOG_FORMAT_VAR: &str = "LOG_FORMAT";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ClaimerConfig::from_env()?;

    info!("Starting fsp-auto-claimer");
    info!("Network: {} ({})", config.network, config.rpc_url);
    info!("Reward data: {}", config.rewards_data_base_url);
    info!("Claim types: {:?}", config.claim_types);

    let connections = connect(&config)?;

    let mut auto_claimer = AutoClaimer::new(config.auto_claim_interval);
    for &claim_type in &config.claim_types {
        match ClaimPipeline::from_config(
            &config,
            claim_type,
            connections.ledger.clone(),
            connections.datasets.clone(),
        ) {
            Ok(pipeline) => {
                info!("Enabling {} auto-claim", claim_type);
                auto_claimer = auto_claimer.with_pipeline(pipeline);
            }
            Err(e) => error!("Skipping {} auto-claim: {}", claim_type, e),
        }
    }

    if auto_claimer.claim_types().is_empty() {
        bail!("no claim type could be configured for auto-claiming");
    }

    let stop = CancellationToken::new();
    let handle = tokio::spawn(auto_claimer.run(stop.clone()));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutting down auto-claimer, waiting for running cycles...");

    stop.cancel();
    handle.await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fsp_auto_claimer=info,fsp_claimer=info".into());

    let json = std::env::var(LOG_FORMAT_VAR)
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
