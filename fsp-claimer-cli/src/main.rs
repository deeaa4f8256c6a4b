use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use ethers::utils::format_ether;
use ethers::types::U256;
use fsp_claimer::{
    connect, ClaimPipeline, ClaimType, ClaimerConfig, Connections, CycleOutcome, Network,
    RewardClaimer, RewardEpochId,
};

#[derive(Parser)]
#[command(
    name = "fsp-claimer",
    about = "Claim Flare FSP rewards for the configured beneficiaries"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Claim outstanding rewards in a single transaction per claim type.
    Claim(ClaimArgs),
    /// Print every claimable epoch and its reward amount.
    List,
}

#[derive(Args)]
struct ClaimArgs {
    /// Claim type (direct, fee, wnat, mirror, cchain). Defaults to every configured type.
    #[arg(long = "type")]
    claim_type: Option<ClaimType>,
    /// Only claim this reward epoch.
    #[arg(long)]
    epoch: Option<RewardEpochId>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fsp_claimer_cli=info,fsp_claimer=info".into()),
        )
        .init();

    let config = ClaimerConfig::from_env()?;
    let connections = connect(&config)?;

    match cli.command {
        Commands::Claim(args) => claim(&config, &connections, args).await,
        Commands::List => list(&config, &connections).await,
    }
}

async fn claim(config: &ClaimerConfig, connections: &Connections, args: ClaimArgs) -> Result<()> {
    let claim_types = match args.claim_type {
        Some(claim_type) => vec![claim_type],
        None => configured_types(config)?,
    };

    for claim_type in claim_types {
        let pipeline = ClaimPipeline::from_config(
            config,
            claim_type,
            connections.ledger.clone(),
            connections.datasets.clone(),
        )?;

        let outcome = match args.epoch {
            Some(epoch) => pipeline.claim_epoch(epoch).await?,
            None => pipeline.run_cycle().await?,
        };

        match outcome {
            CycleOutcome::Claimed(receipt) => {
                println!(
                    "Claimed {} of {} rewards for epochs {:?}",
                    display_amount(receipt.total_amount, config.network),
                    claim_type,
                    receipt.claimed_epochs
                );
                println!("  transaction: {:?}", receipt.transaction_hash);
                if let Some(block) = receipt.block_number {
                    println!("  block: {}", block);
                }
            }
            CycleOutcome::NothingToClaim => println!("No claimable {} rewards", claim_type),
        }
    }
    Ok(())
}

async fn list(config: &ClaimerConfig, connections: &Connections) -> Result<()> {
    let profiles = config.available_profiles();
    if profiles.is_empty() {
        bail!("no claim type has a beneficiary configured");
    }

    for profile in profiles {
        let claimer = RewardClaimer::new(
            profile,
            connections.ledger.clone(),
            connections.datasets.clone(),
        );
        let rewards = claimer.list_rewards().await?;

        println!("{} rewards for {:?}:", profile.claim_type, profile.beneficiary);
        if rewards.is_empty() {
            println!("  no claimable epochs");
        }
        for reward in rewards {
            match reward.amount {
                Some(amount) => println!(
                    "  epoch {}: {}",
                    reward.epoch,
                    display_amount(amount, config.network)
                ),
                None => println!("  epoch {}: no reward data available", reward.epoch),
            }
        }
    }
    Ok(())
}

fn configured_types(config: &ClaimerConfig) -> Result<Vec<ClaimType>> {
    let claim_types: Vec<ClaimType> = config
        .available_profiles()
        .into_iter()
        .map(|profile| profile.claim_type)
        .collect();
    if claim_types.is_empty() {
        bail!("no claim type has a beneficiary configured");
    }
    Ok(claim_types)
}

/// Amount in whole native tokens with the network's ticker.
fn display_amount(amount: U256, network: Network) -> String {
    format!("{} {}", format_ether(amount), network.symbol())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_amount_uses_network_symbol() {
        let amount = U256::exp10(17) * U256::from(15u64);
        assert_eq!(display_amount(amount, Network::Songbird), "1.500000000000000000 SGB");
        assert_eq!(display_amount(amount, Network::Flare), "1.500000000000000000 FLR");
        assert_eq!(display_amount(U256::zero(), Network::Coston2), "0.000000000000000000 C2FLR");
    }
}
