//! Roulette table CLI
//!
//! Plays a single round against an in-memory wallet.

use clap::{Parser, Subcommand};
use roulette::api::HttpRandomnessService;
use roulette::config::generate_sample_config;
use roulette::games::bets::format_amount;
use roulette::{
    Bet, ConfigLoader, InMemoryWallet, OutcomeProvider, RandomnessService, RouletteConfig,
    RouletteResult, RouletteTable, VrfProcess, WalletCollaborator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "roulette")]
#[command(about = "European roulette table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play one round
    Play {
        /// Bet as `tag:amount` or `tag:value:amount`, e.g. `red:10` or `straight:17:2`
        #[arg(long = "bet", required = true)]
        bets: Vec<Bet>,

        /// Starting wallet balance
        #[arg(long, default_value = "100")]
        balance: f64,

        /// Configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Randomness process to request outcomes from
        #[arg(long)]
        process_id: Option<String>,

        /// Base URL of the `roulette-oracle` serving that process
        #[arg(long)]
        oracle_url: Option<String>,

        /// Always draw outcomes locally
        #[arg(long)]
        local_only: bool,
    },
    /// Write a default configuration file
    SampleConfig { path: PathBuf },
}

#[tokio::main]
async fn main() -> RouletteResult<()> {
    match Cli::parse().command {
        Command::Play {
            bets,
            balance,
            config,
            process_id,
            oracle_url,
            local_only,
        } => {
            let mut loader = ConfigLoader::new();
            if let Some(path) = config {
                loader = loader.with_path(path);
            }
            let mut config = loader.load()?;
            if process_id.is_some() {
                config.provider.process_id = process_id;
            }
            if oracle_url.is_some() {
                config.provider.oracle_url = oracle_url;
            }
            config.provider.local_only |= local_only;
            config.validate()?;

            init_tracing(&config.logging.filter);
            play(&config, bets, balance).await
        }
        Command::SampleConfig { path } => {
            init_tracing(&RouletteConfig::default().logging.filter);
            let path = path.to_string_lossy();
            generate_sample_config(&path)?;
            println!("Wrote sample configuration to {}", path);
            Ok(())
        }
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

async fn play(config: &RouletteConfig, bets: Vec<Bet>, balance: f64) -> RouletteResult<()> {
    let service: Option<Arc<dyn RandomnessService>> =
        match (config.provider.active_process_id(), &config.provider.oracle_url) {
            (Some(id), Some(url)) => {
                info!("Requesting outcomes for process {} from oracle {}", id, url);
                let client = HttpRandomnessService::new(url)?;
                Some(Arc::new(client) as Arc<dyn RandomnessService>)
            }
            (Some(id), None) => {
                warn!("No oracle URL configured, hosting process {} in-process", id);
                Some(Arc::new(VrfProcess::with_random_key(id)) as Arc<dyn RandomnessService>)
            }
            (None, _) => None,
        };
    let provider = OutcomeProvider::from_config(&config.provider, service);
    let table = RouletteTable::new(provider, config.table.clone());

    let wallet = InMemoryWallet::new(balance);
    let address = wallet.get_address().await?;
    println!("Wallet {} balance {}", address, wallet.get_balance(&address).await?);

    let mut round = table.new_round();
    for bet in bets {
        round.place_bet(bet)?;
    }

    println!("Bet slip:");
    for bet in round.bets() {
        println!("  {}", bet);
    }

    let tx_id = wallet.submit(round.place_bet_payload()).await?;
    println!("Bets placed (tx {})", tx_id);

    let receipt = table.spin(&mut round).await?;
    println!(
        "Round {} landed on {} ({} randomness, pocket {})",
        receipt.round_id,
        receipt.outcome,
        receipt.source,
        receipt.outcome.pocket_index()
    );

    for (bet, won) in round.bets().iter().zip(&receipt.settlement.per_bet_win) {
        println!("  {} {}", if *won { "WIN " } else { "LOSS" }, bet);
    }
    println!(
        "Staked {}, payout {}",
        format_amount(receipt.total_staked),
        format_amount(receipt.settlement.total_payout)
    );

    if let Some(claim) = receipt.claim_payload() {
        let tx_id = wallet.submit(claim).await?;
        println!("Winnings claimed (tx {})", tx_id);
    }

    let verified = table.verify(&receipt).await;
    println!("Outcome verified: {}", verified);
    println!("Final balance {}", wallet.get_balance(&address).await?);

    Ok(())
}
