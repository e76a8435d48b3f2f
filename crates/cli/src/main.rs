#![warn(clippy::all, clippy::pedantic)]

use cli::commands::Command;
use cli::modules::settings::Settings;

use anyhow::Result;

use clap::Parser;

use elements_wallet::{EsploraClient, Network, Wallet};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Command-line entrypoint for the confidential wallet.
#[derive(Parser, Debug)]
#[command(
    name = "elements-wallet-cli",
    version,
    about = "Confidential single-key and multisig wallet for Liquid"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Network the wallet lives on
    #[arg(long = "network", default_value_t = Network::LiquidTestnet)]
    network: Network,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    logging_init();

    let parsed = Cli::parse();
    let settings = Settings::load()?;

    let network = parsed.network.params();
    let wallet = Wallet::new(settings.descriptor()?, network)?;
    let client = EsploraClient::new(settings.esplora_url.as_deref().unwrap_or(network.esplora_url));

    tracing::debug!(network = %parsed.network, explorer = client.base_url(), "wallet loaded");

    parsed.command.handle(wallet, &client)
}

fn logging_init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}
