use alloy::primitives::U256;
use nftmarket::chain::types::Eth;
use nftmarket::commands;
use nftmarket::output::formatter;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "nftmarket")]
#[command(about = "Deploy and drive the NftMarketplace contracts")]
#[command(version)]
struct Cli {
    /// Network from nftmarket.toml (defaults to `default_network`)
    #[arg(short, long, global = true)]
    network: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the contracts and run follow-up steps
    Deploy {
        /// Only run steps carrying one of these tags (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Mint a BasicNft and list it on the marketplace
    MintAndList {
        /// Listing price in ETH
        #[arg(short, long, default_value = commands::mint_and_list::DEFAULT_PRICE)]
        price: String,
    },
    /// Buy a listed BasicNft at its listed price
    BuyItem {
        #[arg(short = 'i', long, default_value_t = commands::buy_item::DEFAULT_TOKEN_ID)]
        token_id: u64,
    },
    /// Cancel a listing
    CancelItem {
        #[arg(short = 'i', long, default_value_t = commands::cancel_item::DEFAULT_TOKEN_ID)]
        token_id: u64,
    },
    /// Change the price of a listing
    UpdateItem {
        #[arg(short = 'i', long)]
        token_id: u64,
        /// New price in ETH
        #[arg(short, long)]
        price: String,
    },
    /// Withdraw sale proceeds to the signing account
    WithdrawProceeds,
    /// Show a token's listing and your proceeds
    Listing {
        #[arg(short = 'i', long)]
        token_id: u64,
    },
    /// Mine blocks on the local development chain
    Mine,
}

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_env("NFTMARKET_LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .compact()
        .with_timer(fmt::time::SystemTime)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tracing::debug!("command dispatched");

    if let Err(err) = dispatch(cli).await {
        formatter::print_error(&err);
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let network = cli.network.as_deref();

    match cli.command {
        Commands::Deploy { tags } => commands::deploy::run(network, tags).await,
        Commands::MintAndList { price } => {
            commands::mint_and_list::run(network, Eth::parse_price(&price)?).await
        }
        Commands::BuyItem { token_id } => {
            commands::buy_item::run(network, U256::from(token_id)).await
        }
        Commands::CancelItem { token_id } => {
            commands::cancel_item::run(network, U256::from(token_id)).await
        }
        Commands::UpdateItem { token_id, price } => {
            commands::update_item::run(network, U256::from(token_id), Eth::parse_price(&price)?)
                .await
        }
        Commands::WithdrawProceeds => commands::withdraw::run(network).await,
        Commands::Listing { token_id } => {
            commands::listing::run(network, U256::from(token_id)).await
        }
        Commands::Mine => commands::mine::run(network).await,
    }
}
