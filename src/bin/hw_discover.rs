use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Table};
use tokio::time::sleep;
use tracing::info;

use hw_account_discovery::simulator::{SimulatedBalances, SimulatedDevice};
use hw_account_discovery::{
    cut_middle, logging, AccountDiscovery, AccountPager, DerivationPath, DiscoveryConfig,
    LedgerPathKind,
};

#[derive(Clone, Copy, ValueEnum)]
enum Wallet {
    Ledger,
    Trezor,
}

#[derive(Clone, Copy, ValueEnum)]
enum LedgerLayout {
    Live,
    Legacy,
}

#[derive(Parser)]
#[command(name = "hw-discover")]
#[command(about = "Walk the hardware account discovery flow against a simulated device")]
struct Cli {
    /// Wallet family to connect
    #[arg(long, value_enum, default_value = "ledger")]
    wallet: Wallet,

    /// Ledger derivation layout
    #[arg(long, value_enum, default_value = "live")]
    ledger_path: LedgerLayout,

    /// Override the derivation path, e.g. "m/44'/60'/0'"
    #[arg(long)]
    path: Option<String>,

    /// Addresses requested per device round-trip
    #[arg(long)]
    batch_size: Option<usize>,

    /// JSON config file; flags above are ignored when given
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of view pages to list before picking
    #[arg(long, default_value_t = 1)]
    pages: usize,

    /// 1-based account number to confirm
    #[arg(long, default_value_t = 1)]
    pick: usize,

    /// Simulated balance lookup latency in milliseconds
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn discovery_config(&self) -> Result<DiscoveryConfig> {
        if let Some(file) = &self.config {
            return DiscoveryConfig::from_file(file)
                .with_context(|| format!("Failed to load {}", file.display()));
        }

        let mut config = match (self.wallet, self.ledger_path) {
            (Wallet::Trezor, _) => DiscoveryConfig::trezor(),
            (Wallet::Ledger, LedgerLayout::Live) => DiscoveryConfig::ledger(LedgerPathKind::Live),
            (Wallet::Ledger, LedgerLayout::Legacy) => DiscoveryConfig::ledger(LedgerPathKind::Legacy),
        };
        if let Some(path) = &self.path {
            config.path = path.parse::<DerivationPath>()?;
        }
        if let Some(batch_size) = self.batch_size {
            config = config.with_batch_size(batch_size)?;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = cli.discovery_config()?;
    info!("Connecting {} on {}", config.kind, config.path);

    let balances = SimulatedBalances::new().with_latency(Duration::from_millis(cli.latency_ms));
    let discovery = Arc::new(AccountDiscovery::new(
        config,
        Arc::new(SimulatedDevice::new()),
        Arc::new(balances),
    ));

    let connecting = tokio::spawn({
        let discovery = discovery.clone();
        async move { discovery.connect().await }
    });

    while !discovery.has_pending_choice().await {
        if connecting.is_finished() {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    if connecting.is_finished() && !discovery.has_pending_choice().await {
        connecting.await??;
        return Err(anyhow!("Device settled before any account was chosen"));
    }

    let mut pager = AccountPager::new(discovery.clone());
    for i in 0..cli.pages {
        if i > 0 {
            pager.next_page().await?;
        }
        render_page(&pager).await;
    }

    let chosen = discovery
        .accounts()
        .await
        .get(cli.pick.saturating_sub(1))
        .map(|account| account.address().to_string())
        .ok_or_else(|| anyhow!("Account #{} was not discovered", cli.pick))?;
    pager.select(&chosen).await?;
    pager.confirm().await?;

    let address = connecting.await??;
    let confirmed = discovery.confirmed(&address);
    println!("{}", serde_json::to_string_pretty(&confirmed)?);
    Ok(())
}

async fn render_page(pager: &AccountPager) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["#", "Address", "Balance"]);

    for (row, account) in pager.visible().await.iter().enumerate() {
        table.add_row([
            pager.display_number(row).to_string(),
            cut_middle(account.address(), 7, 5),
            account.balance.to_string(),
        ]);
    }

    println!("Page {}", pager.page() + 1);
    println!("{}", table);
}
