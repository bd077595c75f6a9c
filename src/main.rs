use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use bankwatch::analytics::Analytics;
use bankwatch::config::{Mode, Settings};
use bankwatch::dashboard::{Dashboard, DashboardLoader};
use bankwatch::fetch::{MonitoredFetch, Transport};
use bankwatch::logging;
use bankwatch::logstore::LogStore;
use bankwatch::monitor::Monitor;
use bankwatch::normalize::InvalidAmountPolicy;
use bankwatch::risk::risk_counts;
use bankwatch::sandbox::{self, SandboxBank};
use bankwatch::tui;
use bankwatch::web;

#[derive(Parser)]
#[command(name = "bankwatch", about = "Bank account dashboard with movement analytics and API self-monitoring")]
struct Cli {
    /// Run mode
    #[arg(long, value_enum, default_value = "tui")]
    mode: Mode,

    /// Bank API base URL
    #[arg(long, env = "BANK_API_BASE_URL")]
    base_url: Option<String>,

    /// Bank API key, sent as x-api-key
    #[arg(long, env = "BANK_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// Account to display
    #[arg(long, env = "ACCOUNT_ID", default_value = "999")]
    account_id: String,

    /// Load through a running bankwatch proxy instead of calling the bank (tui/headless)
    #[arg(long, env = "BANKWATCH_PROXY_URL")]
    proxy_url: Option<String>,

    /// Where the request log (and the tui log file) is kept
    #[arg(long, env = "BANKWATCH_DATA_DIR", default_value = ".bankwatch")]
    data_dir: PathBuf,

    /// HTTP port (web and sandbox modes)
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Static dashboard assets served by web mode
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,

    /// Handling of movements whose amount can't be parsed
    #[arg(long, value_enum, default_value = "drop")]
    invalid_amounts: InvalidAmountPolicy,

    /// Upstream request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Movements generated by the sandbox bank
    #[arg(long, default_value = "60")]
    movements: usize,

    /// Share of sandbox movements that are injected anomalies (0.0-1.0)
    #[arg(long, default_value = "0.1")]
    anomaly_rate: f64,
}

impl Cli {
    fn into_settings(self) -> Settings {
        Settings {
            mode: self.mode,
            base_url: self.base_url,
            api_key: self.api_key,
            account_id: self.account_id,
            proxy_url: self.proxy_url,
            data_dir: self.data_dir,
            port: self.port,
            static_dir: self.static_dir,
            invalid_amounts: self.invalid_amounts,
            timeout: Duration::from_secs(self.timeout_secs),
            sandbox_movements: self.movements,
            anomaly_rate: self.anomaly_rate,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let settings = Cli::parse().into_settings();
    let _log_guard = logging::init(settings.mode, &settings.data_dir)?;
    settings.validate()?;

    match settings.mode {
        Mode::Tui => tui::run(Arc::new(build_dashboard(&settings)?)).await?,
        Mode::Web => web::run(&settings).await?,
        Mode::Headless => return run_headless(&settings).await,
        Mode::Sandbox => {
            let bank = SandboxBank::generate(
                settings.account_id.clone(),
                settings.api_key.clone(),
                settings.sandbox_movements,
                settings.anomaly_rate,
            );
            sandbox::run(settings.port, bank).await?
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn build_dashboard(settings: &Settings) -> Result<Dashboard<Arc<dyn Transport>>, Box<dyn std::error::Error>> {
    let monitor = Arc::new(Monitor::new(LogStore::open(&settings.data_dir)));
    let loader = DashboardLoader::new(
        MonitoredFetch::new(settings.transport()?, monitor),
        settings.account_id.clone(),
        Analytics::new(settings.invalid_amounts),
    );
    Ok(Dashboard::new(loader))
}

async fn run_headless(settings: &Settings) -> Result<ExitCode, Box<dyn std::error::Error>> {
    println!("=== bankwatch (headless) ===");
    println!("Account: {}", settings.account_id);
    println!();

    let dashboard = build_dashboard(settings)?;
    let loaded = dashboard.refresh().await;
    let monitor = dashboard.monitor().snapshot();

    let code = match loaded {
        Ok(snapshot) => {
            let balance = snapshot.balance.map(|b| format!("{b:.2}")).unwrap_or_else(|| "n/a".to_string());
            println!("  Balance:            {}", balance);
            println!("  Movements:          {}", snapshot.ledger.len());
            println!("  Skipped records:    {}", snapshot.rejected.len());
            println!("  Total in:           {:.2}", snapshot.stats.total_in);
            println!("  Total out:          {:.2}", snapshot.stats.total_out);
            if let Some(last) = snapshot.ledger.last() {
                println!("  Closing balance:    {:.2}", last.dynamic_balance);
            }
            println!();

            println!("  Top {}:", snapshot.stats.top5.len());
            for m in &snapshot.stats.top5 {
                println!("    {}  {:<30} {:>12.2}", m.date.format("%Y-%m-%d"), m.description, m.amount);
            }
            println!();

            println!("  Risks ({}):", snapshot.stats.risks.len());
            for risk in &snapshot.stats.risks {
                println!(
                    "    {:<9} {}  {:<30} {:>12.2}",
                    risk.risk_kind.label(),
                    risk.movement.date.format("%Y-%m-%d"),
                    risk.movement.description,
                    risk.movement.amount
                );
            }
            let mut counts: Vec<_> = risk_counts(&snapshot.stats.risks).into_iter().collect();
            counts.sort();
            for (name, count) in counts {
                println!("    {}: {}", name, count);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("  Load failed: {e}");
            ExitCode::FAILURE
        }
    };

    println!();
    println!("  System status:      {}", monitor.health.status.label());
    println!("  Logged requests:    {}", monitor.logs.len());
    println!(
        "  Latency (ms):       p50={} p95={} p99={} min={} max={}",
        monitor.latency.p50_ms, monitor.latency.p95_ms, monitor.latency.p99_ms, monitor.latency.min_ms, monitor.latency.max_ms
    );

    Ok(code)
}
