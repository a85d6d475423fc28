mod dashboard;

use anyhow::Result;
use clap::Parser;
use mirage_ai::ThreatAnalyzer;
use mirage_core::{MirageConfig, PacketSynthesizer, SessionAggregator};
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "mirage", version, about = "Mirage — Simulated NIDS Console")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "mirage.toml")]
    config: String,

    /// Log level (overrides config file)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Console bind address
    #[arg(long, default_value = "127.0.0.1:8090")]
    bind: String,

    /// Begin capturing immediately instead of waiting for the console
    #[arg(long)]
    capture: bool,

    /// Generate a default config file and exit
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Generate Config ──────────────────────────────────────────────
    if cli.generate_config {
        MirageConfig::default().save(&cli.config)?;
        println!("Default configuration written to {}", cli.config);
        return Ok(());
    }

    // ── Load Config ──────────────────────────────────────────────────
    let config = MirageConfig::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: {}, using defaults", e);
        MirageConfig::default()
    });

    // ── Tracing ──────────────────────────────────────────────────────
    let log_level = cli.log_level.as_deref().unwrap_or(&config.general.log_level);
    let level = match log_level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Mirage v{}", env!("CARGO_PKG_VERSION"));

    // ── Core Components ──────────────────────────────────────────────
    let synthesizer = Arc::new(PacketSynthesizer::new());
    let aggregator = Arc::new(SessionAggregator::new(synthesizer, &config.capture));
    let analyzer = Arc::new(ThreatAnalyzer::new(&config.ai));

    info!(
        log_capacity = config.capture.log_capacity,
        series_capacity = config.capture.series_capacity,
        ai_available = analyzer.is_available(),
        "Session aggregator initialized"
    );
    if !analyzer.is_available() {
        warn!("No Gemini API key configured; analysis requests will return the fallback text");
    }

    if cli.capture {
        aggregator.start();
    }

    // ── Console ──────────────────────────────────────────────────────
    let state = dashboard::ConsoleState {
        aggregator: aggregator.clone(),
        analyzer,
        start_time: chrono::Utc::now().timestamp(),
    };
    let bind = cli.bind.clone();
    tokio::spawn(async move {
        if let Err(e) = dashboard::start_console(state, &bind).await {
            error!(error = %e, "Console failed");
        }
    });
    info!("Console available at http://{}", cli.bind);

    info!("Mirage running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // ── Graceful Shutdown ────────────────────────────────────────────
    aggregator.stop();
    let totals = aggregator.totals();
    info!(
        packets = totals.packets,
        threats = totals.threats,
        "Shutdown complete"
    );

    Ok(())
}
