//! x402 payment agent HTTP server.
//!
//! # Usage
//!
//! ```bash
//! SUI_PRIVATE_KEY=0x... cargo run -p s402-agent --release
//! ```
//!
//! Every flag has an environment fallback; see `s402-agent --help`.
//! `RUST_LOG` sets the log filter (default: `info`).

use std::net::SocketAddr;

use axum::http::Method;
use clap::Parser;
use tower_http::cors;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use s402_agent::config::AgentConfig;
use s402_agent::ledger::Ledger;
use s402_agent::{AgentGate, PaymentAgent, agent_router};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(AgentConfig::parse()).await {
        tracing::error!("Agent failed: {e}");
        std::process::exit(1);
    }
}

async fn run(config: AgentConfig) -> Result<(), Box<dyn std::error::Error>> {
    let wallet = config.wallet()?;
    if wallet.is_none() {
        tracing::warn!("SUI_PRIVATE_KEY not set, payments are disabled");
    }

    let (opener, gate) = AgentGate::new();
    let network = config.network.clone();
    let db = config.db.clone();
    let max_spend = config.max_spend_mist;
    let _startup = tokio::task::spawn_blocking(move || {
        tracing::info!(db = %db.display(), "Opening ledger");
        let agent = Ledger::open(&db)
            .map_err(Into::into)
            .and_then(|ledger| PaymentAgent::new(network, wallet, ledger, max_spend));
        opener.resolve(agent);
    });

    let app = agent_router(gate)
        .layer(TraceLayer::new_for_http())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Agent listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Agent shut down gracefully");
    Ok(())
}

/// Waits for Ctrl-C or SIGTERM (Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, shutting down..."),
        () = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
