//! dbauth-bridge - Multi-method authentication bridge for database gateways
//!
//! This binary runs the bridge standalone: it loads the configuration,
//! builds the authentication stack, and holds it ready for the embedding
//! gateway's wire listeners. Useful for validating a configuration and
//! for test deployments with the static directory.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use dbauth_bridge::audit::AuditLog;
use dbauth_bridge::config;
use dbauth_bridge::dispatch::OutboundGate;
use dbauth_bridge::secrets::{MemoryVault, SecretStore, VaultCipher};
use dbauth_bridge::{
    AuthenticationSelector, Result, SessionRegistry, StaticDirectory, TokenBridge,
};

#[derive(Parser)]
#[command(name = "dbauth-bridge")]
#[command(version = "0.1.0")]
#[command(about = "Multi-method authentication bridge for database gateways")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Enable verbose/debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Priority: --verbose flag, then RUST_LOG env var, then config level
    let config = config::load_config(&cli.config)?;
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone())
    };
    tracing_subscriber::fmt().with_env_filter(&log_level).init();

    info!("Starting dbauth-bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from {:?}", cli.config);

    let gate = Arc::new(OutboundGate::new(config.selector.max_outbound_calls));

    let cipher = match &config.secret_store.master_key {
        Some(passphrase) => VaultCipher::from_passphrase(passphrase),
        None => {
            warn!("No master key configured; vault secrets will not survive a restart");
            VaultCipher::random()
        }
    };
    let secrets = Arc::new(SecretStore::new(Arc::new(MemoryVault::new()), cipher));

    let directory = Arc::new(StaticDirectory::from_config(&config.directory));
    let sessions = Arc::new(SessionRegistry::new());
    let audit = AuditLog::new();

    let mut selector = AuthenticationSelector::new(
        config.selector.clone(),
        directory,
        Arc::clone(&secrets),
        Arc::clone(&sessions),
        audit,
        Arc::clone(&gate),
    );

    if let Some(token_config) = &config.token {
        let bridge = TokenBridge::new(token_config.clone(), Arc::clone(&secrets), Arc::clone(&gate))?;
        selector = selector.with_token_bridge(Arc::new(bridge));
        info!(endpoint = %token_config.token_endpoint, "Token bridge enabled");
    }

    if config.ticket.is_some() {
        // The ticket backend is supplied by the embedding gateway; a
        // standalone bridge has nothing to negotiate against, so the
        // method falls through to the next candidate.
        warn!("Ticket method configured but no backend is available standalone");
    }

    // Held for the embedding gateway's listeners until shutdown
    let _selector = Arc::new(selector);
    info!(
        candidates = ?config.selector.candidate_order().iter().map(|m| m.as_str()).collect::<Vec<_>>(),
        "Authentication stack ready"
    );

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => { sigterm.recv().await; }
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    info!("Shutdown complete. Live sessions: {}", sessions.len());

    Ok(())
}
