use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::info;
use std::io::Write;
use std::sync::Arc;

use aioftpd::config::Config;
use aioftpd::core_cli::Cli;
use aioftpd::server::{ServerContext, ServerManager};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_cli(&args)?;

    // Initialize the logger with a custom format; RUST_LOG overrides the
    // configured level.
    Builder::from_env(Env::default().default_filter_or(config.logging.level.clone()))
        .format(|buf, record| {
            let timestamp = buf.timestamp();
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                record.level(),
                record.args()
            )
        })
        .init();

    config.validate()?;

    info!("starting aioftpd...");
    info!("data directory: {}", config.data);
    info!("users configured: {}", config.users.len());

    let ctx = Arc::new(ServerContext::new(config));
    let manager = ServerManager::start(ctx).await?;

    wait_for_signal().await;
    info!("received shutdown signal, initiating graceful shutdown...");

    manager.stop().await;
    Ok(())
}

/// Blocks until ctrl-c or, on unix, SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => {
                tokio::signal::ctrl_c().await.ok();
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}
