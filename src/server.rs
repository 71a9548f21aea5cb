use anyhow::{bail, Result};
use async_trait::async_trait;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::constants::SHUTDOWN_GRACE;
use crate::core_auth::Authenticator;
use crate::core_network::server::FtpServer;
use crate::core_tftp::server::TftpServer;
use crate::core_vfs::Vfs;

/// Everything a protocol engine needs to serve a session: configuration
/// snapshot, credential store, and the sandboxed filesystem. Immutable and
/// shared; connections hold this instead of back-references to their server.
pub struct ServerContext {
    pub config: Arc<Config>,
    pub auth: Arc<Authenticator>,
    pub vfs: Arc<Vfs>,
}

impl ServerContext {
    pub fn new(config: Config) -> Self {
        let auth = Arc::new(Authenticator::new(&config.users));
        let vfs = Arc::new(Vfs::new(config.data.clone()));
        Self {
            config: Arc::new(config),
            auth,
            vfs,
        }
    }
}

/// Capability surface of a protocol engine. Exactly two implementations:
/// FTP and TFTP. Binding happens before `serve`, so a port conflict is
/// reported as a startup failure rather than inside a task.
#[async_trait]
pub trait ProtocolServer: Send {
    fn name(&self) -> &'static str;
    /// The actually bound port (meaningful when the config asked for 0).
    fn port(&self) -> u16;
    /// Runs the engine until the shutdown signal flips.
    async fn serve(self: Box<Self>, shutdown: watch::Receiver<bool>) -> Result<()>;
}

/// Owns the enabled engines: binds them, runs them concurrently, and
/// propagates shutdown with a bounded grace period.
pub struct ServerManager {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<(&'static str, JoinHandle<Result<()>>)>,
}

impl ServerManager {
    pub async fn start(ctx: Arc<ServerContext>) -> Result<ServerManager> {
        let mut engines: Vec<Box<dyn ProtocolServer>> = Vec::new();

        if ctx.config.services.ftp.enabled {
            engines.push(Box::new(FtpServer::bind(Arc::clone(&ctx)).await?));
        }
        if ctx.config.services.tftp.enabled {
            engines.push(Box::new(TftpServer::bind(Arc::clone(&ctx)).await?));
        }

        if engines.is_empty() {
            bail!("no servers enabled");
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::new();

        for engine in engines {
            let name = engine.name();
            info!("starting {} server on port {}", name, engine.port());
            handles.push((name, tokio::spawn(engine.serve(shutdown_rx.clone()))));
        }

        Ok(ServerManager {
            shutdown_tx,
            handles,
        })
    }

    /// Signals every engine and waits for each to exit, bounded by the
    /// shutdown grace period.
    pub async fn stop(self) {
        info!("stopping all servers...");
        let _ = self.shutdown_tx.send(true);

        for (name, handle) in self.handles {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(Ok(()))) => info!("stopped {} server", name),
                Ok(Ok(Err(e))) => error!("{} server exited with error: {}", name, e),
                Ok(Err(e)) => error!("{} server task panicked: {}", name, e),
                Err(_) => warn!("{} server did not stop within the grace period", name),
            }
        }

        info!("all servers stopped");
    }
}
