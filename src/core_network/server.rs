use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::core_network::connection;
use crate::server::{ProtocolServer, ServerContext};

/// The FTP control-channel server: one accept loop, one task per connection.
pub struct FtpServer {
    listener: TcpListener,
    ctx: Arc<ServerContext>,
}

impl FtpServer {
    /// Binds the control port. Failure here is fatal for the engine and
    /// propagates to the manager.
    pub async fn bind(ctx: Arc<ServerContext>) -> Result<FtpServer> {
        let port = ctx.config.services.ftp.port;
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("failed to listen on FTP port {}", port))?;

        info!(
            "FTP server listening on port {}",
            listener.local_addr().map(|a| a.port()).unwrap_or(port)
        );

        Ok(FtpServer { listener, ctx })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    async fn accept_loop(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((socket, addr)) => {
                            let ctx = Arc::clone(&self.ctx);
                            tokio::spawn(async move {
                                connection::handle_connection(socket, addr, ctx).await;
                            });
                        }
                        Err(e) => {
                            error!("failed to accept FTP connection: {}", e);
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ProtocolServer for FtpServer {
    fn name(&self) -> &'static str {
        "FTP"
    }

    fn port(&self) -> u16 {
        self.listener
            .local_addr()
            .map(|a| a.port())
            .unwrap_or(self.ctx.config.services.ftp.port)
    }

    async fn serve(self: Box<Self>, shutdown: watch::Receiver<bool>) -> Result<()> {
        self.accept_loop(shutdown).await;
        Ok(())
    }
}
