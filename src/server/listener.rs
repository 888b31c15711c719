//! Relay server listener
//!
//! Handles TCP accept loop and spawns connection handlers.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::error::Result;
use crate::registry::ChannelRegistry;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;

/// Push/play relay server
pub struct RelayServer {
    config: ServerConfig,
    registry: Arc<ChannelRegistry>,
}

impl RelayServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, Arc::new(ChannelRegistry::new()))
    }

    /// Create a new server sharing an existing registry
    pub fn with_registry(config: ServerConfig, registry: Arc<ChannelRegistry>) -> Self {
        Self { config, registry }
    }

    /// Get a reference to the channel registry
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = self.bind().await?;

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.serve(listener) => result,
        }
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        match TcpListener::bind(self.config.bind_addr).await {
            Ok(listener) => Ok(listener),
            Err(e) => {
                tracing::error!(addr = %self.config.bind_addr, error = %e, "Failed to bind listener");
                Err(e.into())
            }
        }
    }

    /// Accept connections on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            frame_buffer = self.config.frame_buffer,
            "Relay server listening"
        );

        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        tracing::debug!(peer = %peer_addr, "New connection");

        // Configure socket
        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(peer = %peer_addr, error = %e, "Failed to configure socket");
            return;
        }

        let config = self.config.clone();
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            let mut connection = Connection::from_socket(socket, peer_addr, config, registry);

            if let Err(e) = connection.run().await {
                tracing::debug!(
                    session = %connection.session().id,
                    peer = %peer_addr,
                    error = %e,
                    "Connection error"
                );
            }

            tracing::debug!(peer = %peer_addr, "Connection closed");
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}
