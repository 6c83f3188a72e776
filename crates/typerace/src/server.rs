//! `TyperaceServer` builder and accept loop.
//!
//! This is the entry point for running a Typerace server. It ties the
//! layers together: transport → handler → hub → store.

use std::sync::Arc;

use typerace_hub::{Hub, HubConfig};
use typerace_store::RoomStore;
use typerace_transport::{Transport, TransportError, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{ServerConfig, TyperaceError};

/// Builder for configuring and starting a Typerace server.
///
/// # Example
///
/// ```rust,no_run
/// use typerace::prelude::*;
///
/// # async fn demo() -> Result<(), TyperaceError> {
/// let server = TyperaceServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(MemoryStore::new())
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct TyperaceServerBuilder {
    config: ServerConfig,
}

impl TyperaceServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    /// Sets the upgrade path prefix the room code follows.
    pub fn path_prefix(mut self, prefix: &str) -> Self {
        self.config.path_prefix = prefix.to_string();
        self
    }

    /// Sets the hub timings.
    pub fn hub_config(mut self, config: HubConfig) -> Self {
        self.config.hub = config;
        self
    }

    /// Binds the listener and creates the hub on top of `store`.
    ///
    /// # Errors
    /// `TyperaceError::Transport` if the address cannot be bound.
    pub async fn build<S: RoomStore>(
        self,
        store: S,
    ) -> Result<TyperaceServer<S>, TyperaceError> {
        let transport = WebSocketTransport::bind(&self.config.bind).await?;
        let hub = Hub::new(store, self.config.hub);
        Ok(TyperaceServer {
            transport,
            hub,
            path_prefix: Arc::from(self.config.path_prefix),
        })
    }
}

impl Default for TyperaceServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Typerace server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TyperaceServer<S> {
    transport: WebSocketTransport,
    hub: Hub<S>,
    path_prefix: Arc<str>,
}

impl<S: RoomStore> TyperaceServer<S> {
    /// Creates a new builder.
    pub fn builder() -> TyperaceServerBuilder {
        TyperaceServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, TransportError> {
        self.transport.local_addr()
    }

    /// The hub behind this server. Clone it to drive rooms from outside
    /// (e.g. to start the reaper or end a race early).
    pub fn hub(&self) -> &Hub<S> {
        &self.hub
    }

    /// Runs the accept loop.
    ///
    /// Every upgraded connection gets its own handler task. Runs until
    /// the process is terminated.
    pub async fn run(mut self) -> Result<(), TyperaceError> {
        tracing::info!(prefix = %self.path_prefix, "typerace server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let hub = self.hub.clone();
                    let prefix = Arc::clone(&self.path_prefix);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, hub, prefix).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
