//! `DarkhouseServer` builder and server loop.
//!
//! This is the entry point for running a Darkhouse server. It ties
//! together all the layers: transport → protocol → session → game loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use darkhouse_protocol::{Codec, JsonCodec};
use darkhouse_session::{ConnectionDirectory, SessionController, SessionRegistry};
use darkhouse_sim::TickConfig;
use darkhouse_transport::{Transport, WebSocketTransport};

use crate::game::GameLoops;
use crate::handler::handle_connection;
use crate::outbox::Outbox;
use crate::{DarkhouseError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) controller: SessionController<Arc<Outbox>>,
    pub(crate) outbox: Arc<Outbox>,
    pub(crate) games: GameLoops<Arc<Outbox>>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Darkhouse server.
///
/// # Example
///
/// ```rust,no_run
/// use darkhouse::prelude::*;
///
/// # async fn run() -> Result<(), DarkhouseError> {
/// let server = DarkhouseServer::builder()
///     .bind("0.0.0.0:8080")
///     .tick_rate(30)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DarkhouseServerBuilder {
    config: ServerConfig,
}

impl DarkhouseServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the game-loop tick rate in Hz.
    pub fn tick_rate(mut self, tick_rate_hz: u32) -> Self {
        self.config.tick_rate_hz = tick_rate_hz;
        self
    }

    /// Caps the step handed to the movement integrator.
    pub fn max_dt(mut self, max_dt: Duration) -> Self {
        self.config.max_dt = max_dt;
        self
    }

    /// Sets how often empty rooms are dropped, or `None` to keep them.
    pub fn prune_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.prune_interval = interval;
        self
    }

    /// Binds the listener and wires up the session layer.
    pub async fn build(self) -> Result<DarkhouseServer<JsonCodec>, DarkhouseError> {
        self.build_with_codec(JsonCodec).await
    }

    /// Like [`build`](Self::build) with a different wire encoding.
    pub async fn build_with_codec<C: Codec>(
        self,
        codec: C,
    ) -> Result<DarkhouseServer<C>, DarkhouseError> {
        let config = self.config;
        let transport = WebSocketTransport::bind(&config.bind_addr).await?;

        let outbox = Arc::new(Outbox::new());
        let controller = SessionController::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(ConnectionDirectory::new()),
            Arc::clone(&outbox),
        );
        let games = GameLoops::new(
            Arc::clone(&outbox),
            TickConfig::with_rate(config.tick_rate_hz),
            config.max_dt,
        );

        let state = Arc::new(ServerState {
            controller,
            outbox,
            games,
            codec,
        });

        Ok(DarkhouseServer {
            transport,
            state,
            prune_interval: config.prune_interval,
        })
    }
}

/// A bound Darkhouse server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DarkhouseServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    prune_interval: Option<Duration>,
}

impl DarkhouseServer {
    /// Creates a new builder.
    pub fn builder() -> DarkhouseServerBuilder {
        DarkhouseServerBuilder::new()
    }
}

impl<C: Codec> DarkhouseServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task per connection and, when configured, a task
    /// that drops empty rooms. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), DarkhouseError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Darkhouse server running");

        if let Some(interval) = self.prune_interval {
            tokio::spawn(prune_rooms(Arc::clone(&self.state), interval));
        }

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
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

/// Periodically drops empty rooms and forgets stopped game loops.
async fn prune_rooms<C: Codec>(state: Arc<ServerState<C>>, period: Duration) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let rooms = state.controller.registry().prune_empty().await;
        let games = state.games.prune_stopped();
        tracing::debug!(rooms, games, "prune pass");
    }
}
