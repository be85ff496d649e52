use std::sync::Arc;

use crate::clock::{ClockConfig, ClockEngine};
use crate::error::LiveboardError;
use crate::game_record::{Color, GameId, GameRecord};
use crate::network::connection::ConnectionManager;
use crate::oracle::RulesOracle;
use crate::sessions::config::{ConnectionConfig, PollConfig};
use crate::sessions::game_session::GameSession;
use crate::DuplexTransport;

/// The [`SessionBuilder`] assembles a [`GameSession`].
///
/// A transport and a rules oracle are required; everything else has
/// sensible defaults. Use
/// [`start`](Self::start) to consume the builder — it begins the first
/// connection attempt immediately.
///
/// # Example
///
/// ```ignore
/// let mut session = SessionBuilder::new(GameId::from("g-42"), Color::White)
///     .with_transport(Box::new(WsTransport::new("ws://example.org/play")))
///     .with_oracle(Arc::new(ChessRules::new()))
///     .with_connection_config(ConnectionConfig::impatient())
///     .start()?;
/// ```
#[must_use = "SessionBuilder must be consumed by calling start()"]
pub struct SessionBuilder {
    game_id: GameId,
    local_color: Color,
    transport: Option<Box<dyn DuplexTransport>>,
    oracle: Option<Arc<dyn RulesOracle>>,
    connection_config: ConnectionConfig,
    clock_config: ClockConfig,
    poll_config: PollConfig,
}

impl SessionBuilder {
    /// Construct a new builder for one game, naming the side this client
    /// plays. All configuration starts at its default.
    pub fn new(game_id: GameId, local_color: Color) -> Self {
        Self {
            game_id,
            local_color,
            transport: None,
            oracle: None,
            connection_config: ConnectionConfig::default(),
            clock_config: ClockConfig::default(),
            poll_config: PollConfig::default(),
        }
    }

    /// Sets the duplex transport the connection manager drives. Required.
    pub fn with_transport(mut self, transport: Box<dyn DuplexTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the legality oracle. Required.
    pub fn with_oracle(mut self, oracle: Arc<dyn RulesOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Overrides the reconnection backoff policy.
    pub fn with_connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection_config = config;
        self
    }

    /// Overrides the clock display cadence.
    pub fn with_clock_config(mut self, config: ClockConfig) -> Self {
        self.clock_config = config;
        self
    }

    /// Overrides the periodic authoritative re-polling policy.
    pub fn with_poll_config(mut self, config: PollConfig) -> Self {
        self.poll_config = config;
        self
    }

    /// Consumes the builder and starts the session. The first connection
    /// attempt begins here; the first full snapshot is requested as soon
    /// as the link comes up.
    ///
    /// # Errors
    /// - Returns [`InvalidRequest`] if no transport or no oracle was set.
    ///
    /// [`InvalidRequest`]: LiveboardError::InvalidRequest
    pub fn start(self) -> Result<GameSession, LiveboardError> {
        let transport = self
            .transport
            .ok_or_else(|| LiveboardError::InvalidRequest {
                info: "a transport is required; call with_transport()".to_owned(),
            })?;
        let oracle = self.oracle.ok_or_else(|| LiveboardError::InvalidRequest {
            info: "a rules oracle is required; call with_oracle()".to_owned(),
        })?;

        let connection =
            ConnectionManager::open(transport, self.game_id.clone(), self.connection_config);
        let record = GameRecord::initial(self.game_id);
        Ok(GameSession::new(
            connection,
            record,
            oracle,
            self.local_color,
            ClockEngine::with_config(self.clock_config),
            self.poll_config,
        ))
    }
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("game_id", &self.game_id)
            .field("local_color", &self.local_color)
            .field("has_transport", &self.transport.is_some())
            .field("has_oracle", &self.oracle.is_some())
            .field("connection_config", &self.connection_config)
            .field("clock_config", &self.clock_config)
            .field("poll_config", &self.poll_config)
            .finish()
    }
}
