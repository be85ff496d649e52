//! Configuration types for liveboard sessions.
//!
//! | Config Type | Purpose | Key Presets |
//! |-------------|---------|-------------|
//! | `ConnectionConfig` | Reconnection backoff | `impatient()`, `patient()` |
//! | `PollConfig` | Authoritative re-polling | `push_only()`, `paranoid()` |
//!
//! Both are consumed by the
//! [`SessionBuilder`](crate::sessions::builder::SessionBuilder); defaults
//! match the server protocol (1s backoff doubling to a 30s cap; a 30s
//! authoritative re-poll).

use web_time::Duration;

/// Default delay before the first reconnection attempt.
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Default cap on the doubling reconnection delay.
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);
/// Default interval between periodic authoritative re-polls.
const DEFAULT_REPOLL_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for the reconnection policy.
///
/// On any closure the caller did not request, a reconnection attempt is
/// scheduled after a delay that doubles with each consecutive failure,
/// starting at `initial_backoff` and capped at `max_backoff`; any
/// successful open resets the sequence. Retries continue indefinitely —
/// this is a live game, giving up is not an option short of the game
/// ending.
///
/// # Example
///
/// ```
/// use liveboard::ConnectionConfig;
/// use web_time::Duration;
///
/// // Retry sooner on flaky conference wifi
/// let config = ConnectionConfig {
///     initial_backoff: Duration::from_millis(250),
///     ..ConnectionConfig::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "ConnectionConfig has no effect unless passed to SessionBuilder::with_connection_config()"]
pub struct ConnectionConfig {
    /// Delay before the first reconnection attempt.
    ///
    /// Default: 1 second
    pub initial_backoff: Duration,
    /// Upper bound on the doubling delay.
    ///
    /// Default: 30 seconds
    pub max_backoff: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl ConnectionConfig {
    /// Creates a new `ConnectionConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration preset that reconnects aggressively. Suited to LAN or
    /// same-region play where outages are short.
    pub fn impatient() -> Self {
        Self {
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
        }
    }

    /// Configuration preset that backs off further. Suited to mobile
    /// networks where rapid retries drain batteries without connecting
    /// any sooner.
    pub fn patient() -> Self {
        Self {
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// Configuration for periodic authoritative re-polling.
///
/// Push messages normally keep the record current; the periodic snapshot
/// request is a safety net against silently dropped pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "PollConfig has no effect unless passed to SessionBuilder::with_poll_config()"]
pub struct PollConfig {
    /// Interval between snapshot requests while the link is open, or
    /// `None` to rely on push messages alone.
    ///
    /// Default: 30 seconds
    pub repoll_interval: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            repoll_interval: Some(DEFAULT_REPOLL_INTERVAL),
        }
    }
}

impl PollConfig {
    /// Creates a new `PollConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration preset that never re-polls; the record is driven by
    /// push messages and explicit resyncs only.
    pub fn push_only() -> Self {
        Self {
            repoll_interval: None,
        }
    }

    /// Configuration preset that re-polls often. Useful against servers
    /// known to drop pushes under load.
    pub fn paranoid() -> Self {
        Self {
            repoll_interval: Some(Duration::from_secs(5)),
        }
    }
}
