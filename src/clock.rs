use web_time::{Duration, Instant};

use crate::game_record::{Color, GameRecord};

/// Default remaining time under which the display refreshes more often.
const DEFAULT_URGENT_THRESHOLD: Duration = Duration::from_secs(10);
/// Default refresh cadence below the urgency threshold.
const DEFAULT_URGENT_REFRESH: Duration = Duration::from_millis(100);
/// Default refresh cadence above the urgency threshold.
const DEFAULT_RELAXED_REFRESH: Duration = Duration::from_millis(500);

/// Configuration for clock display cadence.
///
/// The engine does not poll continuously; it reports the interval after
/// which its displayed value would visibly change, and the caller re-reads
/// at that cadence.
///
/// # Example
///
/// ```
/// use liveboard::ClockConfig;
/// use web_time::Duration;
///
/// // Refresh every frame during the last five seconds
/// let tense_config = ClockConfig {
///     urgent_threshold: Duration::from_secs(5),
///     urgent_refresh: Duration::from_millis(16),
///     ..ClockConfig::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// Remaining time under which `urgent_refresh` applies.
    ///
    /// Default: 10 seconds
    pub urgent_threshold: Duration,
    /// Re-read cadence when the active side is under the threshold.
    ///
    /// Default: 100ms
    pub urgent_refresh: Duration,
    /// Re-read cadence otherwise.
    ///
    /// Default: 500ms
    pub relaxed_refresh: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            urgent_threshold: DEFAULT_URGENT_THRESHOLD,
            urgent_refresh: DEFAULT_URGENT_REFRESH,
            relaxed_refresh: DEFAULT_RELAXED_REFRESH,
        }
    }
}

impl ClockConfig {
    /// Creates a new `ClockConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration preset for bullet time controls, where whole games are
    /// played under the default urgency threshold.
    #[must_use]
    pub fn bullet() -> Self {
        Self {
            urgent_threshold: Duration::from_secs(30),
            urgent_refresh: Duration::from_millis(100),
            relaxed_refresh: Duration::from_millis(250),
        }
    }

    /// Configuration preset for spectator/broadcast boards where sub-second
    /// precision is not worth the redraws.
    #[must_use]
    pub fn broadcast() -> Self {
        Self {
            urgent_threshold: Duration::from_secs(10),
            urgent_refresh: Duration::from_millis(250),
            relaxed_refresh: Duration::from_secs(1),
        }
    }
}

/// Extrapolated remaining time for both sides at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    /// White's predicted remaining milliseconds.
    pub white_ms: u64,
    /// Black's predicted remaining milliseconds.
    pub black_ms: u64,
    /// Whose clock is running, if any.
    pub active: Option<Color>,
}

impl ClockReading {
    /// Remaining milliseconds for one side.
    #[inline]
    #[must_use]
    pub fn remaining_ms(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_ms,
            Color::Black => self.black_ms,
        }
    }
}

/// Predicts remaining time for each side between authoritative updates.
///
/// The prediction baseline is rebuilt from the canonical record on every
/// [`sync`]; between syncs, [`read`] extrapolates the active side's clock
/// against a local monotonic reference point, floored at zero. Reads are
/// pure and may happen from any number of concurrent readers.
///
/// A zero reading for the active side is only a **local timeout
/// suspicion** — the authoritative record is the sole source of truth for
/// whether the game actually ended on time.
///
/// [`sync`]: ClockEngine::sync
/// [`read`]: ClockEngine::read
#[derive(Debug)]
pub struct ClockEngine {
    config: ClockConfig,
    white_baseline_ms: u64,
    black_baseline_ms: u64,
    active: Option<Color>,
    /// Local monotonic moment the baselines were taken. `None` until the
    /// first sync; reads return zeroed, inactive values before then.
    synced_at: Option<Instant>,
    /// When set, extrapolation stops at this instant (link down).
    frozen_at: Option<Instant>,
}

impl Default for ClockEngine {
    fn default() -> Self {
        Self::with_config(ClockConfig::default())
    }
}

impl ClockEngine {
    /// Creates a new engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new engine with the given configuration.
    #[must_use]
    pub fn with_config(config: ClockConfig) -> Self {
        Self {
            config,
            white_baseline_ms: 0,
            black_baseline_ms: 0,
            active: None,
            synced_at: None,
            frozen_at: None,
        }
    }

    /// Resets the prediction baseline from an authoritative record.
    ///
    /// Must be called whenever the reconciler updates clock-relevant
    /// fields. The server-relative snapshot values are converted into the
    /// local monotonic domain exactly once, here. Also clears any freeze:
    /// a successful sync means the link is delivering again.
    ///
    /// The active color is deliberately dropped when the record is not
    /// active — no clock may run for a pending or finished game.
    pub fn sync(&mut self, record: &GameRecord, now: Instant) {
        self.white_baseline_ms = record.white_time_ms;
        self.black_baseline_ms = record.black_time_ms;
        self.active = if record.is_active() {
            record.active_color
        } else {
            None
        };
        self.synced_at = Some(now);
        self.frozen_at = None;
    }

    /// Suspends extrapolation at `now`.
    ///
    /// While disconnected the engine does not synthesize time passing; it
    /// freezes the last prediction rather than guessing. Cleared by the
    /// next [`sync`](Self::sync).
    pub fn freeze(&mut self, now: Instant) {
        if self.frozen_at.is_none() {
            self.frozen_at = Some(now);
        }
    }

    /// Whether extrapolation is currently suspended.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen_at.is_some()
    }

    /// Returns the extrapolated remaining time for each color at `now`:
    /// `baseline - elapsed` for the active color, the baseline unchanged
    /// for the inactive color, floored at zero.
    #[must_use]
    pub fn read(&self, now: Instant) -> ClockReading {
        let Some(synced_at) = self.synced_at else {
            return ClockReading {
                white_ms: self.white_baseline_ms,
                black_ms: self.black_baseline_ms,
                active: None,
            };
        };
        let effective_now = match self.frozen_at {
            Some(frozen_at) if frozen_at < now => frozen_at,
            _ => now,
        };
        let elapsed_ms = effective_now.saturating_duration_since(synced_at).as_millis() as u64;
        let mut white_ms = self.white_baseline_ms;
        let mut black_ms = self.black_baseline_ms;
        match self.active {
            Some(Color::White) => white_ms = white_ms.saturating_sub(elapsed_ms),
            Some(Color::Black) => black_ms = black_ms.saturating_sub(elapsed_ms),
            None => {}
        }
        ClockReading {
            white_ms,
            black_ms,
            active: self.active,
        }
    }

    /// The interval after which the displayed value would visibly change:
    /// the urgent cadence once the active side is under the urgency
    /// threshold, the relaxed cadence otherwise (including when no clock
    /// is running at all).
    #[must_use]
    pub fn next_refresh_in(&self, now: Instant) -> Duration {
        let reading = self.read(now);
        match reading.active {
            Some(color)
                if reading.remaining_ms(color)
                    < self.config.urgent_threshold.as_millis() as u64 =>
            {
                self.config.urgent_refresh
            }
            _ => self.config.relaxed_refresh,
        }
    }

    /// Signals a local timeout suspicion: `Some(color)` when the active
    /// side's extrapolated time has reached zero.
    ///
    /// This does not end the game. The caller's reaction is to request the
    /// authoritative record and let it decide.
    #[must_use]
    pub fn timed_out(&self, now: Instant) -> Option<Color> {
        let reading = self.read(now);
        let active = reading.active?;
        (reading.remaining_ms(active) == 0).then_some(active)
    }
}

// #########
// # TESTS #
// #########
