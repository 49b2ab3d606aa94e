use std::time::Duration;

/// Timing and sizing limits for the room hub and its client connections.
///
/// Defaults mirror the values the server has always shipped with; each can
/// be overridden through the environment for load testing.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// How long a connection may go without any peer activity (data or
    /// pong) before it is considered dead.
    pub read_timeout: Duration,
    /// Interval between server keepalive pings. Must be shorter than
    /// `read_timeout` so a healthy peer always produces activity in time.
    pub ping_interval: Duration,
    /// Deadline for a single outbound write burst.
    pub write_timeout: Duration,
    /// Maximum accepted size of a single inbound text frame, in bytes.
    pub max_frame_bytes: usize,
    /// Capacity of each client's outbound message queue.
    pub outbound_capacity: usize,
}

const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;
const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MAX_FRAME_BYTES: usize = 512;
const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

impl HubConfig {
    /// Builds a config from the environment, falling back to defaults.
    ///
    /// The ping interval is always derived as 9/10 of the read timeout so
    /// the two cannot be misconfigured relative to each other.
    pub fn from_env() -> Self {
        let read_timeout_secs = std::env::var("HUB_READ_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_READ_TIMEOUT_SECS);

        let write_timeout_secs = std::env::var("HUB_WRITE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_WRITE_TIMEOUT_SECS);

        let max_frame_bytes = std::env::var("HUB_MAX_FRAME_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_FRAME_BYTES);

        let outbound_capacity = std::env::var("HUB_OUTBOUND_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_OUTBOUND_CAPACITY);

        Self::with_read_timeout(Duration::from_secs(read_timeout_secs))
            .write_timeout(Duration::from_secs(write_timeout_secs))
            .max_frame_bytes(max_frame_bytes)
            .outbound_capacity(outbound_capacity)
    }

    /// Creates a config with the given read timeout and a derived ping
    /// interval; other fields take their defaults.
    pub fn with_read_timeout(read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            ping_interval: read_timeout.mul_f64(0.9),
            write_timeout: Duration::from_secs(DEFAULT_WRITE_TIMEOUT_SECS),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }

    pub fn write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    pub fn max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    pub fn outbound_capacity(mut self, outbound_capacity: usize) -> Self {
        self.outbound_capacity = outbound_capacity;
        self
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::with_read_timeout(Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS))
    }
}
