//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "Chatline";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Echo endpoint used when no server URL is configured.
pub const DEFAULT_SERVER_URL: &str = "wss://echo.websocket.org";

/// First reconnect delay in milliseconds.
pub const DEFAULT_RECONNECT_BASE_MS: u64 = 2_000;

/// Upper bound on any reconnect delay in milliseconds.
pub const DEFAULT_RECONNECT_MAX_MS: u64 = 8_000;

/// How long a WebSocket handshake may take before the attempt is abandoned.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Log file name prefix (tracing-appender adds the date suffix).
pub const LOG_FILE_NAME: &str = "chatline.log";

/// Config file name inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Capacity of the session event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Geolocation probe wire format and link rendering.
pub mod geo {
    /// Prefix of the probe frame: `geo:<lat>,<lon>`.
    pub const PROBE_PREFIX: &str = "geo:";

    /// OpenStreetMap zoom level used in shared location links.
    pub const MAP_ZOOM: u8 = 18;

    /// Base URL of the map link.
    pub const MAP_BASE_URL: &str = "https://www.openstreetmap.org/";

    /// Decimal places shown in the link label.
    pub const LABEL_PRECISION: usize = 5;
}
