//! Chatline Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by the other Chatline crates:
//! - Application configuration (server URL, reconnect tuning, location)
//! - The unified error type
//! - Structured logging with tracing
//! - Platform data directories
//! - Common constants

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;

// Re-export commonly used items at the crate root
pub use config::AppConfig;
pub use error::{ChatError, ChatResult};
pub use logging::init_logging;
pub use platform::Platform;
