//! Location capability used when sharing a position.

use thiserror::Error;

use chatline_core::config::LocationConfig;

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// Why no position could be produced.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocationError {
    /// The platform has no way to obtain a position.
    #[error("geolocation is not supported")]
    Unsupported,
    /// A provider exists but could not produce a fix.
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Source of the current position.
pub trait LocationProvider: Send {
    fn current_position(&self) -> Result<Position, LocationError>;
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Position);

impl LocationProvider for FixedLocation {
    fn current_position(&self) -> Result<Position, LocationError> {
        Ok(self.0)
    }
}

/// Provider for platforms without geolocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    fn current_position(&self) -> Result<Position, LocationError> {
        Err(LocationError::Unsupported)
    }
}

/// Provider described by the `[location]` config section.
pub fn provider_from_config(config: &LocationConfig) -> Box<dyn LocationProvider> {
    match config.coordinates() {
        Some((latitude, longitude)) => Box::new(FixedLocation(Position {
            latitude,
            longitude,
        })),
        None => Box::new(NoLocation),
    }
}
