//! Error taxonomy for the Tiltclock library.
//!
//! Nothing here is fatal. Every variant collapses to a displayed state or a
//! warning notification at the call site:
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`TiltError::LocationUnavailable`] | `LOCATION_UNAVAILABLE` | Yes |
//! | [`TiltError::ServiceError`] | `WEATHER_SERVICE` | Yes |
//! | [`TiltError::PersistenceCorrupt`] | `PERSISTENCE_CORRUPT` | Yes |
//! | [`TiltError::InvalidConfiguration`] | `INVALID_CONFIGURATION` | Yes |
//! | [`TiltError::Storage`] | `STORAGE_IO` | Yes |
//! | [`TiltError::Config`] | `CONFIG` | No |

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TiltError {
    /// Location service missing, permission denied, or resolution timed out.
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    /// The weather service answered with a failure or could not be reached.
    #[error("weather service error: {message}")]
    ServiceError {
        status: Option<u16>,
        message: String,
    },

    /// Stored alarms could not be decoded.
    #[error("persisted data is corrupt: {0}")]
    PersistenceCorrupt(#[from] serde_json::Error),

    /// A requested transition is not allowed with the current settings.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("storage I/O failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),
}

impl TiltError {
    /// Machine-readable code for logs and user-facing notifications.
    pub fn code(&self) -> &'static str {
        match self {
            TiltError::LocationUnavailable(_) => "LOCATION_UNAVAILABLE",
            TiltError::ServiceError { .. } => "WEATHER_SERVICE",
            TiltError::PersistenceCorrupt(_) => "PERSISTENCE_CORRUPT",
            TiltError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            TiltError::Storage(_) => "STORAGE_IO",
            TiltError::Config(_) => "CONFIG",
        }
    }

    /// Whether the caller can handle the error locally and carry on.
    /// Only a broken configuration file stops startup.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TiltError::Config(_))
    }
}

pub type Result<T, E = TiltError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let err = TiltError::LocationUnavailable("denied".into());
        assert_eq!(err.code(), "LOCATION_UNAVAILABLE");
        assert!(err.is_recoverable());

        let err = TiltError::InvalidConfiguration("zero duration".into());
        assert_eq!(err.code(), "INVALID_CONFIGURATION");
        assert!(err.is_recoverable());

        let err = TiltError::PersistenceCorrupt(
            serde_json::from_str::<Vec<u8>>("not json").unwrap_err(),
        );
        assert_eq!(err.code(), "PERSISTENCE_CORRUPT");
        assert!(err.is_recoverable());
    }

    #[test]
    fn service_error_displays_message() {
        let err = TiltError::ServiceError {
            status: Some(401),
            message: "HTTP 401 Unauthorized".into(),
        };
        assert_eq!(err.to_string(), "weather service error: HTTP 401 Unauthorized");
    }
}
