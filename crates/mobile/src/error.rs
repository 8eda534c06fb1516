use shadow_tag_backend::BackendError;
use shadow_tag_core::config::ConfigError;
use shadow_tag_core::error::GameError;

/// What the app sees when a call fails. Every variant carries the message
/// meant for the player.
#[derive(Debug, thiserror::Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum MobileError {
    #[error("{0}")]
    Auth(String),

    #[error("No player is signed in")]
    NotSignedIn,

    #[error("{0}")]
    NotAllowed(String),

    #[error("{0}")]
    Location(String),

    #[error("{0}")]
    Backend(String),

    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Serialization(String),
}

impl From<GameError> for MobileError {
    fn from(error: GameError) -> Self {
        let message = error.to_string();
        match error {
            GameError::Auth(_) => Self::Auth(message),
            GameError::NoCurrentPlayer => Self::NotSignedIn,
            GameError::NotAllowed(_) | GameError::NotAdmin | GameError::Whisper(_) => {
                Self::NotAllowed(message)
            }
            GameError::Location(e) => Self::Location(e.update_message().to_owned()),
            GameError::Refused(_) | GameError::Backend(_) => Self::Backend(message),
        }
    }
}

impl From<BackendError> for MobileError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::Config(message) => Self::Config(message),
            other => Self::Backend(other.to_string()),
        }
    }
}

impl From<ConfigError> for MobileError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

impl From<serde_json::Error> for MobileError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
