use shadow_tag_backend::BackendError;

use crate::location::LocationError;
use crate::rules::credentials::CredentialError;
use crate::rules::whisper::WhisperError;

/// Login and signup failures. The messages are shown to the player as-is.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Invalid(#[from] CredentialError),

    #[error("An error occurred. Please try again.")]
    Lookup,

    #[error("Player not found. Please check your codename or sign up.")]
    PlayerNotFound,

    #[error("Invalid password. Please try again.")]
    InvalidPassword,

    #[error("Failed to load player data. Please try again.")]
    PlayerDataUnavailable,

    #[error("This codename is already taken. Please choose another one.")]
    CodenameTaken,

    #[error("This codename is already registered. Please try logging in instead.")]
    AlreadyRegistered,

    #[error("Failed to create account. Please try again.")]
    AccountNotCreated,

    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("No player is signed in")]
    NoCurrentPlayer,

    /// The current player may not do this right now.
    #[error("{0}")]
    NotAllowed(&'static str),

    #[error("Only admins can do that")]
    NotAdmin,

    #[error("The game refused to {0}")]
    Refused(&'static str),

    #[error(transparent)]
    Whisper(#[from] WhisperError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type Result<T> = std::result::Result<T, GameError>;
