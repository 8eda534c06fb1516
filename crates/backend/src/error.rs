//! Errors raised by backend clients.

/// PostgREST error code for "zero (or more than one) rows returned" on a
/// single-object request.
pub const NO_ROWS_CODE: &str = "PGRST116";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("Not found: {0}")]
    NotFound(String),

    /// A procedure refused the call (the backend raised an exception).
    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl BackendError {
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_no_rows(&self) -> bool {
        self.code() == Some(NO_ROWS_CODE)
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rows_detection() {
        let err = BackendError::Api {
            status: 406,
            code: Some(NO_ROWS_CODE.into()),
            message: "JSON object requested, multiple (or no) rows returned".into(),
        };
        assert!(err.is_no_rows());
        assert!(!BackendError::NotSignedIn.is_no_rows());
    }
}
