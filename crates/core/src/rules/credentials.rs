//! Form checks run before login and signup reach the backend.

use std::ops::RangeInclusive;

pub const CODENAME_LEN: RangeInclusive<usize> = 3..=16;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("Please enter both codename and password")]
    Missing,

    #[error("Codename is required")]
    CodenameRequired,

    #[error("Codename must be between 3 and 16 characters")]
    CodenameLength,

    #[error("Codename can only contain letters, numbers, and underscores")]
    CodenameCharacters,

    #[error("Password is required")]
    PasswordRequired,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
}

pub fn validate_login(codename: &str, password: &str) -> Result<(), CredentialError> {
    if codename.trim().is_empty() || password.trim().is_empty() {
        return Err(CredentialError::Missing);
    }
    Ok(())
}

pub fn validate_signup(codename: &str, password: &str) -> Result<(), CredentialError> {
    let codename = codename.trim();
    if codename.is_empty() {
        return Err(CredentialError::CodenameRequired);
    }
    if !CODENAME_LEN.contains(&codename.chars().count()) {
        return Err(CredentialError::CodenameLength);
    }
    if !codename.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(CredentialError::CodenameCharacters);
    }

    if password.is_empty() {
        return Err(CredentialError::PasswordRequired);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CredentialError::PasswordTooShort);
    }
    Ok(())
}
