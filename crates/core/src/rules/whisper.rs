use unicode_segmentation::UnicodeSegmentation;

pub const MAX_WHISPER_LEN: usize = 100;

/// Canned whispers offered next to the free-text box.
pub const QUICK_WHISPERS: [&str; 8] = [
    "I see you 👀",
    "You're next.",
    "Don't trust them.",
    "Behind you...",
    "Run while you can.",
    "They're watching.",
    "Not who you think.",
    "Look around.",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WhisperError {
    #[error("Whisper is empty")]
    Empty,

    #[error("Whispers are limited to {MAX_WHISPER_LEN} characters")]
    TooLong,
}

/// The trimmed message, if it can be sent. Length counts user-perceived
/// characters, so an emoji is one.
pub fn validate_whisper(message: &str) -> Result<&str, WhisperError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(WhisperError::Empty);
    }
    if message.graphemes(true).count() > MAX_WHISPER_LEN {
        return Err(WhisperError::TooLong);
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_rejects_empty() {
        assert_eq!(validate_whisper("  Look around.  "), Ok("Look around."));
        assert_eq!(validate_whisper(" \n "), Err(WhisperError::Empty));
    }

    #[test]
    fn test_length_limit_counts_graphemes() {
        assert!(validate_whisper(&"a".repeat(100)).is_ok());
        assert_eq!(validate_whisper(&"a".repeat(101)), Err(WhisperError::TooLong));
        assert!(validate_whisper(&"👀".repeat(100)).is_ok());
    }

    #[test]
    fn test_quick_whispers_are_valid() {
        assert!(QUICK_WHISPERS.iter().all(|m| validate_whisper(m).is_ok()));
    }
}
