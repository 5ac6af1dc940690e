/// Result alias that carries the custom [`MoodMusicError`] type.
pub type Result<T> = std::result::Result<T, MoodMusicError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum MoodMusicError {
    /// The tone generation capability could not be constructed, or failed
    /// while a note was being emitted.
    #[error("tone backend unavailable: {0}")]
    BackendUnavailable(String),
    /// A user supplied mood table failed validation.
    #[error("invalid mood table: {0}")]
    InvalidMoodTable(String),
    /// Audio settings outside the range the renderer can honour.
    #[error("invalid audio config: {0}")]
    InvalidAudioConfig(String),
    /// Free-form error surfaced by the command line layer.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper around WAV encoding errors.
    #[error("{0}")]
    Wav(#[from] hound::Error),
}

impl MoodMusicError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn backend<T: Into<String>>(msg: T) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    pub fn invalid_audio<T: Into<String>>(msg: T) -> Self {
        Self::InvalidAudioConfig(msg.into())
    }

    pub fn invalid_table<T: Into<String>>(msg: T) -> Self {
        Self::InvalidMoodTable(msg.into())
    }
}

impl From<&str> for MoodMusicError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for MoodMusicError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_name_the_cause() {
        let err = MoodMusicError::backend("no output device");
        assert_eq!(err.to_string(), "tone backend unavailable: no output device");
    }

    #[test]
    fn plain_strings_become_messages() {
        let err: MoodMusicError = "boom".into();
        assert!(matches!(err, MoodMusicError::Message(ref m) if m == "boom"));
    }
}
