/// Result alias that carries the custom [`SceneError`] type.
pub type Result<T> = std::result::Result<T, SceneError>;

/// Common error type for the core crate.
///
/// Nothing in here is fatal to a running scene. The engine degrades to a
/// missing sound or a missing animation and keeps ticking.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// A cue name could not be resolved by the cue library.
    #[error("unknown cue `{0}`")]
    UnknownCue(String),
    /// The audio backend is missing or suspended.
    #[error("audio backend unavailable: {0}")]
    AudioUnavailable(String),
    /// A track was rejected at registration time.
    #[error("invalid track: {0}")]
    InvalidTrack(String),
    /// A tone was constructed with a non-positive frequency or duration.
    #[error("invalid tone: {0}")]
    InvalidTone(String),
    /// Configuration could not be parsed or serialised.
    #[error("{0}")]
    Config(#[from] serde_json::Error),
    /// Free-form message for the application layer.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl SceneError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for SceneError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SceneError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
