use thiserror::Error;

/// Error types for the contract binding layer
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or short ABI bytes, offsets out of range
    #[error("ABI decode error: {0}")]
    Decode(String),

    /// Value incompatible with its declared ABI type
    #[error("ABI encode error: {0}")]
    Encode(String),

    /// Primary topic of a log does not match the event descriptor
    #[error("Topic mismatch: expected {expected}, found {}", .found.as_deref().unwrap_or("no topic"))]
    TopicMismatch {
        expected: String,
        found: Option<String>,
    },

    /// Contract execution reverted
    #[error("Execution reverted: {0}")]
    Reverted(String),

    /// Network or node level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid type, signature or descriptor, or an unknown function/event
    #[error("Descriptor error: {0}")]
    Descriptor(String),

    /// A state-mutating call was attempted without a signer
    #[error("No signer configured for state-mutating call to {0}")]
    MissingSigner(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error related to serialization or deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Any other error with its source
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Error::Decode(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Error::Encode(msg.into())
    }

    /// Create a new topic mismatch error
    pub fn topic_mismatch<S: Into<String>>(expected: S, found: Option<S>) -> Self {
        Error::TopicMismatch {
            expected: expected.into(),
            found: found.map(Into::into),
        }
    }

    /// Create a new reverted error
    pub fn reverted<S: Into<String>>(reason: S) -> Self {
        Error::Reverted(reason.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Error::Transport(msg.into())
    }

    /// Create a new descriptor error
    pub fn descriptor<S: Into<String>>(msg: S) -> Self {
        Error::Descriptor(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Error::Serialization(msg.into())
    }

    /// Whether resubmitting the same operation could succeed without a code change.
    ///
    /// Only transport failures qualify; the binding layer itself never retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Serialization(format!("TOML serialization error: {}", err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
