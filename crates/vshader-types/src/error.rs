use thiserror::Error;

/// Coarse error category, stable across the whole pipeline.
///
/// The CLI driver maps these to process exit codes; everything below the
/// driver just propagates them unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Io,
    InvalidArgument,
    Parse,
    Compile,
    Reflect,
    Serialize,
    Deserialize,
}

/// An error from any fallible pipeline operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("compile error: {0}")]
    Compile(String),
    #[error("reflect error: {0}")]
    Reflect(String),
    #[error("serialize error: {0}")]
    Serialize(String),
    #[error("deserialize error: {0}")]
    Deserialize(String),
}

impl Error {
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn compile(message: impl Into<String>) -> Self {
        Self::Compile(message.into())
    }

    pub fn reflect(message: impl Into<String>) -> Self {
        Self::Reflect(message.into())
    }

    pub fn serialize(message: impl Into<String>) -> Self {
        Self::Serialize(message.into())
    }

    pub fn deserialize(message: impl Into<String>) -> Self {
        Self::Deserialize(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::Io,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Parse(_) => ErrorCode::Parse,
            Self::Compile(_) => ErrorCode::Compile,
            Self::Reflect(_) => ErrorCode::Reflect,
            Self::Serialize(_) => ErrorCode::Serialize,
            Self::Deserialize(_) => ErrorCode::Deserialize,
        }
    }

    /// The human-readable message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Io(m)
            | Self::InvalidArgument(m)
            | Self::Parse(m)
            | Self::Compile(m)
            | Self::Reflect(m)
            | Self::Serialize(m)
            | Self::Deserialize(m) => m,
        }
    }

    /// Prefix the message with additional context (e.g. a source path).
    pub fn with_context(self, context: impl std::fmt::Display) -> Self {
        let message = format!("{context}: {}", self.message());
        match self {
            Self::Io(_) => Self::Io(message),
            Self::InvalidArgument(_) => Self::InvalidArgument(message),
            Self::Parse(_) => Self::Parse(message),
            Self::Compile(_) => Self::Compile(message),
            Self::Reflect(_) => Self::Reflect(message),
            Self::Serialize(_) => Self::Serialize(message),
            Self::Deserialize(_) => Self::Deserialize(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
