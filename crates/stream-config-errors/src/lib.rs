//! Shared error facade for the event stream configuration engine.
//!
//! Every fallible operation in the engine returns a [`StreamConfigError`] that
//! carries a coarse [`ErrorKind`], a stable [`ErrorCode`], a human-readable
//! message and optional key/value context. Use the [`usage!`] and [`enverr!`]
//! macros to build errors with `format!` syntax.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

/// Convenient alias for results produced by the engine.
pub type StreamConfigResult<T> = Result<T, StreamConfigError>;

/// Broad classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// Invalid configuration or caller input.
    Usage,
    /// Filesystem or process environment failure.
    Environment,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Usage => "Usage",
            ErrorKind::Environment => "Environment",
        }
    }
}

/// Stable error codes surfaced in logs and error trailers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    Unknown,
    InvalidStreamKey,
    InvalidStreamPattern,
    InvalidSettingType,
    MalformedConstraints,
    ConfigParse,
    InvalidPolicyValue,
    Io,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 8] = [
        ErrorCode::Unknown,
        ErrorCode::InvalidStreamKey,
        ErrorCode::InvalidStreamPattern,
        ErrorCode::InvalidSettingType,
        ErrorCode::MalformedConstraints,
        ErrorCode::ConfigParse,
        ErrorCode::InvalidPolicyValue,
        ErrorCode::Io,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Unknown => "ERR_UNKNOWN",
            ErrorCode::InvalidStreamKey => "ERR_INVALID_STREAM_KEY",
            ErrorCode::InvalidStreamPattern => "ERR_INVALID_STREAM_PATTERN",
            ErrorCode::InvalidSettingType => "ERR_INVALID_SETTING_TYPE",
            ErrorCode::MalformedConstraints => "ERR_MALFORMED_CONSTRAINTS",
            ErrorCode::ConfigParse => "ERR_CONFIG_PARSE",
            ErrorCode::InvalidPolicyValue => "ERR_INVALID_POLICY_VALUE",
            ErrorCode::Io => "ERR_IO",
        }
    }

    /// Parse a stable code string back into an [`ErrorCode`].
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_str() == value)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error value shared by all engine layers.
#[derive(Debug)]
pub struct StreamConfigError {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    message: Cow<'static, str>,
    pub context: Vec<(&'static str, String)>,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl StreamConfigError {
    pub fn new(kind: ErrorKind, code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            context: Vec::new(),
            source: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Attach a key/value pair describing where the failure happened.
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Attach the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn source_ref(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn is_usage(&self) -> bool {
        self.kind == ErrorKind::Usage
    }
}

impl fmt::Display for StreamConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.context.is_empty() {
            f.write_str(" (")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl Error for StreamConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

/// Build a usage error (bad configuration or caller input).
#[macro_export]
macro_rules! usage {
    ($code:expr, $($arg:tt)+) => {
        $crate::StreamConfigError::new($crate::ErrorKind::Usage, $code, format!($($arg)+))
    };
}

/// Build an environment error (filesystem, process environment).
#[macro_export]
macro_rules! enverr {
    ($code:expr, $($arg:tt)+) => {
        $crate::StreamConfigError::new($crate::ErrorKind::Environment, $code, format!($($arg)+))
    };
}

/// Return early with a usage error when `cond` does not hold.
#[macro_export]
macro_rules! ensure_usage {
    ($cond:expr, $code:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::usage!($code, $($arg)+));
        }
    };
}
