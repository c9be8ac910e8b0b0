//! Error facade shared across the crate.

pub use stream_config_errors::{
    enverr, ensure_usage, usage, ErrorCode, ErrorKind, StreamConfigError, StreamConfigResult,
};

/// Convenient alias for results used across the crate's modules.
pub type Result<T> = StreamConfigResult<T>;
