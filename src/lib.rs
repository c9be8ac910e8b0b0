//! Event stream configuration engine.
//!
//! Stream configs are keyed by exact stream name or by a delimited regex
//! (`/^mediawiki\.job\..+/`). Each entry is merged over shared default
//! settings, and lookups derive per-stream topics and can filter entries by
//! partial settings constraints. See [`StreamConfigRegistry::get`].

pub mod bootstrap;
pub mod errors;
pub mod logging;
pub mod policy;
pub mod stream_config;

pub use crate::bootstrap::{load_registry, load_stream_configs};
pub use crate::errors::{ErrorCode, ErrorKind, Result, StreamConfigError};
pub use crate::policy::{
    configure_policy, configure_policy_from_env, policy_snapshot, PolicyUpdate,
    StreamConfigPolicy,
};
pub use crate::stream_config::{
    parse_constraint_pairs, InMemoryStreamConfigs, LoadedStreamConfigs, ResolvedStreams,
    Settings, SharedStreamConfigs, StreamConfig, StreamConfigContributor, StreamConfigEntries,
    StreamConfigProvider, StreamConfigRegistry, StreamConfigsFactory, StreamKey, StreamPattern,
};
