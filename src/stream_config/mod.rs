//! Stream configuration: entry model, pattern keys, loading, and the lookup registry.

pub mod config;
pub mod constraints;
pub mod entry;
pub mod factory;
pub mod loader;
pub mod matching;
pub mod model;
pub mod pattern;
pub mod registry;
pub mod settings;
pub mod summary;

pub use constraints::parse_constraint_pairs;
pub use entry::StreamConfig;
pub use factory::{
    InMemoryStreamConfigs, SharedStreamConfigs, StreamConfigContributor, StreamConfigProvider,
    StreamConfigsFactory,
};
pub use model::{LoadedStreamConfigs, Settings, StreamConfigEntries, StreamKey};
pub use pattern::StreamPattern;
pub use registry::{ResolvedStreams, StreamConfigRegistry};
