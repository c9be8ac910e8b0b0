//! Stream configuration facade: composes inline and file-based sources into
//! [`LoadedStreamConfigs`](crate::stream_config::model::LoadedStreamConfigs).

pub use crate::stream_config::model::{
    ConfigMeta, ConfigSource, ConfigSummary, ConfigSummaryEntry, LoadedStreamConfigs,
};

use crate::stream_config::loader::{ConfigAggregator, SourceFormat};
use std::path::PathBuf;
use stream_config_errors::{usage, ErrorCode, StreamConfigResult};

impl LoadedStreamConfigs {
    /// Load and compose stream configuration from the provided paths.
    pub fn from_paths(paths: &[PathBuf]) -> StreamConfigResult<Self> {
        Self::from_inline_and_paths(&[], paths)
    }

    /// Load and compose inline TOML sources combined with paths.
    ///
    /// Inline entries are ingested first in the order provided, followed by files.
    pub fn from_inline_and_paths(
        inline: &[(&str, &str)],
        paths: &[PathBuf],
    ) -> StreamConfigResult<Self> {
        if inline.is_empty() && paths.is_empty() {
            return Err(usage!(
                ErrorCode::InvalidPolicyValue,
                "no stream config sources supplied"
            ));
        }

        let mut aggregator = ConfigAggregator::default();
        for (label, contents) in inline {
            aggregator.ingest_inline(label, contents, SourceFormat::Toml)?;
        }
        for path in paths {
            aggregator.ingest_file(path)?;
        }

        aggregator.finish()
    }
}
