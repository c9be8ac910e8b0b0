//! Configuration summaries used for diagnostics and cache validation.

use crate::stream_config::model::{ConfigSource, ConfigSummary, ConfigSummaryEntry};
use sha2::{Digest, Sha256};

/// Build a summary object from the loaded configuration sources.
pub fn build_summary(sources: &[ConfigSource]) -> ConfigSummary {
    let entries = sources
        .iter()
        .map(|source| ConfigSummaryEntry {
            path: source.path.clone(),
            sha256: source.sha256.clone(),
            name: source.meta.as_ref().map(|meta| meta.name.clone()),
            version: source.meta.as_ref().map(|meta| meta.version),
        })
        .collect();
    ConfigSummary {
        entries,
        fingerprint: fingerprint(sources),
    }
}

/// Combined digest of every source checksum, in load order.
pub fn fingerprint(sources: &[ConfigSource]) -> String {
    let mut hasher = Sha256::new();
    for source in sources {
        hasher.update(source.sha256.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
