//! Wiring of policy, configuration loading and registry construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::Result;
use crate::logging::{
    apply_policy, emit_error_trailer, log_stream_config_error, set_config_fingerprint,
};
use crate::policy::StreamConfigPolicy;
use crate::stream_config::factory::{StreamConfigContributor, StreamConfigsFactory};
use crate::stream_config::model::LoadedStreamConfigs;
use crate::stream_config::registry::StreamConfigRegistry;

const STREAM_CONFIG_DIR: &str = ".event-streams";
const STREAM_CONFIG_FILE: &str = "streams.toml";
const BUILTIN_CONFIG_LABEL: &str = "builtin-default";
const BUILTIN_STREAM_CONFIG: &str =
    include_str!("../resources/stream_configs/builtin_default.toml");

/// Load the configuration chain: builtin defaults, then a discovered project
/// file (searched upwards from `search_from`), then `explicit` paths.
pub fn load_stream_configs(
    explicit: &[PathBuf],
    search_from: Option<&Path>,
) -> Result<LoadedStreamConfigs> {
    let mut chain: Vec<PathBuf> = Vec::new();

    if let Some(start) = search_from {
        if let Some(discovered) = discover_project_config(start) {
            log::debug!("using project stream config '{}'", discovered.display());
            chain.push(discovered);
        }
    }
    chain.extend(explicit.iter().cloned());

    LoadedStreamConfigs::from_inline_and_paths(
        &[(BUILTIN_CONFIG_LABEL, BUILTIN_STREAM_CONFIG)],
        &chain,
    )
}

/// Build a registry from the sources named by `policy` plus `contributors`.
///
/// `policy` is pushed to the crate logger if the embedder installed one.
/// Failures are logged, mirrored as a JSON trailer when enabled, and returned.
pub fn load_registry(
    policy: &StreamConfigPolicy,
    search_from: Option<&Path>,
    contributors: &[Arc<dyn StreamConfigContributor>],
) -> Result<StreamConfigRegistry> {
    apply_policy(policy);
    build_registry(policy, search_from, contributors).map_err(|err| {
        log_stream_config_error("failed to load stream configs", &err);
        emit_error_trailer(&err);
        err
    })
}

fn build_registry(
    policy: &StreamConfigPolicy,
    search_from: Option<&Path>,
    contributors: &[Arc<dyn StreamConfigContributor>],
) -> Result<StreamConfigRegistry> {
    let loaded = load_stream_configs(&policy.config_paths, search_from)?;
    let summary = loaded.summary();
    set_config_fingerprint(Some(summary.fingerprint.clone()));
    log::info!(
        "loaded stream config from {} source(s), fingerprint {}",
        summary.entries.len(),
        summary.fingerprint
    );

    let factory = contributors.iter().fold(
        StreamConfigsFactory::new(Arc::new(loaded)),
        |factory, contributor| factory.with_contributor(Arc::clone(contributor)),
    );
    factory.build()
}

fn discover_project_config(start: &Path) -> Option<PathBuf> {
    let mut current: Option<&Path> = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(STREAM_CONFIG_DIR).join(STREAM_CONFIG_FILE);
        if matches!(std::fs::metadata(&candidate), Ok(metadata) if metadata.is_file()) {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}
