//! Stream configuration loader (TOML/JSON ingestion, aggregation).

use crate::stream_config::model::{
    ConfigMeta, ConfigSource, LoadedStreamConfigs, Settings, StreamConfigEntries,
};
use crate::stream_config::settings::merge_settings;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use stream_config_errors::{enverr, ensure_usage, usage, ErrorCode, StreamConfigResult};

/// Serialization format of a configuration source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Toml,
    Json,
}

impl SourceFormat {
    /// `.json` files are read as JSON, everything else as TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SourceFormat::Json,
            _ => SourceFormat::Toml,
        }
    }
}

/// Helper aggregating inline and file sources into a loaded configuration.
#[derive(Default)]
pub struct ConfigAggregator {
    streams: StreamConfigEntries,
    default_settings: Settings,
    sources: Vec<ConfigSource>,
}

impl ConfigAggregator {
    /// Ingest a configuration file from the filesystem.
    pub fn ingest_file(&mut self, path: &Path) -> StreamConfigResult<()> {
        let contents = fs::read_to_string(path).map_err(|err| {
            enverr!(
                ErrorCode::Io,
                "failed to read stream config '{}': {}",
                path.display(),
                err
            )
            .with_source(err)
        })?;

        self.ingest_source(path, &contents, SourceFormat::from_path(path))
    }

    /// Ingest an inline source (used for builtin defaults and tests).
    pub fn ingest_inline(
        &mut self,
        label: &str,
        contents: &str,
        format: SourceFormat,
    ) -> StreamConfigResult<()> {
        let pseudo_path = PathBuf::from(format!("<inline:{label}>"));
        self.ingest_source(&pseudo_path, contents, format)
    }

    /// Finalise the aggregation.
    pub fn finish(self) -> StreamConfigResult<LoadedStreamConfigs> {
        if self.sources.is_empty() {
            return Err(usage!(
                ErrorCode::InvalidPolicyValue,
                "no stream config sources were ingested"
            ));
        }

        Ok(LoadedStreamConfigs {
            streams: self.streams,
            default_settings: self.default_settings,
            sources: self.sources,
        })
    }

    fn ingest_source(
        &mut self,
        path: &Path,
        contents: &str,
        format: SourceFormat,
    ) -> StreamConfigResult<()> {
        let checksum = calculate_sha256(contents);
        let raw = parse_raw(contents, format, path)?;

        let meta = raw
            .meta
            .as_ref()
            .map(|meta| parse_meta(meta, path))
            .transpose()?;
        self.sources.push(ConfigSource {
            path: path.to_path_buf(),
            sha256: checksum,
            meta,
        });

        if let Some(defaults) = raw.defaults {
            self.default_settings = merge_settings(&self.default_settings, &defaults);
        }

        let streams = match raw.streams {
            Some(streams) => streams.into_entries(),
            None => StreamConfigEntries::new(),
        };
        log::debug!(
            "ingested {} stream config entries from '{}'",
            streams.len(),
            path.display()
        );
        self.streams.merge_from(streams);

        Ok(())
    }
}

fn parse_raw(
    contents: &str,
    format: SourceFormat,
    path: &Path,
) -> StreamConfigResult<RawStreamConfigFile> {
    match format {
        SourceFormat::Toml => toml::from_str(contents).map_err(|err| {
            usage!(
                ErrorCode::ConfigParse,
                "failed to parse stream config '{}': {}",
                path.display(),
                err
            )
        }),
        SourceFormat::Json => serde_json::from_str(contents).map_err(|err| {
            usage!(
                ErrorCode::ConfigParse,
                "failed to parse stream config '{}': {}",
                path.display(),
                err
            )
        }),
    }
}

pub(crate) fn calculate_sha256(contents: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)
}

pub(crate) fn parse_meta(raw: &RawMeta, path: &Path) -> StreamConfigResult<ConfigMeta> {
    ensure_usage!(
        !raw.name.trim().is_empty(),
        ErrorCode::ConfigParse,
        "'meta.name' must not be empty in '{}'",
        path.display()
    );
    ensure_usage!(
        raw.version >= 1,
        ErrorCode::ConfigParse,
        "'meta.version' must be >= 1 in '{}'",
        path.display()
    );

    Ok(ConfigMeta {
        name: raw.name.clone(),
        version: raw.version,
        description: raw.description.clone(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStreamConfigFile {
    #[serde(default)]
    pub meta: Option<RawMeta>,
    #[serde(default)]
    pub defaults: Option<Settings>,
    #[serde(default)]
    pub streams: Option<RawStreams>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawMeta {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub description: Option<String>,
}

/// `streams` as a table keyed by stream name, or the historic list shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawStreams {
    Named(Settings),
    Ordinal(Vec<Value>),
}

impl RawStreams {
    fn into_entries(self) -> StreamConfigEntries {
        let mut entries = StreamConfigEntries::new();
        match self {
            RawStreams::Named(named) => {
                for (name, settings) in named {
                    entries.insert(name, settings);
                }
            }
            RawStreams::Ordinal(list) => {
                for settings in list {
                    entries.push(settings);
                }
            }
        }
        entries
    }
}
