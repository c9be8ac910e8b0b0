//! Stream config registry resolving requested stream names to entries.
//!
//! The registry is built once from raw entries plus default settings and is
//! immutable afterwards, so lookups can be shared freely across threads.

use serde_json::{Map, Value};
use std::collections::HashMap;
use stream_config_errors::{usage, ErrorCode, StreamConfigResult};

use crate::logging;
use crate::stream_config::entry::{value_kind, StreamConfig};
use crate::stream_config::model::{Settings, StreamConfigEntries, StreamKey, STREAM_SETTING};

/// Query result: resolved stream name mapped to that stream's settings.
pub type ResolvedStreams = Map<String, Value>;

/// Ordered collection of validated stream configs keyed by name or pattern.
#[derive(Debug, Clone, Default)]
pub struct StreamConfigRegistry {
    entries: Vec<StreamConfig>,
    index: HashMap<String, usize>,
}

impl StreamConfigRegistry {
    /// Validate every entry and build the registry.
    ///
    /// Ordinal entries are keyed by their embedded `stream` setting. A later
    /// entry with the same effective key replaces the earlier one in place.
    pub fn new(
        stream_configs: &StreamConfigEntries,
        default_settings: &Settings,
    ) -> StreamConfigResult<Self> {
        let mut registry = StreamConfigRegistry::default();
        for (key, raw_settings) in stream_configs.iter() {
            let stream = effective_stream_key(key, raw_settings)?;
            let config = StreamConfig::from_value(&stream, raw_settings, default_settings)
                .map_err(|err| err.with_context("entry", key.to_string()))?;
            registry.insert(stream, config);
        }
        log::debug!(
            "built stream config registry with {} entries",
            registry.entries.len()
        );
        Ok(registry)
    }

    fn insert(&mut self, stream: String, config: StreamConfig) {
        match self.index.get(&stream) {
            Some(&position) => self.entries[position] = config,
            None => {
                self.index.insert(stream, self.entries.len());
                self.entries.push(config);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &StreamConfig> {
        self.entries.iter()
    }

    /// Config for `stream`: the exact entry if one exists, otherwise the
    /// first entry whose pattern matches.
    pub fn find_by_stream(&self, stream: &str) -> Option<&StreamConfig> {
        if let Some(&position) = self.index.get(stream) {
            return Some(&self.entries[position]);
        }
        self.entries.iter().find(|config| config.matches(stream))
    }

    /// Look up settings for `target_streams` (all entries when `None`),
    /// keeping only entries that satisfy `constraints` when given.
    ///
    /// Unmatched stream names are logged and left out of the result. Fails
    /// only when `constraints` is not a mapping.
    pub fn get<S: AsRef<str>>(
        &self,
        target_streams: Option<&[S]>,
        constraints: Option<&Value>,
    ) -> StreamConfigResult<ResolvedStreams> {
        let constraints = normalize_constraints(constraints)?;

        let mut result = ResolvedStreams::new();
        for (stream, config) in self.select_by_streams(target_streams) {
            let keep = match constraints {
                Some(constraints) => config.matches_constraints(constraints),
                None => true,
            };
            if keep {
                let settings = config.to_settings(Some(&stream));
                result.insert(stream, Value::Object(settings));
            } else {
                logging::record_constraint_rejected(config.stream());
            }
        }

        logging::record_query(
            target_streams.map(|targets| targets.len()),
            result.len(),
        );
        Ok(result)
    }

    fn select_by_streams<S: AsRef<str>>(
        &self,
        target_streams: Option<&[S]>,
    ) -> Vec<(String, &StreamConfig)> {
        let Some(targets) = target_streams else {
            log::debug!("selecting all stream configs");
            return self
                .entries
                .iter()
                .map(|config| (config.stream().to_string(), config))
                .collect();
        };

        log::debug!(
            "selecting stream configs for target streams: {}",
            targets
                .iter()
                .map(|target| target.as_ref())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut selected: Vec<(String, &StreamConfig)> = Vec::with_capacity(targets.len());
        for target in targets {
            let stream = target.as_ref();
            if selected.iter().any(|(name, _)| name == stream) {
                continue;
            }
            match self.find_by_stream(stream) {
                Some(config) => selected.push((stream.to_string(), config)),
                None => {
                    log::warn!(
                        stream = stream;
                        "stream '{}' does not match any stream in stream config",
                        stream
                    );
                    logging::record_lookup_miss(stream);
                }
            }
        }
        selected
    }
}

fn effective_stream_key(key: &StreamKey, raw_settings: &Value) -> StreamConfigResult<String> {
    match key {
        StreamKey::Name(name) => Ok(name.clone()),
        StreamKey::Ordinal(ordinal) => match raw_settings.get(STREAM_SETTING) {
            Some(Value::String(stream)) => Ok(stream.clone()),
            Some(other) => Err(usage!(
                ErrorCode::InvalidStreamKey,
                "'{}' must be a string in stream config entry #{}, got {}",
                STREAM_SETTING,
                ordinal,
                value_kind(other)
            )),
            None => Err(usage!(
                ErrorCode::InvalidStreamKey,
                "'{}' not set in stream config entry #{}",
                STREAM_SETTING,
                ordinal
            )),
        },
    }
}

/// Empty or absent constraints disable filtering; anything but a mapping is rejected.
fn normalize_constraints(constraints: Option<&Value>) -> StreamConfigResult<Option<&Settings>> {
    match constraints {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(usage!(
            ErrorCode::MalformedConstraints,
            "settings constraints must be a mapping, got {}",
            value_kind(other)
        )),
    }
}
