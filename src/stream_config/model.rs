//! Stream configuration data models (keys, raw entry collections, sources).

use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

use crate::stream_config::summary;

/// Nested, insertion-ordered settings mapping for a single stream.
pub type Settings = Map<String, Value>;

/// Settings key holding the stream name or pattern.
pub const STREAM_SETTING: &str = "stream";
/// Settings key holding an explicit list of topics.
pub const TOPICS_SETTING: &str = "topics";
/// Settings key holding the prefixes used to derive topics.
pub const TOPIC_PREFIXES_SETTING: &str = "topic_prefixes";

/// Key under which a raw stream config entry was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamKey {
    /// Stream name or `/regex/` pattern.
    Name(String),
    /// Position in a historic list-shaped configuration.
    Ordinal(usize),
}

impl StreamKey {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            StreamKey::Name(name) => Some(name),
            StreamKey::Ordinal(_) => None,
        }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKey::Name(name) => f.write_str(name),
            StreamKey::Ordinal(idx) => write!(f, "#{idx}"),
        }
    }
}

impl From<&str> for StreamKey {
    fn from(value: &str) -> Self {
        StreamKey::Name(value.to_string())
    }
}

impl From<String> for StreamKey {
    fn from(value: String) -> Self {
        StreamKey::Name(value)
    }
}

impl From<usize> for StreamKey {
    fn from(value: usize) -> Self {
        StreamKey::Ordinal(value)
    }
}

/// Ordered collection of raw stream config entries, prior to validation.
///
/// Named entries are unique: inserting an existing name replaces the value in
/// place. Ordinal entries are renumbered on append so both sides of a merge
/// survive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamConfigEntries {
    entries: Vec<(StreamKey, Value)>,
}

impl StreamConfigEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry under a stream name or pattern.
    pub fn insert(&mut self, name: impl Into<String>, settings: Value) {
        let name = name.into();
        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key.as_name() == Some(name.as_str()))
        {
            Some((_, existing)) => *existing = settings,
            None => self.entries.push((StreamKey::Name(name), settings)),
        }
    }

    /// Append an ordinal entry; its settings are expected to carry `stream`.
    pub fn push(&mut self, settings: Value) {
        let ordinal = self.next_ordinal();
        self.entries.push((StreamKey::Ordinal(ordinal), settings));
    }

    /// Merge `other` on top of `self`: named entries in `other` win, ordinal
    /// entries from both sides are kept.
    pub fn merge_from(&mut self, other: StreamConfigEntries) {
        for (key, settings) in other.entries {
            match key {
                StreamKey::Name(name) => self.insert(name, settings),
                StreamKey::Ordinal(_) => self.push(settings),
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StreamKey, &Value)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key.as_name() == Some(name))
            .map(|(_, value)| value)
    }

    fn next_ordinal(&self) -> usize {
        self.entries
            .iter()
            .filter_map(|(key, _)| match key {
                StreamKey::Ordinal(idx) => Some(idx + 1),
                StreamKey::Name(_) => None,
            })
            .max()
            .unwrap_or(0)
    }
}

impl FromIterator<(StreamKey, Value)> for StreamConfigEntries {
    fn from_iter<I: IntoIterator<Item = (StreamKey, Value)>>(iter: I) -> Self {
        let mut entries = StreamConfigEntries::new();
        for (key, settings) in iter {
            match key {
                StreamKey::Name(name) => entries.insert(name, settings),
                StreamKey::Ordinal(_) => entries.push(settings),
            }
        }
        entries
    }
}

impl IntoIterator for StreamConfigEntries {
    type Item = (StreamKey, Value);
    type IntoIter = std::vec::IntoIter<(StreamKey, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Optional metadata block of a configuration source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigMeta {
    pub name: String,
    pub version: u32,
    pub description: Option<String>,
}

/// Source information for each configuration file participating in a load.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub sha256: String,
    pub meta: Option<ConfigMeta>,
}

/// Summary of the sources behind a loaded configuration.
#[derive(Debug, Clone)]
pub struct ConfigSummary {
    pub entries: Vec<ConfigSummaryEntry>,
    pub fingerprint: String,
}

/// Single entry in the configuration summary.
#[derive(Debug, Clone)]
pub struct ConfigSummaryEntry {
    pub path: PathBuf,
    pub sha256: String,
    pub name: Option<String>,
    pub version: Option<u32>,
}

/// Stream configuration loaded from one or more sources, ready for the registry.
#[derive(Debug, Clone)]
pub struct LoadedStreamConfigs {
    pub(crate) streams: StreamConfigEntries,
    pub(crate) default_settings: Settings,
    pub(crate) sources: Vec<ConfigSource>,
}

impl LoadedStreamConfigs {
    /// Raw stream entries in declaration order.
    pub fn streams(&self) -> &StreamConfigEntries {
        &self.streams
    }

    /// Default settings merged beneath every entry.
    pub fn default_settings(&self) -> &Settings {
        &self.default_settings
    }

    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    pub fn summary(&self) -> ConfigSummary {
        summary::build_summary(&self.sources)
    }
}
