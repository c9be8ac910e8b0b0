//! Registry construction from a primary provider plus contributed entries.

use once_cell::sync::OnceCell;
use std::sync::Arc;
use stream_config_errors::StreamConfigResult;

use crate::stream_config::model::{LoadedStreamConfigs, Settings, StreamConfigEntries};
use crate::stream_config::registry::StreamConfigRegistry;

/// Supplies the primary stream entries and default settings.
pub trait StreamConfigProvider: Send + Sync {
    fn stream_configs(&self) -> StreamConfigResult<StreamConfigEntries>;

    fn default_settings(&self) -> StreamConfigResult<Settings> {
        Ok(Settings::new())
    }
}

impl StreamConfigProvider for LoadedStreamConfigs {
    fn stream_configs(&self) -> StreamConfigResult<StreamConfigEntries> {
        Ok(self.streams().clone())
    }

    fn default_settings(&self) -> StreamConfigResult<Settings> {
        Ok(LoadedStreamConfigs::default_settings(self).clone())
    }
}

/// Provider backed by values held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStreamConfigs {
    streams: StreamConfigEntries,
    default_settings: Settings,
}

impl InMemoryStreamConfigs {
    pub fn new(streams: StreamConfigEntries) -> Self {
        InMemoryStreamConfigs {
            streams,
            default_settings: Settings::new(),
        }
    }

    pub fn with_defaults(mut self, default_settings: Settings) -> Self {
        self.default_settings = default_settings;
        self
    }
}

impl StreamConfigProvider for InMemoryStreamConfigs {
    fn stream_configs(&self) -> StreamConfigResult<StreamConfigEntries> {
        Ok(self.streams.clone())
    }

    fn default_settings(&self) -> StreamConfigResult<Settings> {
        Ok(self.default_settings.clone())
    }
}

/// Adds stream entries on top of those supplied by the provider.
///
/// Contributors run in registration order against a shared, initially empty
/// collection. The provider's entries are applied afterwards and win on name
/// collisions.
pub trait StreamConfigContributor: Send + Sync {
    fn contribute(&self, entries: &mut StreamConfigEntries) -> StreamConfigResult<()>;
}

impl<F> StreamConfigContributor for F
where
    F: Fn(&mut StreamConfigEntries) -> StreamConfigResult<()> + Send + Sync,
{
    fn contribute(&self, entries: &mut StreamConfigEntries) -> StreamConfigResult<()> {
        self(entries)
    }
}

/// Builds [`StreamConfigRegistry`] instances.
pub struct StreamConfigsFactory {
    provider: Arc<dyn StreamConfigProvider>,
    contributors: Vec<Arc<dyn StreamConfigContributor>>,
}

impl StreamConfigsFactory {
    pub fn new(provider: Arc<dyn StreamConfigProvider>) -> Self {
        StreamConfigsFactory {
            provider,
            contributors: Vec::new(),
        }
    }

    pub fn with_contributor(mut self, contributor: Arc<dyn StreamConfigContributor>) -> Self {
        self.contributors.push(contributor);
        self
    }

    pub fn build(&self) -> StreamConfigResult<StreamConfigRegistry> {
        let mut entries = StreamConfigEntries::new();
        for contributor in &self.contributors {
            contributor.contribute(&mut entries)?;
        }
        if !entries.is_empty() {
            log::debug!("{} stream config entries contributed", entries.len());
        }
        entries.merge_from(self.provider.stream_configs()?);

        let default_settings = self.provider.default_settings()?;
        StreamConfigRegistry::new(&entries, &default_settings)
    }
}

/// Lazily built registry shared across callers.
///
/// The first successful build is kept for the lifetime of this value; failed
/// builds are retried on the next call.
pub struct SharedStreamConfigs {
    factory: StreamConfigsFactory,
    registry: OnceCell<Arc<StreamConfigRegistry>>,
}

impl SharedStreamConfigs {
    pub fn new(factory: StreamConfigsFactory) -> Self {
        SharedStreamConfigs {
            factory,
            registry: OnceCell::new(),
        }
    }

    pub fn get(&self) -> StreamConfigResult<Arc<StreamConfigRegistry>> {
        self.registry
            .get_or_try_init(|| self.factory.build().map(Arc::new))
            .map(Arc::clone)
    }

    /// True once a registry has been built.
    pub fn is_initialized(&self) -> bool {
        self.registry.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stream_config_errors::{usage, ErrorCode};

    fn provider() -> Arc<dyn StreamConfigProvider> {
        let mut streams = StreamConfigEntries::new();
        streams.insert("shared", json!({"owner": "primary"}));
        streams.push(json!({"stream": "legacy.primary"}));
        Arc::new(InMemoryStreamConfigs::new(streams))
    }

    #[test]
    fn primary_entries_override_contributions() {
        let factory = StreamConfigsFactory::new(provider()).with_contributor(Arc::new(
            |entries: &mut StreamConfigEntries| -> StreamConfigResult<()> {
                entries.insert("shared", json!({"owner": "contributor"}));
                entries.insert("contributed", json!({"owner": "contributor"}));
                entries.push(json!({"stream": "legacy.contributed"}));
                Ok(())
            },
        ));

        let registry = factory.build().expect("build");
        let result = registry.get::<&str>(None, None).expect("query");
        assert_eq!(result["shared"]["owner"], json!("primary"));
        assert_eq!(result["contributed"]["owner"], json!("contributor"));
        assert!(result.contains_key("legacy.primary"));
        assert!(result.contains_key("legacy.contributed"));
    }

    #[test]
    fn contributor_errors_abort_build() {
        let factory = StreamConfigsFactory::new(provider()).with_contributor(Arc::new(
            |_: &mut StreamConfigEntries| -> StreamConfigResult<()> {
                Err(usage!(ErrorCode::InvalidStreamKey, "contributor failed"))
            },
        ));
        assert!(factory.build().is_err());
    }

    #[test]
    fn shared_registry_builds_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let factory = StreamConfigsFactory::new(provider()).with_contributor(Arc::new(
            move |_: &mut StreamConfigEntries| -> StreamConfigResult<()> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        ));
        let shared = SharedStreamConfigs::new(factory);
        assert!(!shared.is_initialized());

        let first = shared.get().expect("first");
        let second = shared.get().expect("second");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn provider_defaults_apply() {
        let mut streams = StreamConfigEntries::new();
        streams.insert("nonya", json!({}));
        let defaults = match json!({"destination_event_service": "eventgate-main"}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let provider = InMemoryStreamConfigs::new(streams).with_defaults(defaults);
        let registry = StreamConfigsFactory::new(Arc::new(provider))
            .build()
            .expect("build");
        let result = registry.get(Some(&["nonya"][..]), None).expect("query");
        assert_eq!(
            result["nonya"]["destination_event_service"],
            json!("eventgate-main")
        );
    }
}
