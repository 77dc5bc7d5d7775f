use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use k8_apiserver_types::GroupResource;

use crate::in_memory::DEFAULT_EVENT_WINDOW;
use crate::in_memory::DEFAULT_WATCH_CAPACITY;
use crate::InMemoryStorage;
use crate::StorageBackend;
use crate::StorageError;

pub const DEFAULT_PREFIX: &str = "/registry";

#[derive(Deserialize, Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    #[default]
    Memory,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub prefix: String,
    pub paging: bool,
    pub backend: BackendKind,
    /// number of past events kept for resuming watches
    pub event_window: usize,
    /// live events buffered per watcher before it is closed
    pub watch_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_owned(),
            paging: true,
            backend: BackendKind::Memory,
            event_window: DEFAULT_EVENT_WINDOW,
            watch_capacity: DEFAULT_WATCH_CAPACITY,
        }
    }
}

/// backend handle and key prefix for one resource
#[derive(Clone)]
pub struct RestOptions {
    pub storage: Arc<dyn StorageBackend>,
    pub resource_prefix: String,
    pub paging: bool,
}

impl fmt::Debug for RestOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RestOptions")
            .field("resource_prefix", &self.resource_prefix)
            .field("paging", &self.paging)
            .finish()
    }
}

pub trait RestOptionsGetter: Send + Sync {
    fn get_rest_options(&self, resource: &GroupResource) -> Result<RestOptions, StorageError>;
}

/// hands out rest options backed by a single shared backend
#[derive(Clone)]
pub struct StorageFactory {
    config: StorageConfig,
    backend: Arc<dyn StorageBackend>,
}

impl fmt::Debug for StorageFactory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "StorageFactory({:?})", self.config)
    }
}

impl StorageFactory {
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        let backend: Arc<dyn StorageBackend> = match config.backend {
            BackendKind::Memory => Arc::new(
                InMemoryStorage::new(config.event_window)
                    .with_watch_capacity(config.watch_capacity),
            ),
        };
        debug!(prefix = %config.prefix, backend = ?config.backend, "storage factory created");
        Ok(Self { config, backend })
    }

    pub fn with_backend(config: StorageConfig, backend: Arc<dyn StorageBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        self.backend.clone()
    }

    /// `<prefix>/<group>/<resource>`, the group segment is left out for the core group
    pub fn resource_prefix(&self, resource: &GroupResource) -> String {
        let prefix = self.config.prefix.trim_end_matches('/');
        if resource.group.is_empty() {
            format!("{}/{}", prefix, resource.resource)
        } else {
            format!("{}/{}/{}", prefix, resource.group, resource.resource)
        }
    }
}

impl RestOptionsGetter for StorageFactory {
    fn get_rest_options(&self, resource: &GroupResource) -> Result<RestOptions, StorageError> {
        if resource.resource.is_empty() {
            return Err(StorageError::InvalidOptions(format!(
                "no resource name for group {}",
                resource.group
            )));
        }
        Ok(RestOptions {
            storage: self.backend.clone(),
            resource_prefix: self.resource_prefix(resource),
            paging: self.config.paging,
        })
    }
}

#[cfg(test)]
mod test {

    use k8_apiserver_types::GroupResource;

    use super::RestOptionsGetter;
    use super::StorageConfig;
    use super::StorageFactory;

    #[test]
    fn test_rest_options_prefix() {
        let factory = StorageFactory::new(StorageConfig {
            prefix: "/registry/".to_owned(),
            ..Default::default()
        })
        .expect("factory");

        let options = factory
            .get_rest_options(&GroupResource::new("wardle.example.com", "flunders"))
            .expect("options");
        assert_eq!(
            options.resource_prefix,
            "/registry/wardle.example.com/flunders"
        );
        assert!(options.paging);

        let core = factory
            .get_rest_options(&GroupResource::new("", "pods"))
            .expect("options");
        assert_eq!(core.resource_prefix, "/registry/pods");
    }

    #[test]
    fn test_groups_do_not_share_keys() {
        let factory = StorageFactory::new(StorageConfig::default()).expect("factory");
        let wardle = factory.resource_prefix(&GroupResource::new("wardle.example.com", "flunders"));
        let other = factory.resource_prefix(&GroupResource::new("other.example.com", "flunders"));
        assert_ne!(wardle, other);
        assert!(!wardle.starts_with(&other) && !other.starts_with(&wardle));
    }

    #[test]
    fn test_config_defaults() {
        let config: StorageConfig = serde_json::from_str(r#"{"paging": false}"#).expect("parse");
        assert_eq!(config.prefix, "/registry");
        assert!(!config.paging);
        assert_eq!(config.event_window, 1000);
        assert_eq!(config.watch_capacity, 100);
    }
}
