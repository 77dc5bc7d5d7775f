//!
//! # API registry
//!
//! Version and resource to storage provider table. Providers are registered
//! once during server construction, then the frozen registry installs
//! every resource into an [`ApiGroupInfo`].
//!
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;
use tracing::info;

use k8_apiserver_storage::RestOptionsGetter;

use crate::InstallError;
use crate::RegistrationError;
use crate::RestStorage;
use crate::Scheme;
use crate::StorageProvider;

pub type VersionedStorage = BTreeMap<String, BTreeMap<String, Arc<dyn RestStorage>>>;

/// storages of one API group handed to the serving layer
#[derive(Default)]
pub struct ApiGroupInfo {
    pub group: String,
    pub versioned_resources_storage_map: VersionedStorage,
}

impl fmt::Debug for ApiGroupInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ApiGroupInfo")
            .field("group", &self.group)
            .field("versions", &self.versioned_resources_storage_map)
            .finish()
    }
}

impl ApiGroupInfo {
    pub fn new<S: Into<String>>(group: S) -> Self {
        Self {
            group: group.into(),
            ..Default::default()
        }
    }

    pub fn storage(&self, version: &str, resource: &str) -> Option<&Arc<dyn RestStorage>> {
        self.versioned_resources_storage_map
            .get(version)
            .and_then(|resources| resources.get(resource))
    }

    /// number of installed resources across versions
    pub fn len(&self) -> usize {
        self.versioned_resources_storage_map
            .values()
            .map(|resources| resources.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default, Clone)]
pub struct ApiRegistryBuilder {
    apis: BTreeMap<String, BTreeMap<String, StorageProvider>>,
}

impl ApiRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// register provider for version and resource, an occupied slot is never replaced
    pub fn register<V, R>(
        &mut self,
        version: V,
        resource: R,
        provider: StorageProvider,
    ) -> Result<&mut Self, RegistrationError>
    where
        V: Into<String>,
        R: Into<String>,
    {
        let version = version.into();
        let resource = resource.into();

        let resources = self.apis.entry(version.clone()).or_default();
        if resources.contains_key(&resource) {
            return Err(RegistrationError::AlreadyRegistered { version, resource });
        }

        debug!(%version, %resource, "registering api");
        resources.insert(resource, provider);
        Ok(self)
    }

    pub fn is_registered(&self, version: &str, resource: &str) -> bool {
        self.apis
            .get(version)
            .map(|resources| resources.contains_key(resource))
            .unwrap_or(false)
    }

    pub fn freeze(self) -> ApiRegistry {
        ApiRegistry { apis: self.apis }
    }
}

/// immutable registry produced by [`ApiRegistryBuilder::freeze`]
pub struct ApiRegistry {
    apis: BTreeMap<String, BTreeMap<String, StorageProvider>>,
}

impl fmt::Debug for ApiRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let entries: Vec<String> = self
            .apis
            .iter()
            .flat_map(|(version, resources)| {
                resources
                    .keys()
                    .map(move |resource| format!("{}/{}", version, resource))
            })
            .collect();
        f.debug_list().entries(entries).finish()
    }
}

impl ApiRegistry {
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.apis.keys().map(|v| v.as_str())
    }

    pub fn resources(&self, version: &str) -> Vec<&str> {
        self.apis
            .get(version)
            .map(|resources| resources.keys().map(|r| r.as_str()).collect())
            .unwrap_or_default()
    }

    /// Build every registered storage and add it to the group. On the first
    /// provider failure the target is left untouched.
    pub fn install_all(
        &self,
        target: &mut ApiGroupInfo,
        scheme: &Scheme,
        options: &dyn RestOptionsGetter,
    ) -> Result<(), InstallError> {
        let mut staged = VersionedStorage::new();
        for (version, resources) in &self.apis {
            let version_storage = staged.entry(version.clone()).or_default();
            for (resource, provider) in resources {
                let storage =
                    provider(scheme, options).map_err(|source| InstallError::Provider {
                        version: version.clone(),
                        resource: resource.clone(),
                        source,
                    })?;
                version_storage.insert(resource.clone(), storage);
            }
        }

        for (version, resources) in staged {
            for resource in resources.keys() {
                info!(group = %target.group, %version, %resource, "installed");
            }
            target
                .versioned_resources_storage_map
                .entry(version)
                .or_default()
                .extend(resources);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {

    use k8_apiserver_storage::RestOptions;
    use k8_apiserver_storage::RestOptionsGetter;
    use k8_apiserver_storage::StorageConfig;
    use k8_apiserver_storage::StorageError;
    use k8_apiserver_storage::StorageFactory;
    use k8_apiserver_types::GroupResource;

    use super::ApiGroupInfo;
    use super::ApiRegistryBuilder;
    use crate::fixture::test_scheme;
    use crate::fixture::Gadget;
    use crate::fixture::Widget;
    use crate::fixture::GROUP;
    use crate::rest;
    use crate::InstallError;
    use crate::RegistrationError;
    use crate::StoreInitError;

    /// rejects one resource
    struct Refusing {
        factory: StorageFactory,
        refused: &'static str,
    }

    impl RestOptionsGetter for Refusing {
        fn get_rest_options(&self, resource: &GroupResource) -> Result<RestOptions, StorageError> {
            if resource.resource == self.refused {
                Err(StorageError::InvalidOptions(format!("{} refused", resource)))
            } else {
                self.factory.get_rest_options(resource)
            }
        }
    }

    #[test]
    fn test_register_twice() {
        let mut builder = ApiRegistryBuilder::new();
        builder
            .register("v1", "widgets", rest::new::<Widget>())
            .expect("first");
        let err = builder
            .register("v1", "widgets", rest::new::<Gadget>())
            .err()
            .expect("second");
        assert_eq!(
            err,
            RegistrationError::AlreadyRegistered {
                version: "v1".to_owned(),
                resource: "widgets".to_owned()
            }
        );
        assert!(builder.is_registered("v1", "widgets"));
        assert!(!builder.is_registered("v2", "widgets"));

        let registry = builder.freeze();
        assert_eq!(registry.resources("v1"), vec!["widgets"]);
    }

    #[test]
    fn test_install_all() {
        let scheme = test_scheme();
        let factory = StorageFactory::new(StorageConfig::default()).expect("factory");
        let mut builder = ApiRegistryBuilder::new();
        builder
            .register("v1", "widgets", rest::new::<Widget>())
            .and_then(|b| b.register("v1", "widgets/status", rest::new_status::<Widget>()))
            .and_then(|b| b.register("v1", "gadgets", rest::new::<Gadget>()))
            .expect("register");
        let registry = builder.freeze();

        let mut info = ApiGroupInfo::new(GROUP);
        registry
            .install_all(&mut info, &scheme, &factory)
            .expect("install");
        assert_eq!(info.len(), 3);
        let status = info.storage("v1", "widgets/status").expect("status");
        assert_eq!(status.group_version_resource().resource, "widgets/status");
        assert_eq!(info.storage("v1", "gadgets").map(|s| s.kind()), Some("Gadget"));
    }

    #[test]
    fn test_install_all_or_nothing() {
        let scheme = test_scheme();
        let getter = Refusing {
            factory: StorageFactory::new(StorageConfig::default()).expect("factory"),
            refused: "widgets",
        };
        let mut builder = ApiRegistryBuilder::new();
        builder
            .register("v1", "gadgets", rest::new::<Gadget>())
            .and_then(|b| b.register("v1", "widgets", rest::new::<Widget>()))
            .expect("register");
        let registry = builder.freeze();

        let mut info = ApiGroupInfo::new(GROUP);
        let err = registry
            .install_all(&mut info, &scheme, &getter)
            .expect_err("refused");
        let InstallError::Provider {
            version,
            resource,
            source,
        } = err;
        assert_eq!(version, "v1");
        assert_eq!(resource, "widgets");
        assert!(matches!(source, StoreInitError::Backend { .. }));
        assert!(info.is_empty());
    }
}
