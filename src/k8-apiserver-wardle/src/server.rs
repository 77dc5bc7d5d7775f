use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::instrument;

use k8_apiserver_config::ConfigError;
use k8_apiserver_config::ServerOptions;
use k8_apiserver_registry::rest;
use k8_apiserver_registry::ApiGroupInfo;
use k8_apiserver_registry::ApiRegistry;
use k8_apiserver_registry::ApiRegistryBuilder;
use k8_apiserver_registry::InstallError;
use k8_apiserver_registry::RegistrationError;
use k8_apiserver_registry::ResourceDescriptor;
use k8_apiserver_registry::RestStorage;
use k8_apiserver_registry::Scheme;
use k8_apiserver_registry::SchemeBuilder;
use k8_apiserver_storage::StorageError;
use k8_apiserver_storage::StorageFactory;

use crate::strategy::FischerStrategy;
use crate::v1alpha1;
use crate::v1beta1;
use crate::GROUP;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("registration: {0}")]
    Registration(#[from] RegistrationError),
    #[error("install: {0}")]
    Install(#[from] InstallError),
    #[error("server serves {expected}, options are for {found}")]
    GroupMismatch { expected: &'static str, found: String },
}

/// every wardle type, v1alpha1 being the storage version
pub fn build_scheme() -> Result<Scheme, RegistrationError> {
    let mut builder = SchemeBuilder::new();
    builder.add_to_scheme(&[
        ResourceDescriptor::of::<v1alpha1::Flunder>(),
        ResourceDescriptor::of::<v1alpha1::Fischer>(),
        ResourceDescriptor::of::<v1beta1::Flunder>(),
    ])?;
    Ok(builder.build())
}

pub fn build_registry() -> Result<ApiRegistry, RegistrationError> {
    let mut builder = ApiRegistryBuilder::new();
    builder
        .register(
            v1alpha1::VERSION,
            "flunders",
            rest::new_main::<v1alpha1::Flunder>(),
        )?
        .register(
            v1alpha1::VERSION,
            "flunders/status",
            rest::new_status::<v1alpha1::Flunder>(),
        )?
        .register(
            v1alpha1::VERSION,
            "fischers",
            rest::new_with_strategy::<v1alpha1::Fischer>(Arc::new(FischerStrategy)),
        )?
        .register(
            v1beta1::VERSION,
            "flunders",
            rest::new_main::<v1beta1::Flunder>(),
        )?;
    Ok(builder.freeze())
}

/// wardle API group with every storage installed
pub struct WardleServer {
    options: ServerOptions,
    storage: StorageFactory,
    scheme: Scheme,
    group: ApiGroupInfo,
}

impl fmt::Debug for WardleServer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WardleServer")
            .field("name", &self.options.name)
            .field("group", &self.group)
            .finish()
    }
}

impl WardleServer {
    #[instrument(skip(options), fields(group = %options.group))]
    pub fn new(options: ServerOptions) -> Result<Self, ServerError> {
        let options = options.complete()?;
        options.validate()?;
        if options.group != GROUP {
            return Err(ServerError::GroupMismatch {
                expected: GROUP,
                found: options.group,
            });
        }

        let storage = StorageFactory::new(options.storage.clone())?;
        let scheme = build_scheme()?;
        debug!(?scheme, "scheme built");

        let registry = build_registry()?;
        let mut group = ApiGroupInfo::new(GROUP);
        registry.install_all(&mut group, &scheme, &storage)?;
        info!(name = %options.name, resources = group.len(), "wardle server ready");

        Ok(Self {
            options,
            storage,
            scheme,
            group,
        })
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn storage(&self) -> &StorageFactory {
        &self.storage
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn group(&self) -> &ApiGroupInfo {
        &self.group
    }

    /// storage serving resource under version, `None` when not installed
    pub fn resource(&self, version: &str, resource: &str) -> Option<Arc<dyn RestStorage>> {
        self.group.storage(version, resource).cloned()
    }
}
