//!
//! # Rest storage
//!
//! Object safe surface of a store for the serving layer. Objects travel in
//! their JSON wire form; decoding applies scheme defaulting followed by
//! strategy defaulting.
//!
use std::any::Any;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use k8_apiserver_storage::RestOptionsGetter;
use k8_apiserver_storage::WatchStream;
use k8_apiserver_types::table::Table;
use k8_apiserver_types::CreateOptions;
use k8_apiserver_types::DeleteOptions;
use k8_apiserver_types::GroupResource;
use k8_apiserver_types::GroupVersionResource;
use k8_apiserver_types::ListOptions;
use k8_apiserver_types::UpdateOptions;

use crate::DefaultStrategy;
use crate::RequestContext;
use crate::Resource;
use crate::Scheme;
use crate::StatusSubResource;
use crate::SplitStrategy;
use crate::Store;
use crate::StoreError;
use crate::StoreInitError;
use crate::Strategy;

pub const STATUS_SUBRESOURCE: &str = "status";

#[async_trait]
pub trait RestStorage: fmt::Debug + Send + Sync {
    /// resource path served, `<resource>/status` for the status subresource
    fn group_version_resource(&self) -> &GroupVersionResource;

    fn kind(&self) -> &'static str;

    fn namespace_scoped(&self) -> bool;

    fn new_object(&self) -> Result<Value, StoreError>;

    fn new_list(&self) -> Result<Value, StoreError>;

    async fn create(
        &self,
        ctx: &RequestContext,
        obj: Value,
        options: &CreateOptions,
    ) -> Result<Value, StoreError>;

    async fn get(&self, ctx: &RequestContext, name: &str) -> Result<Value, StoreError>;

    async fn list(&self, ctx: &RequestContext, options: &ListOptions) -> Result<Value, StoreError>;

    async fn update(
        &self,
        ctx: &RequestContext,
        obj: Value,
        options: &UpdateOptions,
    ) -> Result<Value, StoreError>;

    async fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<Value, StoreError>;

    async fn delete_collection(
        &self,
        ctx: &RequestContext,
        delete_options: &DeleteOptions,
        list_options: &ListOptions,
    ) -> Result<Value, StoreError>;

    async fn watch(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<WatchStream, StoreError>;

    fn convert_to_table(&self, objects: &[Value]) -> Result<Table, StoreError>;
}

/// builds the rest storage of one resource once the scheme and backend are known
pub type StorageProvider = Arc<
    dyn Fn(&Scheme, &dyn RestOptionsGetter) -> Result<Arc<dyn RestStorage>, StoreInitError>
        + Send
        + Sync,
>;

/// [`Store`] exposed through [`RestStorage`]
pub struct ResourceStorage<T: Resource> {
    store: Store<T>,
    gvr: GroupVersionResource,
    scheme_defaulter: Option<fn(&mut dyn Any)>,
    status_only: bool,
}

impl<T: Resource> fmt::Debug for ResourceStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ResourceStorage({})", self.gvr)
    }
}

impl<T: Resource> ResourceStorage<T> {
    pub fn new(scheme: &Scheme, store: Store<T>) -> Self {
        Self {
            gvr: store.group_version_resource().clone(),
            scheme_defaulter: scheme.defaulter_for(TypeId::of::<T>()),
            status_only: false,
            store,
        }
    }

    /// serve only get and update under `<resource>/status`
    pub fn status(scheme: &Scheme, store: Store<T>) -> Self {
        let mut storage = Self::new(scheme, store);
        storage.gvr.resource = format!("{}/{}", storage.gvr.resource, STATUS_SUBRESOURCE);
        storage.status_only = true;
        storage
    }

    pub fn store(&self) -> &Store<T> {
        &self.store
    }

    fn decode(&self, value: Value) -> Result<T, StoreError> {
        let mut obj: T = serde_json::from_value(value).map_err(|err| {
            StoreError::BadRequest(format!("unable to decode {}: {}", T::kind(), err))
        })?;
        if let Some(defaulter) = self.scheme_defaulter {
            defaulter(&mut obj as &mut dyn Any);
        }
        self.store.strategy().default(&mut obj);
        Ok(obj)
    }

    fn ensure_full(&self, verb: &'static str) -> Result<(), StoreError> {
        if self.status_only {
            Err(StoreError::MethodNotSupported {
                resource: GroupResource::new(self.gvr.group.clone(), self.gvr.resource.clone()),
                verb,
            })
        } else {
            Ok(())
        }
    }
}

fn encode<S: serde::Serialize>(obj: &S) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(obj)?)
}

#[async_trait]
impl<T: Resource> RestStorage for ResourceStorage<T> {
    fn group_version_resource(&self) -> &GroupVersionResource {
        &self.gvr
    }

    fn kind(&self) -> &'static str {
        T::kind()
    }

    fn namespace_scoped(&self) -> bool {
        T::namespace_scoped()
    }

    fn new_object(&self) -> Result<Value, StoreError> {
        encode(&self.store.new_object())
    }

    fn new_list(&self) -> Result<Value, StoreError> {
        encode(&self.store.new_list())
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        obj: Value,
        options: &CreateOptions,
    ) -> Result<Value, StoreError> {
        self.ensure_full("create")?;
        let obj = self.decode(obj)?;
        encode(&self.store.create(ctx, obj, options).await?)
    }

    async fn get(&self, ctx: &RequestContext, name: &str) -> Result<Value, StoreError> {
        encode(&self.store.get(ctx, name).await?)
    }

    async fn list(&self, ctx: &RequestContext, options: &ListOptions) -> Result<Value, StoreError> {
        self.ensure_full("list")?;
        encode(&self.store.list(ctx, options).await?)
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        obj: Value,
        options: &UpdateOptions,
    ) -> Result<Value, StoreError> {
        let obj = self.decode(obj)?;
        encode(&self.store.update(ctx, obj, options).await?)
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<Value, StoreError> {
        self.ensure_full("delete")?;
        encode(&self.store.delete(ctx, name, options).await?)
    }

    async fn delete_collection(
        &self,
        ctx: &RequestContext,
        delete_options: &DeleteOptions,
        list_options: &ListOptions,
    ) -> Result<Value, StoreError> {
        self.ensure_full("deletecollection")?;
        encode(
            &self
                .store
                .delete_collection(ctx, delete_options, list_options)
                .await?,
        )
    }

    async fn watch(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<WatchStream, StoreError> {
        self.ensure_full("watch")?;
        self.store.watch_raw(ctx, options).await
    }

    fn convert_to_table(&self, objects: &[Value]) -> Result<Table, StoreError> {
        let objects = objects
            .iter()
            .map(|value| serde_json::from_value::<T>(value.clone()))
            .collect::<Result<Vec<T>, _>>()?;
        self.store.convert_to_table(&objects)
    }
}

/// bind a typed store, fatal when the type is unknown or the backend is misconfigured
pub fn new_store<T: Resource>(
    scheme: &Scheme,
    strategy: Arc<dyn Strategy<T>>,
    options: &dyn RestOptionsGetter,
) -> Result<Store<T>, StoreInitError> {
    Store::new(scheme, strategy, options)
}

/// provider serving `T` with the given strategy
pub fn rest_provider<T: Resource>(strategy: Arc<dyn Strategy<T>>) -> StorageProvider {
    Arc::new(
        move |scheme: &Scheme,
              options: &dyn RestOptionsGetter|
              -> Result<Arc<dyn RestStorage>, StoreInitError> {
            let store = new_store(scheme, strategy.clone(), options)?;
            debug!(kind = T::kind(), "rest storage created");
            Ok(Arc::new(ResourceStorage::new(scheme, store)))
        },
    )
}

/// provider serving the status subresource of `T` with the given base strategy
pub fn status_provider<T: StatusSubResource>(base: Arc<dyn Strategy<T>>) -> StorageProvider {
    let strategy: Arc<dyn Strategy<T>> = Arc::new(SplitStrategy::status_subresource(base));
    Arc::new(
        move |scheme: &Scheme,
              options: &dyn RestOptionsGetter|
              -> Result<Arc<dyn RestStorage>, StoreInitError> {
            let store = new_store(scheme, strategy.clone(), options)?;
            debug!(kind = T::kind(), "status storage created");
            Ok(Arc::new(ResourceStorage::status(scheme, store)))
        },
    )
}

/// provider serving the main endpoint of a `T` that also has a status
/// subresource, updates through it leave the stored status alone
pub fn main_provider<T: StatusSubResource>(base: Arc<dyn Strategy<T>>) -> StorageProvider {
    rest_provider::<T>(Arc::new(SplitStrategy::main_resource(base)))
}

/// provider using the hooks `T` implements on itself
pub fn new<T: Resource>() -> StorageProvider {
    rest_provider::<T>(Arc::new(DefaultStrategy::<T>::new()))
}

pub fn new_with_strategy<T: Resource>(strategy: Arc<dyn Strategy<T>>) -> StorageProvider {
    rest_provider(strategy)
}

pub fn new_main<T: StatusSubResource>() -> StorageProvider {
    main_provider::<T>(Arc::new(DefaultStrategy::<T>::new()))
}

pub fn new_main_with_strategy<T: StatusSubResource>(
    strategy: Arc<dyn Strategy<T>>,
) -> StorageProvider {
    main_provider(strategy)
}

pub fn new_status<T: StatusSubResource>() -> StorageProvider {
    status_provider::<T>(Arc::new(DefaultStrategy::<T>::new()))
}

pub fn new_status_with_strategy<T: StatusSubResource>(
    strategy: Arc<dyn Strategy<T>>,
) -> StorageProvider {
    status_provider(strategy)
}

#[cfg(test)]
mod test {

    use std::sync::Arc;

    use serde_json::json;

    use k8_apiserver_storage::StorageConfig;
    use k8_apiserver_storage::StorageFactory;
    use k8_apiserver_types::CreateOptions;
    use k8_apiserver_types::DeleteOptions;
    use k8_apiserver_types::ListOptions;
    use k8_apiserver_types::UpdateOptions;

    use super::main_provider;
    use super::new;
    use super::new_main;
    use super::new_status;
    use super::status_provider;
    use crate::fixture::test_scheme;
    use crate::fixture::Widget;
    use crate::AllowCreateOnUpdater;
    use crate::RequestContext;
    use crate::Strategy;

    struct Upsert;

    impl Strategy<Widget> for Upsert {
        fn create_on_update(self: Arc<Self>) -> Option<Arc<dyn AllowCreateOnUpdater>> {
            Some(self)
        }
    }

    impl AllowCreateOnUpdater for Upsert {
        fn allow_create_on_update(&self) -> bool {
            true
        }
    }

    #[fluvio_future::test]
    async fn test_json_round_trip_through_rest() {
        let scheme = test_scheme();
        let factory = StorageFactory::new(StorageConfig::default()).expect("factory");
        let storage = (new::<Widget>())(&scheme, &factory).expect("storage");
        assert_eq!(storage.group_version_resource().resource, "widgets");
        assert_eq!(storage.kind(), "Widget");

        let ctx = RequestContext::with_namespace("ns1");
        let created = storage
            .create(
                &ctx,
                json!({ "metadata": { "name": "w1" }, "spec": { "size": 2 } }),
                &CreateOptions::default(),
            )
            .await
            .expect("create");
        assert_eq!(created["kind"], "Widget");
        assert_eq!(created["apiVersion"], "test.example.com/v1");

        let list = storage.list(&ctx, &ListOptions::default()).await.expect("list");
        assert_eq!(list["items"].as_array().map(|i| i.len()), Some(1));

        let err = storage
            .create(&ctx, json!({ "spec": "not an object" }), &CreateOptions::default())
            .await
            .expect_err("undecodable");
        assert_eq!(err.code(), 400);
    }

    #[fluvio_future::test]
    async fn test_status_storage_updates_status_only() {
        let scheme = test_scheme();
        let factory = StorageFactory::new(StorageConfig::default()).expect("factory");
        let storage = (new_main::<Widget>())(&scheme, &factory).expect("storage");
        let status = (new_status::<Widget>())(&scheme, &factory).expect("status");
        assert_eq!(status.group_version_resource().resource, "widgets/status");

        let ctx = RequestContext::with_namespace("ns1");
        let created = storage
            .create(
                &ctx,
                json!({ "metadata": { "name": "w1" }, "spec": { "size": 2 } }),
                &CreateOptions::default(),
            )
            .await
            .expect("create");

        let mut changed = created.clone();
        changed["spec"]["size"] = json!(10);
        changed["status"]["ready"] = json!(true);
        let updated = status
            .update(&ctx, changed, &UpdateOptions::default())
            .await
            .expect("status update");
        assert_eq!(updated["spec"]["size"], 2);
        assert_eq!(updated["status"]["ready"], true);
        assert_eq!(updated["metadata"]["generation"], 1);

        let fetched = status.get(&ctx, "w1").await.expect("get");
        assert_eq!(fetched["status"]["ready"], true);

        let err = status
            .delete(&ctx, "w1", &DeleteOptions::default())
            .await
            .expect_err("not allowed");
        assert_eq!(err.code(), 405);
        assert!(status
            .create(&ctx, json!({ "metadata": { "name": "w2" } }), &CreateOptions::default())
            .await
            .is_err());
    }

    #[fluvio_future::test]
    async fn test_main_storage_keeps_status() {
        //given
        let scheme = test_scheme();
        let factory = StorageFactory::new(StorageConfig::default()).expect("factory");
        let storage = (new_main::<Widget>())(&scheme, &factory).expect("storage");
        let status = (new_status::<Widget>())(&scheme, &factory).expect("status");
        let ctx = RequestContext::with_namespace("ns1");
        let created = storage
            .create(
                &ctx,
                json!({ "metadata": { "name": "w1" }, "spec": { "size": 2 } }),
                &CreateOptions::default(),
            )
            .await
            .expect("create");
        let mut ready = created;
        ready["status"]["ready"] = json!(true);
        let ready = status
            .update(&ctx, ready, &UpdateOptions::default())
            .await
            .expect("status update");

        //when
        let mut changed = ready;
        changed["spec"]["size"] = json!(3);
        changed["status"]["ready"] = json!(false);
        let updated = storage
            .update(&ctx, changed, &UpdateOptions::default())
            .await
            .expect("update");

        //then
        assert_eq!(updated["spec"]["size"], 3);
        assert_eq!(updated["status"]["ready"], true);
        let fetched = storage.get(&ctx, "w1").await.expect("get");
        assert_eq!(fetched["status"]["ready"], true);
    }

    #[fluvio_future::test]
    async fn test_status_update_never_creates() {
        let scheme = test_scheme();
        let factory = StorageFactory::new(StorageConfig::default()).expect("factory");
        let main = (main_provider::<Widget>(Arc::new(Upsert)))(&scheme, &factory).expect("main");
        let status =
            (status_provider::<Widget>(Arc::new(Upsert)))(&scheme, &factory).expect("status");
        let ctx = RequestContext::with_namespace("ns1");

        let err = status
            .update(
                &ctx,
                json!({ "metadata": { "name": "w8" }, "spec": { "size": 1 } }),
                &UpdateOptions::default(),
            )
            .await
            .expect_err("missing");
        assert!(err.is_not_found());
        assert!(status.get(&ctx, "w8").await.is_err());

        let created = main
            .update(
                &ctx,
                json!({ "metadata": { "name": "w9" }, "spec": { "size": 1 } }),
                &UpdateOptions::default(),
            )
            .await
            .expect("created through update");
        assert_eq!(created["metadata"]["name"], "w9");
    }
}
