//!
//! # Generic store
//!
//! CRUD and watch over a backend for any registered [`Resource`]. All
//! resource specific behavior comes from the bound strategy.
//!
use std::fmt;
use std::sync::Arc;

use chrono::SecondsFormat;
use chrono::Utc;
use futures::stream;
use futures::stream::BoxStream;
use futures::stream::StreamExt;
use serde_json::Value;
use tracing::debug;
use tracing::instrument;
use tracing::trace;
use tracing::warn;
use uuid::Uuid;

use k8_apiserver_storage::key::collection_key;
use k8_apiserver_storage::key::object_key;
use k8_apiserver_storage::key::parse_revision;
use k8_apiserver_storage::AttrFunc;
use k8_apiserver_storage::NameSpace;
use k8_apiserver_storage::RestOptionsGetter;
use k8_apiserver_storage::SelectionPredicate;
use k8_apiserver_storage::StorageBackend;
use k8_apiserver_storage::StorageError;
use k8_apiserver_storage::WatchEventType;
use k8_apiserver_storage::WatchStream;
use k8_apiserver_types::table::Table;
use k8_apiserver_types::CreateOptions;
use k8_apiserver_types::DeleteOptions;
use k8_apiserver_types::FieldError;
use k8_apiserver_types::FieldErrorList;
use k8_apiserver_types::FieldPath;
use k8_apiserver_types::GroupResource;
use k8_apiserver_types::GroupVersionResource;
use k8_apiserver_types::ListOptions;
use k8_apiserver_types::ObjectMeta;
use k8_apiserver_types::Selector;
use k8_apiserver_types::TypeMeta;
use k8_apiserver_types::UpdateOptions;

use crate::attrs::attr_func;
use crate::gvr::group_version_resource;
use crate::names::generate_name;
use crate::names::is_dns1123_label;
use crate::names::is_path_segment;
use crate::names::validate_object_name;
use crate::RequestContext;
use crate::Resource;
use crate::ResourceList;
use crate::Scheme;
use crate::StoreError;
use crate::StoreInitError;
use crate::Strategy;
use crate::StrategyProfile;

const CONFLICT_MESSAGE: &str =
    "the object has been modified; please apply your changes to the latest version and try again";

/// typed change notification
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEvent<T> {
    Added(T),
    Modified(T),
    Deleted(T),
}

impl<T> ResourceEvent<T> {
    pub fn object(&self) -> &T {
        match self {
            Self::Added(obj) | Self::Modified(obj) | Self::Deleted(obj) => obj,
        }
    }

    pub fn into_object(self) -> T {
        match self {
            Self::Added(obj) | Self::Modified(obj) | Self::Deleted(obj) => obj,
        }
    }
}

pub struct Store<T: Resource> {
    gvr: GroupVersionResource,
    resource: GroupResource,
    strategy: StrategyProfile<T>,
    storage: Arc<dyn StorageBackend>,
    resource_prefix: String,
    paging: bool,
    attrs: AttrFunc,
}

impl<T: Resource> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            gvr: self.gvr.clone(),
            resource: self.resource.clone(),
            strategy: self.strategy.clone(),
            storage: self.storage.clone(),
            resource_prefix: self.resource_prefix.clone(),
            paging: self.paging,
            attrs: self.attrs.clone(),
        }
    }
}

impl<T: Resource> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Store({} at {})", self.gvr, self.resource_prefix)
    }
}

impl<T: Resource> Store<T> {
    /// bind a store to the backend options of its resource
    pub fn new(
        scheme: &Scheme,
        strategy: Arc<dyn Strategy<T>>,
        options: &dyn RestOptionsGetter,
    ) -> Result<Self, StoreInitError> {
        let gvr = group_version_resource::<T>(scheme)?;
        let resource = gvr.group_resource();
        let rest_options =
            options
                .get_rest_options(&resource)
                .map_err(|source| StoreInitError::Backend {
                    resource: resource.clone(),
                    source,
                })?;

        if rest_options.resource_prefix.is_empty() {
            return Err(StoreInitError::InvalidOptions(format!(
                "empty resource prefix for {}",
                resource
            )));
        }

        debug!(
            %gvr,
            prefix = %rest_options.resource_prefix,
            paging = rest_options.paging,
            "store bound"
        );

        Ok(Self {
            gvr,
            resource,
            strategy: StrategyProfile::new(strategy),
            storage: rest_options.storage,
            resource_prefix: rest_options.resource_prefix,
            paging: rest_options.paging,
            attrs: attr_func::<T>(),
        })
    }

    pub fn group_version_resource(&self) -> &GroupVersionResource {
        &self.gvr
    }

    pub fn group_resource(&self) -> &GroupResource {
        &self.resource
    }

    pub fn strategy(&self) -> &StrategyProfile<T> {
        &self.strategy
    }

    pub fn resource_prefix(&self) -> &str {
        &self.resource_prefix
    }

    pub fn new_object(&self) -> T {
        T::new_object()
    }

    pub fn new_list(&self) -> T::List {
        T::new_list()
    }

    pub fn namespace_scoped(&self) -> bool {
        T::namespace_scoped()
    }

    #[instrument(skip(self, ctx, obj, options), fields(resource = %self.resource))]
    pub async fn create(
        &self,
        ctx: &RequestContext,
        mut obj: T,
        options: &CreateOptions,
    ) -> Result<T, StoreError> {
        check_cancelled(ctx)?;
        self.reconcile_namespace(ctx, obj.metadata_mut())?;

        let meta = obj.metadata_mut();
        if meta.name.is_empty() {
            if meta.generate_name.is_empty() {
                return Err(StoreError::Invalid {
                    kind: T::kind().to_owned(),
                    name: String::new(),
                    errors: vec![FieldError::required(
                        &FieldPath::new("metadata").child("name"),
                        "name or generateName is required",
                    )]
                    .into(),
                });
            }
            meta.name = generate_name(&meta.generate_name);
            trace!(name = %meta.name, "generated name");
        }

        meta.reset_system_fields();
        meta.uid = Uuid::new_v4().to_string();
        meta.creation_timestamp = now();
        meta.generation = Some(1);

        self.strategy.prepare_for_create(ctx, &mut obj);
        let mut errors = validate_object_name(obj.metadata(), T::namespace_scoped());
        errors.extend(self.strategy.validate(ctx, &obj));
        self.check_valid(&obj, errors)?;
        self.strategy.canonicalize(&mut obj);
        obj.set_type_meta(self.type_meta());

        if options.is_dry_run() {
            debug!(name = %obj.metadata().name, "dry run create");
            return Ok(obj);
        }

        let key = self.key_of(obj.metadata())?;
        let name = obj.metadata().name.clone();
        let stored = self
            .storage
            .create(&key, serde_json::to_value(&obj)?)
            .await
            .map_err(|err| self.storage_error(&name, err))?;
        debug!(%key, "created");
        self.decode(stored)
    }

    pub async fn get(&self, ctx: &RequestContext, name: &str) -> Result<T, StoreError> {
        check_cancelled(ctx)?;
        let key = self.key_for(ctx, name)?;
        let value = self
            .storage
            .get(&key)
            .await
            .map_err(|err| self.storage_error(name, err))?;
        self.decode(value)
    }

    #[instrument(skip(self, ctx, options), fields(resource = %self.resource))]
    pub async fn list(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<T::List, StoreError> {
        check_cancelled(ctx)?;
        let predicate = self.predicate(options, self.paging)?;
        let prefix = self.collection_key(ctx)?;
        let result = self.storage.list(&prefix, &predicate).await?;

        let items = result
            .items
            .into_iter()
            .map(|value| self.decode(value))
            .collect::<Result<Vec<T>, StoreError>>()?;
        trace!(count = items.len(), "listed");

        let mut list = T::new_list();
        list.set_items(items);
        list.set_type_meta(TypeMeta::new(
            self.gvr.group_version().api_version(),
            format!("{}List", T::kind()),
        ));
        let meta = list.list_meta_mut();
        meta.resource_version = result.revision.to_string();
        meta._continue = result.continue_token;
        meta.remaining_item_count = result.remaining_item_count;
        Ok(list)
    }

    #[instrument(skip(self, ctx, obj, options), fields(resource = %self.resource))]
    pub async fn update(
        &self,
        ctx: &RequestContext,
        mut obj: T,
        options: &UpdateOptions,
    ) -> Result<T, StoreError> {
        check_cancelled(ctx)?;
        self.reconcile_namespace(ctx, obj.metadata_mut())?;
        let name = obj.metadata().name.clone();
        if name.is_empty() {
            return Err(StoreError::BadRequest("name is required for update".to_owned()));
        }

        let key = self.key_of(obj.metadata())?;
        let old = match self.storage.get(&key).await {
            Ok(value) => self.decode(value)?,
            Err(StorageError::NotFound { .. }) if self.strategy.allow_create_on_update() => {
                debug!(%name, "object missing, creating on update");
                let create_options = CreateOptions {
                    dry_run: options.dry_run.clone(),
                    ..Default::default()
                };
                return self.create(ctx, obj, &create_options).await;
            }
            Err(err) => return Err(self.storage_error(&name, err)),
        };

        let old_revision = parse_revision(&old.metadata().resource_version)?;
        let expected = match parse_revision(&obj.metadata().resource_version)? {
            Some(requested) => {
                if Some(requested) != old_revision {
                    debug!(%name, requested, ?old_revision, "stale resource version");
                    return Err(self.conflict(&name));
                }
                Some(requested)
            }
            None if self.strategy.allow_unconditional_update() => None,
            None => {
                return Err(StoreError::Invalid {
                    kind: T::kind().to_owned(),
                    name,
                    errors: vec![FieldError::invalid(
                        &FieldPath::new("metadata").child("resourceVersion"),
                        "",
                        "must be specified for an update",
                    )]
                    .into(),
                })
            }
        };

        obj.metadata_mut().preserve_system_fields(old.metadata());
        self.strategy.prepare_for_update(ctx, &mut obj, &old);
        if spec_changed(&obj, &old)? {
            let generation = old.metadata().generation.unwrap_or(1) + 1;
            trace!(%name, generation, "spec changed");
            obj.metadata_mut().generation = Some(generation);
        }
        self.check_valid(&obj, self.strategy.validate_update(ctx, &obj, &old))?;
        self.strategy.canonicalize(&mut obj);
        obj.set_type_meta(self.type_meta());

        if options.is_dry_run() {
            debug!(%name, "dry run update");
            return Ok(obj);
        }

        let stored = self
            .storage
            .update(&key, serde_json::to_value(&obj)?, expected)
            .await
            .map_err(|err| self.storage_error(&name, err))?;
        debug!(%key, "updated");
        self.decode(stored)
    }

    #[instrument(skip(self, ctx, options), fields(resource = %self.resource))]
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<T, StoreError> {
        check_cancelled(ctx)?;
        let key = self.key_for(ctx, name)?;
        self.delete_key(&key, name, options).await
    }

    /// delete every object matched by the list options, returns deleted objects
    pub async fn delete_collection(
        &self,
        ctx: &RequestContext,
        delete_options: &DeleteOptions,
        list_options: &ListOptions,
    ) -> Result<T::List, StoreError> {
        let listed = self.list(ctx, list_options).await?;
        let mut deleted = Vec::with_capacity(listed.items().len());
        for item in listed.items() {
            check_cancelled(ctx)?;
            let meta = item.metadata();
            let key = self.key_of(meta)?;
            match self.delete_key(&key, &meta.name, delete_options).await {
                Ok(obj) => deleted.push(obj),
                Err(err) if err.is_not_found() => {
                    trace!(%key, "already deleted");
                }
                Err(err) => return Err(err),
            }
        }
        debug!(count = deleted.len(), resource = %self.resource, "collection deleted");

        let mut list = listed;
        list.set_items(deleted);
        list.list_meta_mut()._continue = None;
        list.list_meta_mut().remaining_item_count = None;
        Ok(list)
    }

    /// Change stream in wire form. Ends when the request is cancelled or the
    /// stream is dropped.
    pub async fn watch_raw(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<WatchStream, StoreError> {
        check_cancelled(ctx)?;
        let since = match options.resource_version.as_deref() {
            Some(rv) => parse_revision(rv)?.filter(|rv| *rv > 0),
            None => None,
        };
        let predicate = self.predicate(options, false)?;
        let prefix = self.collection_key(ctx)?;
        debug!(%prefix, ?since, "watch");

        let events = self.storage.watch(&prefix, since, predicate).await?;
        let signal = ctx.cancel_signal();
        Ok(events
            .take_until(async move { signal.cancelled().await })
            .boxed())
    }

    /// Typed change stream. A failure reported by the backend or an object
    /// that cannot be decoded is yielded as an error and ends the stream.
    pub async fn watch(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<BoxStream<'static, Result<ResourceEvent<T>, StoreError>>, StoreError> {
        let events = self
            .watch_raw(ctx, options)
            .await?
            .map(|event| {
                let event_type = event.event_type;
                if event_type == WatchEventType::Error {
                    let message = event.object["message"]
                        .as_str()
                        .unwrap_or("watch failed")
                        .to_owned();
                    return Err(StoreError::Internal(message));
                }
                let obj = serde_json::from_value::<T>(event.object).map_err(|err| {
                    warn!(%err, kind = T::kind(), key = %event.key, "undecodable watch event");
                    StoreError::from(err)
                })?;
                Ok(match event_type {
                    WatchEventType::Added => ResourceEvent::Added(obj),
                    WatchEventType::Modified => ResourceEvent::Modified(obj),
                    _ => ResourceEvent::Deleted(obj),
                })
            })
            .boxed();

        Ok(stream::unfold(Some(events), |events| async move {
            let mut events = events?;
            let event = events.next().await?;
            let rest = if event.is_ok() { Some(events) } else { None };
            Some((event, rest))
        })
        .boxed())
    }

    pub fn convert_to_table(&self, objects: &[T]) -> Result<Table, StoreError> {
        self.strategy.convert_to_table(objects)
    }

    async fn delete_key(
        &self,
        key: &str,
        name: &str,
        options: &DeleteOptions,
    ) -> Result<T, StoreError> {
        let existing = self
            .storage
            .get(key)
            .await
            .map_err(|err| self.storage_error(name, err))?;
        let existing: T = self.decode(existing)?;

        let mut expected = None;
        if let Some(preconditions) = &options.preconditions {
            if let Some(uid) = &preconditions.uid {
                if *uid != existing.metadata().uid {
                    return Err(StoreError::Conflict {
                        resource: self.resource.clone(),
                        name: name.to_owned(),
                        message: format!(
                            "Precondition failed: UID in precondition: {}, UID in object meta: {}",
                            uid,
                            existing.metadata().uid
                        ),
                    });
                }
            }
            if let Some(rv) = &preconditions.resource_version {
                expected = parse_revision(rv)?;
            }
        }

        if options.is_dry_run() {
            debug!(%key, "dry run delete");
            return Ok(existing);
        }

        let removed = self
            .storage
            .delete(key, expected)
            .await
            .map_err(|err| self.storage_error(name, err))?;
        debug!(%key, "deleted");
        self.decode(removed)
    }

    fn type_meta(&self) -> TypeMeta {
        TypeMeta::new(self.gvr.group_version().api_version(), T::kind().to_owned())
    }

    /// objects are served under the version of this store
    fn decode(&self, value: Value) -> Result<T, StoreError> {
        let mut obj: T = serde_json::from_value(value)?;
        obj.set_type_meta(self.type_meta());
        Ok(obj)
    }

    fn check_valid(&self, obj: &T, errors: FieldErrorList) -> Result<(), StoreError> {
        if errors.is_empty() {
            return Ok(());
        }
        debug!(name = %obj.metadata().name, %errors, "rejected");
        Err(StoreError::Invalid {
            kind: T::kind().to_owned(),
            name: obj.metadata().name.clone(),
            errors,
        })
    }

    fn reconcile_namespace(
        &self,
        ctx: &RequestContext,
        meta: &mut ObjectMeta,
    ) -> Result<(), StoreError> {
        if !T::namespace_scoped() {
            meta.namespace.clear();
            return Ok(());
        }

        match ctx.namespace() {
            Some(ns) if meta.namespace.is_empty() => {
                meta.namespace = ns.to_owned();
                Ok(())
            }
            Some(ns) if meta.namespace != ns => Err(StoreError::BadRequest(format!(
                "the namespace of the object ({}) does not match the namespace on the request ({})",
                meta.namespace, ns
            ))),
            Some(_) => Ok(()),
            None if meta.namespace.is_empty() => Err(StoreError::BadRequest(format!(
                "namespace is required for {}",
                self.resource
            ))),
            None => Ok(()),
        }
    }

    fn key_of(&self, meta: &ObjectMeta) -> Result<String, StoreError> {
        let namespace = if T::namespace_scoped() {
            Some(meta.namespace.as_str())
        } else {
            None
        };
        self.checked_key(namespace, &meta.name)
    }

    fn key_for(&self, ctx: &RequestContext, name: &str) -> Result<String, StoreError> {
        if name.is_empty() {
            return Err(StoreError::BadRequest("name is required".to_owned()));
        }
        if !T::namespace_scoped() {
            return self.checked_key(None, name);
        }
        match ctx.namespace() {
            Some(ns) => self.checked_key(Some(ns), name),
            None => Err(StoreError::BadRequest(format!(
                "namespace is required for {}",
                self.resource
            ))),
        }
    }

    /// key of a single object, segments that would escape their level are rejected
    fn checked_key(&self, namespace: Option<&str>, name: &str) -> Result<String, StoreError> {
        if !is_path_segment(name) {
            return Err(StoreError::BadRequest(format!(
                "{} name '{}' may not contain '/' or '%' and may not be '.' or '..'",
                T::kind(),
                name
            )));
        }
        if let Some(ns) = namespace {
            check_namespace(ns)?;
        }
        Ok(object_key(&self.resource_prefix, namespace, name))
    }

    fn collection_key(&self, ctx: &RequestContext) -> Result<String, StoreError> {
        let namespace = if T::namespace_scoped() {
            if let Some(ns) = ctx.namespace() {
                check_namespace(ns)?;
            }
            NameSpace::from(ctx.namespace().map(|ns| ns.to_owned()))
        } else {
            NameSpace::All
        };
        Ok(collection_key(&self.resource_prefix, &namespace))
    }

    fn predicate(
        &self,
        options: &ListOptions,
        paging: bool,
    ) -> Result<SelectionPredicate, StoreError> {
        let label = parse_selector(options.label_selector.as_deref())?;
        let field = parse_selector(options.field_selector.as_deref())?;
        let mut predicate = SelectionPredicate::new(label, field, self.attrs.clone());
        if paging {
            predicate.limit = options.limit;
            predicate.continue_token = options.continu.clone().filter(|c| !c.is_empty());
        }
        Ok(predicate)
    }

    fn conflict(&self, name: &str) -> StoreError {
        StoreError::Conflict {
            resource: self.resource.clone(),
            name: name.to_owned(),
            message: CONFLICT_MESSAGE.to_owned(),
        }
    }

    fn storage_error(&self, name: &str, err: StorageError) -> StoreError {
        match err {
            StorageError::NotFound { .. } => StoreError::NotFound {
                resource: self.resource.clone(),
                name: name.to_owned(),
            },
            StorageError::AlreadyExists { .. } => StoreError::AlreadyExists {
                resource: self.resource.clone(),
                name: name.to_owned(),
            },
            StorageError::Conflict { .. } => self.conflict(name),
            other => StoreError::Storage(other),
        }
    }
}

fn check_namespace(namespace: &str) -> Result<(), StoreError> {
    if is_dns1123_label(namespace) {
        Ok(())
    } else {
        Err(StoreError::BadRequest(format!(
            "namespace '{}' is not a valid DNS-1123 label",
            namespace
        )))
    }
}

fn check_cancelled(ctx: &RequestContext) -> Result<(), StoreError> {
    if ctx.is_cancelled() {
        Err(StoreError::Cancelled)
    } else {
        Ok(())
    }
}

fn parse_selector(raw: Option<&str>) -> Result<Selector, StoreError> {
    match raw {
        Some(raw) => {
            Selector::parse(raw).map_err(|err| StoreError::BadRequest(err.to_string()))
        }
        None => Ok(Selector::everything()),
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// true when anything outside metadata and status differs
fn spec_changed<T: Resource>(obj: &T, old: &T) -> Result<bool, StoreError> {
    fn strip(value: Value) -> Value {
        match value {
            Value::Object(mut map) => {
                for field in ["apiVersion", "kind", "metadata", "status"] {
                    map.remove(field);
                }
                Value::Object(map)
            }
            other => other,
        }
    }
    Ok(strip(serde_json::to_value(obj)?) != strip(serde_json::to_value(old)?))
}
