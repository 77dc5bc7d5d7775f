//!
//! # Spec envelope
//!
//! Generic object built from a `Spec` and its status, so a resource only has
//! to describe its kind specific fields.
//!
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use k8_apiserver_types::GroupVersion;
use k8_apiserver_types::GroupVersionResource;
use k8_apiserver_types::ListMeta;
use k8_apiserver_types::ObjectMeta;
use k8_apiserver_types::TypeMeta;

use crate::ObjectHooks;
use crate::Resource;
use crate::ResourceList;
use crate::StatusSubResource;

/// static identity of a spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiDef {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
    pub namespaced: bool,
}

impl ApiDef {
    pub fn group_version(&self) -> GroupVersion {
        GroupVersion::new(self.group, self.version)
    }
}

pub trait SpecStatus:
    Sized + Debug + Clone + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl SpecStatus for () {}

/// Kubernetes Spec
pub trait Spec:
    Sized + Debug + Clone + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Status: SpecStatus;

    fn metadata() -> &'static ApiDef;

    fn is_internal_version() -> bool {
        false
    }

    fn api_version() -> String {
        Self::metadata().group_version().api_version()
    }

    fn kind() -> String {
        Self::metadata().kind.to_owned()
    }

    fn hooks() -> ObjectHooks<K8Obj<Self>> {
        ObjectHooks::none()
    }

    fn selectable_field_paths() -> &'static [&'static str] {
        &[]
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(bound(serialize = "S: Serialize"))]
#[serde(bound(deserialize = "S: DeserializeOwned"))]
pub struct K8Obj<S>
where
    S: Spec,
{
    #[serde(default = "S::api_version")]
    pub api_version: String,
    #[serde(default = "S::kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: S,
    #[serde(default)]
    pub status: S::Status,
}

impl<S> K8Obj<S>
where
    S: Spec,
{
    pub fn new<N>(name: N, spec: S) -> Self
    where
        N: Into<String>,
    {
        Self {
            api_version: S::api_version(),
            kind: S::kind(),
            metadata: ObjectMeta::named(name),
            spec,
            ..Default::default()
        }
    }

    pub fn set_namespace<N: Into<String>>(mut self, namespace: N) -> Self {
        self.metadata.namespace = namespace.into();
        self
    }

    pub fn set_status(mut self, status: S::Status) -> Self {
        self.status = status;
        self
    }
}

impl<S> Resource for K8Obj<S>
where
    S: Spec,
{
    type List = K8List<S>;

    fn kind() -> &'static str {
        S::metadata().kind
    }

    fn group_version_resource() -> GroupVersionResource {
        let def = S::metadata();
        GroupVersionResource::new(def.group, def.version, def.plural)
    }

    fn namespace_scoped() -> bool {
        S::metadata().namespaced
    }

    fn is_internal_version() -> bool {
        S::is_internal_version()
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn set_type_meta(&mut self, type_meta: TypeMeta) {
        self.api_version = type_meta.api_version;
        self.kind = type_meta.kind;
    }

    fn new_object() -> Self {
        Self {
            api_version: S::api_version(),
            kind: S::kind(),
            ..Default::default()
        }
    }

    fn hooks() -> ObjectHooks<Self> {
        S::hooks()
    }

    fn selectable_field_paths() -> &'static [&'static str] {
        S::selectable_field_paths()
    }
}

impl<S> StatusSubResource for K8Obj<S>
where
    S: Spec,
{
    fn copy_status(&mut self, from: &Self) {
        self.status = from.status.clone();
    }

    fn copy_spec(&mut self, from: &Self) {
        self.spec = from.spec.clone();
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(bound(serialize = "S: Serialize"))]
#[serde(bound(deserialize = "S: DeserializeOwned"))]
pub struct K8List<S>
where
    S: Spec,
{
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ListMeta,
    #[serde(default)]
    pub items: Vec<K8Obj<S>>,
}

impl<S> ResourceList for K8List<S>
where
    S: Spec,
{
    type Item = K8Obj<S>;

    fn list_meta(&self) -> &ListMeta {
        &self.metadata
    }

    fn list_meta_mut(&mut self) -> &mut ListMeta {
        &mut self.metadata
    }

    fn items(&self) -> &[K8Obj<S>] {
        &self.items
    }

    fn set_items(&mut self, items: Vec<K8Obj<S>>) {
        self.items = items;
    }

    fn set_type_meta(&mut self, type_meta: TypeMeta) {
        self.api_version = type_meta.api_version;
        self.kind = type_meta.kind;
    }
}
