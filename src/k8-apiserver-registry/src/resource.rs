//!
//! # Object capability model
//!
//! Every resource served by a store implements [`Resource`]; its list type
//! implements [`ResourceList`]. Resources that split spec and status
//! additionally implement [`StatusSubResource`].
//!
use std::any::Any;
use std::any::TypeId;
use std::fmt;
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use k8_apiserver_types::FieldErrorList;
use k8_apiserver_types::GroupVersionKind;
use k8_apiserver_types::GroupVersionResource;
use k8_apiserver_types::ListMeta;
use k8_apiserver_types::ObjectMeta;
use k8_apiserver_types::TypeMeta;

pub trait ResourceList:
    Clone + Default + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Item: Resource;

    fn list_meta(&self) -> &ListMeta;

    fn list_meta_mut(&mut self) -> &mut ListMeta;

    fn items(&self) -> &[Self::Item];

    fn set_items(&mut self, items: Vec<Self::Item>);

    fn set_type_meta(&mut self, type_meta: TypeMeta);
}

pub trait Resource:
    Clone + Default + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type List: ResourceList<Item = Self>;

    fn kind() -> &'static str;

    /// group, version and resource this type is declared under
    fn group_version_resource() -> GroupVersionResource;

    fn namespace_scoped() -> bool {
        true
    }

    /// true for the version used as storage representation
    fn is_internal_version() -> bool {
        false
    }

    fn metadata(&self) -> &ObjectMeta;

    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    fn set_type_meta(&mut self, type_meta: TypeMeta);

    /// zero value instance
    fn new_object() -> Self {
        Self::default()
    }

    /// zero value list
    fn new_list() -> Self::List {
        Self::List::default()
    }

    /// lifecycle hooks implemented by the type itself
    fn hooks() -> ObjectHooks<Self> {
        ObjectHooks::none()
    }

    /// JSON paths, beyond name and namespace, usable in field selectors
    fn selectable_field_paths() -> &'static [&'static str] {
        &[]
    }

    fn group_version_kind() -> GroupVersionKind {
        Self::group_version_resource()
            .group_version()
            .with_kind(Self::kind())
    }
}

/// resource with spec and status that can be updated independently
pub trait StatusSubResource: Resource {
    fn copy_status(&mut self, from: &Self);

    fn copy_spec(&mut self, from: &Self);
}

/// hooks a resource type implements on itself, consulted by the default strategy
pub struct ObjectHooks<T> {
    pub default: Option<fn(&mut T)>,
    pub validate: Option<fn(&T) -> FieldErrorList>,
    pub validate_update: Option<fn(&T, &T) -> FieldErrorList>,
    pub prepare_for_create: Option<fn(&mut T)>,
    pub prepare_for_update: Option<fn(&mut T, &T)>,
    pub canonicalize: Option<fn(&mut T)>,
}

impl<T> ObjectHooks<T> {
    pub fn none() -> Self {
        Self {
            default: None,
            validate: None,
            validate_update: None,
            prepare_for_create: None,
            prepare_for_update: None,
            canonicalize: None,
        }
    }
}

impl<T> Default for ObjectHooks<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> Clone for ObjectHooks<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ObjectHooks<T> {}

impl<T> Debug for ObjectHooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ObjectHooks")
            .field("default", &self.default.is_some())
            .field("validate", &self.validate.is_some())
            .field("validate_update", &self.validate_update.is_some())
            .field("prepare_for_create", &self.prepare_for_create.is_some())
            .field("prepare_for_update", &self.prepare_for_update.is_some())
            .field("canonicalize", &self.canonicalize.is_some())
            .finish()
    }
}

pub type AnyObject = Box<dyn Any + Send + Sync>;

/// type erased description of a resource type, used by the scheme
#[derive(Clone)]
pub struct ResourceDescriptor {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub list_type_id: TypeId,
    pub list_type_name: &'static str,
    pub kind: &'static str,
    pub gvr: GroupVersionResource,
    pub namespaced: bool,
    pub internal: bool,
    pub new_object: fn() -> AnyObject,
    pub new_list: fn() -> AnyObject,
    pub defaulter: Option<fn(&mut dyn Any)>,
}

fn new_erased<T: Resource>() -> AnyObject {
    Box::new(T::new_object())
}

fn new_list_erased<T: Resource>() -> AnyObject {
    Box::new(T::new_list())
}

fn default_erased<T: Resource>(obj: &mut dyn Any) {
    if let (Some(obj), Some(default)) = (obj.downcast_mut::<T>(), T::hooks().default) {
        default(obj);
    }
}

impl ResourceDescriptor {
    pub fn of<T: Resource>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            list_type_id: TypeId::of::<T::List>(),
            list_type_name: std::any::type_name::<T::List>(),
            kind: T::kind(),
            gvr: T::group_version_resource(),
            namespaced: T::namespace_scoped(),
            internal: T::is_internal_version(),
            new_object: new_erased::<T>,
            new_list: new_list_erased::<T>,
            defaulter: T::hooks().default.map(|_| default_erased::<T> as fn(&mut dyn Any)),
        }
    }

    pub fn group_version_kind(&self) -> GroupVersionKind {
        self.gvr.group_version().with_kind(self.kind)
    }

    pub fn list_kind(&self) -> String {
        format!("{}List", self.kind)
    }
}

impl Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("type_name", &self.type_name)
            .field("gvr", &self.gvr)
            .field("kind", &self.kind)
            .field("namespaced", &self.namespaced)
            .field("internal", &self.internal)
            .finish()
    }
}
