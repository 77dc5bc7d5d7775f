//!
//! # Scheme
//!
//! Type registry mapping group/version/kind to constructors and defaulting
//! functions. Built during registration with [`SchemeBuilder`] and frozen
//! into an immutable [`Scheme`] before serving.
//!
use std::any::Any;
use std::any::TypeId;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;

use tracing::debug;
use tracing::trace;

use k8_apiserver_types::GroupResource;
use k8_apiserver_types::GroupVersionKind;

use crate::resource::AnyObject;
use crate::Resource;
use crate::ResourceDescriptor;
use crate::RegistrationError;

#[derive(Clone)]
pub struct KnownType {
    pub gvk: GroupVersionKind,
    pub type_id: TypeId,
    pub type_name: &'static str,
    new: fn() -> AnyObject,
}

impl KnownType {
    pub fn new_object(&self) -> AnyObject {
        (self.new)()
    }
}

impl fmt::Debug for KnownType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "KnownType({} => {})", self.gvk, self.type_name)
    }
}

#[derive(Default, Clone)]
struct Tables {
    known: BTreeMap<GroupVersionKind, KnownType>,
    kinds_by_type: HashMap<TypeId, Vec<GroupVersionKind>>,
    defaulters: HashMap<TypeId, fn(&mut dyn Any)>,
    storage_versions: HashMap<GroupResource, GroupVersionKind>,
    descriptors: Vec<ResourceDescriptor>,
}

impl Tables {
    fn add_known_type(
        &mut self,
        gvk: GroupVersionKind,
        type_id: TypeId,
        type_name: &'static str,
        new: fn() -> AnyObject,
    ) -> Result<(), RegistrationError> {
        if let Some(existing) = self.known.get(&gvk) {
            if existing.type_id == type_id {
                trace!(%gvk, "already registered");
                return Ok(());
            }
            return Err(RegistrationError::DuplicateKind {
                gvk,
                existing: existing.type_name,
                requested: type_name,
            });
        }

        trace!(%gvk, type_name, "adding known type");
        self.kinds_by_type
            .entry(type_id)
            .or_default()
            .push(gvk.clone());
        self.known.insert(
            gvk.clone(),
            KnownType {
                gvk,
                type_id,
                type_name,
                new,
            },
        );
        Ok(())
    }

    fn add_descriptor(&mut self, descriptor: &ResourceDescriptor) -> Result<(), RegistrationError> {
        let gv = descriptor.gvr.group_version();
        let gvk = descriptor.group_version_kind();

        if descriptor.internal {
            let resource = descriptor.gvr.group_resource();
            match self.storage_versions.get(&resource) {
                Some(existing) if *existing != gvk => {
                    return Err(RegistrationError::MultipleStorageVersions {
                        resource,
                        existing: existing.clone(),
                        requested: gvk,
                    });
                }
                Some(_) => {}
                None => {
                    self.storage_versions.insert(resource, gvk.clone());
                }
            }
        }

        let mut versions = vec![gv.clone()];
        if descriptor.internal {
            versions.push(gv.internal());
        }

        for version in versions {
            self.add_known_type(
                version.with_kind(descriptor.kind),
                descriptor.type_id,
                descriptor.type_name,
                descriptor.new_object,
            )?;
            self.add_known_type(
                version.with_kind(descriptor.list_kind()),
                descriptor.list_type_id,
                descriptor.list_type_name,
                descriptor.new_list,
            )?;
        }

        if let Some(defaulter) = descriptor.defaulter {
            self.defaulters.insert(descriptor.type_id, defaulter);
        }

        if !self
            .descriptors
            .iter()
            .any(|d| d.type_id == descriptor.type_id)
        {
            self.descriptors.push(descriptor.clone());
        }
        debug!(%gvk, internal = descriptor.internal, "resource added to scheme");
        Ok(())
    }
}

#[derive(Default)]
pub struct SchemeBuilder {
    tables: Tables,
}

impl SchemeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register resource types. Canonical types are registered a second time
    /// under the internal version of their group. Either every descriptor is
    /// registered or, on error, none is.
    pub fn add_to_scheme(
        &mut self,
        descriptors: &[ResourceDescriptor],
    ) -> Result<&mut Self, RegistrationError> {
        let mut staged = self.tables.clone();
        for descriptor in descriptors {
            staged.add_descriptor(descriptor)?;
        }
        self.tables = staged;
        Ok(self)
    }

    pub fn add_resource<T: Resource>(&mut self) -> Result<&mut Self, RegistrationError> {
        self.add_to_scheme(&[ResourceDescriptor::of::<T>()])
    }

    /// register a single kind without resource semantics
    pub fn add_known_type<T: Any + Default + Send + Sync>(
        &mut self,
        gvk: GroupVersionKind,
    ) -> Result<&mut Self, RegistrationError> {
        fn new_default<T: Any + Default + Send + Sync>() -> AnyObject {
            Box::new(T::default())
        }
        self.tables.add_known_type(
            gvk,
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            new_default::<T>,
        )?;
        Ok(self)
    }

    pub fn build(self) -> Scheme {
        debug!(kinds = self.tables.known.len(), "scheme frozen");
        Scheme {
            tables: self.tables,
        }
    }
}

/// immutable type registry
pub struct Scheme {
    tables: Tables,
}

impl fmt::Debug for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.tables.known.keys()).finish()
    }
}

impl Scheme {
    /// kinds registered for a type id, in registration order
    pub fn object_kinds_by_id(
        &self,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<&[GroupVersionKind], RegistrationError> {
        self.tables
            .kinds_by_type
            .get(&type_id)
            .map(|kinds| kinds.as_slice())
            .ok_or(RegistrationError::NotRegistered(type_name))
    }

    pub fn object_kinds<T: Any>(&self) -> Result<&[GroupVersionKind], RegistrationError> {
        self.object_kinds_by_id(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    pub fn recognizes(&self, gvk: &GroupVersionKind) -> bool {
        self.tables.known.contains_key(gvk)
    }

    pub fn known_type(&self, gvk: &GroupVersionKind) -> Option<&KnownType> {
        self.tables.known.get(gvk)
    }

    pub fn new_object(&self, gvk: &GroupVersionKind) -> Result<AnyObject, RegistrationError> {
        self.tables
            .known
            .get(gvk)
            .map(|known| known.new_object())
            .ok_or_else(|| RegistrationError::UnknownKind(gvk.clone()))
    }

    /// run the defaulting function registered for the object's type
    pub fn default_any(&self, obj: &mut dyn Any) {
        let type_id = (*obj).type_id();
        if let Some(defaulter) = self.tables.defaulters.get(&type_id) {
            defaulter(obj);
        }
    }

    pub fn default<T: Any>(&self, obj: &mut T) {
        self.default_any(obj as &mut dyn Any);
    }

    pub fn has_defaulter<T: Any>(&self) -> bool {
        self.tables.defaulters.contains_key(&TypeId::of::<T>())
    }

    pub fn defaulter_for(&self, type_id: TypeId) -> Option<fn(&mut dyn Any)> {
        self.tables.defaulters.get(&type_id).copied()
    }

    /// canonical version recorded for group and resource
    pub fn storage_version(&self, resource: &GroupResource) -> Option<&GroupVersionKind> {
        self.tables.storage_versions.get(resource)
    }

    pub fn descriptors(&self) -> &[ResourceDescriptor] {
        &self.tables.descriptors
    }
}
