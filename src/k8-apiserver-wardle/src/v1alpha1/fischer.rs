use serde::Deserialize;
use serde::Serialize;

use k8_apiserver_registry::Resource;
use k8_apiserver_registry::ResourceList;
use k8_apiserver_types::GroupVersionResource;
use k8_apiserver_types::ListMeta;
use k8_apiserver_types::ObjectMeta;
use k8_apiserver_types::TypeMeta;

use crate::GROUP;

const VERSION: &str = "v1alpha1";
const KIND: &str = "Fischer";

fn default_api_version() -> String {
    format!("{}/{}", GROUP, VERSION)
}

fn default_kind() -> String {
    KIND.to_owned()
}

/// cluster scoped list of flunders that may not be referenced
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fischer {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disallowed_flunders: Vec<String>,
}

impl Default for Fischer {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta::default(),
            disallowed_flunders: vec![],
        }
    }
}

impl Fischer {
    pub fn new<S: Into<String>>(name: S, disallowed_flunders: Vec<String>) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            disallowed_flunders,
            ..Default::default()
        }
    }
}

impl Resource for Fischer {
    type List = FischerList;

    fn kind() -> &'static str {
        KIND
    }

    fn group_version_resource() -> GroupVersionResource {
        GroupVersionResource::new(GROUP, VERSION, "fischers")
    }

    fn namespace_scoped() -> bool {
        false
    }

    fn is_internal_version() -> bool {
        true
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
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FischerList {
    pub api_version: String,
    pub kind: String,
    pub metadata: ListMeta,
    pub items: Vec<Fischer>,
}

impl ResourceList for FischerList {
    type Item = Fischer;

    fn list_meta(&self) -> &ListMeta {
        &self.metadata
    }

    fn list_meta_mut(&mut self) -> &mut ListMeta {
        &mut self.metadata
    }

    fn items(&self) -> &[Fischer] {
        &self.items
    }

    fn set_items(&mut self, items: Vec<Fischer>) {
        self.items = items;
    }

    fn set_type_meta(&mut self, type_meta: TypeMeta) {
        self.api_version = type_meta.api_version;
        self.kind = type_meta.kind;
    }
}
