use serde::Deserialize;
use serde::Serialize;

use k8_apiserver_registry::ApiDef;
use k8_apiserver_registry::K8List;
use k8_apiserver_registry::K8Obj;
use k8_apiserver_registry::ObjectHooks;
use k8_apiserver_registry::Spec;
use k8_apiserver_registry::SpecStatus;
use k8_apiserver_types::FieldErrorList;

use crate::validation::validate_flunder;
use crate::GROUP;

const API: ApiDef = ApiDef {
    group: GROUP,
    version: "v1alpha1",
    kind: "Flunder",
    plural: "flunders",
    namespaced: true,
};

pub const FLUNDER_REFERENCE_TYPE: &str = "Flunder";
pub const FISCHER_REFERENCE_TYPE: &str = "Fischer";

pub type Flunder = K8Obj<FlunderSpec>;
pub type FlunderList = K8List<FlunderSpec>;

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FlunderSpec {
    /// name of a flunder or fischer, depending on reference type
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<String>,
}

impl FlunderSpec {
    pub fn new<S: Into<String>>(reference: S) -> Self {
        Self {
            reference: reference.into(),
            reference_type: None,
        }
    }

    pub fn with_reference_type<S: Into<String>>(mut self, reference_type: S) -> Self {
        self.reference_type = Some(reference_type.into());
        self
    }
}

impl Spec for FlunderSpec {
    type Status = FlunderStatus;

    fn metadata() -> &'static ApiDef {
        &API
    }

    fn is_internal_version() -> bool {
        true
    }

    fn hooks() -> ObjectHooks<Flunder> {
        ObjectHooks {
            default: Some(default_flunder),
            validate: Some(validate_flunder),
            validate_update: Some(validate_flunder_update),
            ..ObjectHooks::none()
        }
    }

    fn selectable_field_paths() -> &'static [&'static str] {
        &["spec.reference"]
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FlunderStatus {}

impl SpecStatus for FlunderStatus {}

/// reference type is Flunder unless set
fn default_flunder(flunder: &mut Flunder) {
    let spec = &mut flunder.spec;
    let unset = spec
        .reference_type
        .as_deref()
        .map(str::is_empty)
        .unwrap_or(true);
    if unset && !spec.reference.is_empty() {
        spec.reference_type = Some(FLUNDER_REFERENCE_TYPE.to_owned());
    }
}

fn validate_flunder_update(flunder: &Flunder, _old: &Flunder) -> FieldErrorList {
    validate_flunder(flunder)
}
