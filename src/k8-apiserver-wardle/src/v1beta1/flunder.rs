use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use k8_apiserver_registry::ApiDef;
use k8_apiserver_registry::K8List;
use k8_apiserver_registry::K8Obj;
use k8_apiserver_registry::ObjectHooks;
use k8_apiserver_registry::Spec;
use k8_apiserver_registry::SpecStatus;
use k8_apiserver_types::FieldError;
use k8_apiserver_types::FieldErrorList;
use k8_apiserver_types::FieldPath;

use crate::GROUP;

const API: ApiDef = ApiDef {
    group: GROUP,
    version: "v1beta1",
    kind: "Flunder",
    plural: "flunders",
    namespaced: true,
};

pub type Flunder = K8Obj<FlunderSpec>;
pub type FlunderList = K8List<FlunderSpec>;

/// v1beta1 only knows flunder references. Spec fields of other versions
/// sharing the same storage are carried through untouched.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FlunderSpec {
    pub reference: String,
    #[serde(flatten)]
    pub preserved: BTreeMap<String, Value>,
}

impl FlunderSpec {
    pub fn new<S: Into<String>>(reference: S) -> Self {
        Self {
            reference: reference.into(),
            preserved: BTreeMap::new(),
        }
    }
}

impl Spec for FlunderSpec {
    type Status = FlunderStatus;

    fn metadata() -> &'static ApiDef {
        &API
    }

    fn hooks() -> ObjectHooks<Flunder> {
        ObjectHooks {
            validate: Some(validate),
            prepare_for_update: Some(keep_preserved),
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

/// fields this version cannot express survive an update that omits them
fn keep_preserved(flunder: &mut Flunder, old: &Flunder) {
    for (field, value) in &old.spec.preserved {
        flunder
            .spec
            .preserved
            .entry(field.clone())
            .or_insert_with(|| value.clone());
    }
}

fn validate(flunder: &Flunder) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    if flunder.spec.reference.is_empty() {
        errors.push(FieldError::invalid(
            &FieldPath::new("spec").child("reference"),
            &flunder.spec.reference,
            "cannot be empty",
        ));
    }
    errors
}
