//! resource types shared by unit tests
use serde::Deserialize;
use serde::Serialize;

use k8_apiserver_types::FieldError;
use k8_apiserver_types::FieldErrorList;
use k8_apiserver_types::FieldPath;

use crate::ApiDef;
use crate::K8Obj;
use crate::ObjectHooks;
use crate::Scheme;
use crate::SchemeBuilder;
use crate::Spec;
use crate::SpecStatus;

pub const GROUP: &str = "test.example.com";

const WIDGET_API: ApiDef = ApiDef {
    group: GROUP,
    version: "v1",
    kind: "Widget",
    plural: "widgets",
    namespaced: true,
};

const GADGET_API: ApiDef = ApiDef {
    group: GROUP,
    version: "v1",
    kind: "Gadget",
    plural: "gadgets",
    namespaced: false,
};

pub type Widget = K8Obj<WidgetSpec>;
pub type Gadget = K8Obj<GadgetSpec>;

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetSpec {
    pub size: u32,
    pub tags: Vec<String>,
}

impl Spec for WidgetSpec {
    type Status = WidgetStatus;

    fn metadata() -> &'static ApiDef {
        &WIDGET_API
    }

    fn is_internal_version() -> bool {
        true
    }

    fn hooks() -> ObjectHooks<Widget> {
        ObjectHooks {
            validate: Some(validate_widget),
            canonicalize: Some(canonicalize_widget),
            ..ObjectHooks::none()
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetStatus {
    pub ready: bool,
}

impl SpecStatus for WidgetStatus {}

fn validate_widget(widget: &Widget) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    if widget.spec.size == 0 {
        errors.push(FieldError::invalid(
            &FieldPath::new("spec").child("size"),
            widget.spec.size,
            "must be greater than zero",
        ));
    }
    errors
}

fn canonicalize_widget(widget: &mut Widget) {
    widget.spec.tags.sort();
    widget.spec.tags.dedup();
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GadgetSpec {
    pub color: String,
}

impl Spec for GadgetSpec {
    type Status = ();

    fn metadata() -> &'static ApiDef {
        &GADGET_API
    }
}

pub fn test_scheme() -> Scheme {
    let mut builder = SchemeBuilder::new();
    builder
        .add_resource::<Widget>()
        .and_then(|b| b.add_resource::<Gadget>())
        .expect("register test types");
    builder.build()
}
