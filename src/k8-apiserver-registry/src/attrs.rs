//!
//! # Attribute extraction
//!
//! Label and field sets used by selectors. Extraction runs over the JSON
//! form so the backend can filter stored objects without decoding them.
//!
use std::sync::Arc;

use serde_json::Value;

use k8_apiserver_storage::AttrFunc;
use k8_apiserver_storage::AttributeExtractionError;
use k8_apiserver_types::Fields;
use k8_apiserver_types::Labels;

use crate::Resource;

pub const NAME_FIELD: &str = "metadata.name";
pub const NAMESPACE_FIELD: &str = "metadata.namespace";

/// labels and selectable fields of an object
pub fn get_attrs(
    obj: &Value,
    namespaced: bool,
    extra_fields: &[&str],
) -> Result<(Labels, Fields), AttributeExtractionError> {
    let metadata = obj
        .get("metadata")
        .and_then(|m| m.as_object())
        .ok_or_else(|| AttributeExtractionError::TypeMismatch(describe(obj)))?;

    let labels: Labels = metadata
        .get("labels")
        .and_then(|l| l.as_object())
        .map(|labels| {
            labels
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_owned())))
                .collect()
        })
        .unwrap_or_default();

    let mut fields = Fields::new();
    fields.insert(NAME_FIELD, field_value(metadata.get("name")));
    if namespaced {
        fields.insert(NAMESPACE_FIELD, field_value(metadata.get("namespace")));
    }
    for path in extra_fields {
        let pointer = format!("/{}", path.replace('.', "/"));
        fields.insert(*path, field_value(obj.pointer(&pointer)));
    }

    Ok((labels, fields))
}

/// typed convenience over [`get_attrs`]
pub fn resource_attrs<T: Resource>(obj: &T) -> Result<(Labels, Fields), AttributeExtractionError> {
    let value = serde_json::to_value(obj)
        .map_err(|err| AttributeExtractionError::TypeMismatch(err.to_string()))?;
    get_attrs(&value, T::namespace_scoped(), T::selectable_field_paths())
}

/// attribute function handed to the backend predicate
pub fn attr_func<T: Resource>() -> AttrFunc {
    Arc::new(|obj: &Value| get_attrs(obj, T::namespace_scoped(), T::selectable_field_paths()))
}

fn field_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn describe(obj: &Value) -> String {
    match obj.get("kind").and_then(|k| k.as_str()) {
        Some(kind) => format!("object of kind {} has no metadata", kind),
        None => "object has no metadata".to_owned(),
    }
}

#[cfg(test)]
mod test {

    use serde_json::json;

    use k8_apiserver_storage::AttributeExtractionError;

    use super::get_attrs;

    #[test]
    fn test_labels_and_fields() {
        let obj = json!({
            "kind": "Flunder",
            "metadata": {
                "name": "x",
                "namespace": "ns",
                "labels": { "env": "prod" }
            },
            "spec": { "reference": "f2" }
        });

        let (labels, fields) = get_attrs(&obj, true, &["spec.reference"]).expect("attrs");
        assert!(labels.pairs().contains(&"env=prod".to_owned()));
        let pairs = fields.pairs();
        assert!(pairs.contains(&"metadata.name=x".to_owned()));
        assert!(pairs.contains(&"metadata.namespace=ns".to_owned()));
        assert!(pairs.contains(&"spec.reference=f2".to_owned()));
    }

    #[test]
    fn test_cluster_scoped_has_no_namespace_field() {
        let obj = json!({ "metadata": { "name": "x" } });
        let (labels, fields) = get_attrs(&obj, false, &[]).expect("attrs");
        assert!(labels.is_empty());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("metadata.name"), Some("x"));
    }

    #[test]
    fn test_missing_metadata() {
        let obj = json!({ "kind": "Flunder" });
        assert_eq!(
            get_attrs(&obj, true, &[]),
            Err(AttributeExtractionError::TypeMismatch(
                "object of kind Flunder has no metadata".to_owned()
            ))
        );
    }
}
