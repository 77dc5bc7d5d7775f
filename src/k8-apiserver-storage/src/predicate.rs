//!
//! # Selection predicate
//!
//! Label and field filter evaluated by the backend for list and watch.
//! Attributes are extracted from the stored JSON form by a function supplied
//! by the resource store.
//!
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use k8_apiserver_types::Fields;
use k8_apiserver_types::Labels;
use k8_apiserver_types::Selector;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeExtractionError {
    #[error("object does not expose metadata: {0}")]
    TypeMismatch(String),
}

/// extracts label and field sets from an object
pub type AttrFunc =
    Arc<dyn Fn(&Value) -> Result<(Labels, Fields), AttributeExtractionError> + Send + Sync>;

#[derive(Clone)]
pub struct SelectionPredicate {
    pub label: Selector,
    pub field: Selector,
    pub get_attrs: AttrFunc,
    pub limit: Option<u32>,
    pub continue_token: Option<String>,
}

impl fmt::Debug for SelectionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SelectionPredicate")
            .field("label", &self.label.to_string())
            .field("field", &self.field.to_string())
            .field("limit", &self.limit)
            .field("continue_token", &self.continue_token)
            .finish()
    }
}

impl SelectionPredicate {
    pub fn new(label: Selector, field: Selector, get_attrs: AttrFunc) -> Self {
        Self {
            label,
            field,
            get_attrs,
            limit: None,
            continue_token: None,
        }
    }

    /// predicate accepting every object
    pub fn everything() -> Self {
        Self::new(
            Selector::everything(),
            Selector::everything(),
            Arc::new(|_| Ok((Labels::new(), Fields::new()))),
        )
    }

    pub fn empty(&self) -> bool {
        self.label.is_empty() && self.field.is_empty()
    }

    pub fn matches(&self, obj: &Value) -> Result<bool, AttributeExtractionError> {
        if self.empty() {
            return Ok(true);
        }
        let (labels, fields) = (self.get_attrs)(obj)?;
        Ok(self.label.matches(&labels) && self.field.matches(&fields))
    }
}

#[cfg(test)]
mod test {

    use std::sync::Arc;

    use serde_json::json;

    use k8_apiserver_types::Fields;
    use k8_apiserver_types::Labels;
    use k8_apiserver_types::Selector;

    use super::AttributeExtractionError;
    use super::SelectionPredicate;

    fn label_attrs() -> super::AttrFunc {
        Arc::new(|obj| {
            let labels = obj
                .pointer("/metadata/labels")
                .and_then(|l| l.as_object())
                .ok_or_else(|| AttributeExtractionError::TypeMismatch("labels".to_owned()))?;
            let labels: Labels = labels
                .iter()
                .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_owned()))
                .collect();
            Ok((labels, Fields::new()))
        })
    }

    #[test]
    fn test_everything_matches() {
        let predicate = SelectionPredicate::everything();
        assert!(predicate.empty());
        assert_eq!(predicate.matches(&json!(1)), Ok(true));
    }

    #[test]
    fn test_label_predicate() {
        let predicate = SelectionPredicate::new(
            Selector::parse("env=prod").unwrap(),
            Selector::everything(),
            label_attrs(),
        );
        let prod = json!({"metadata": {"labels": {"env": "prod"}}});
        let dev = json!({"metadata": {"labels": {"env": "dev"}}});
        assert_eq!(predicate.matches(&prod), Ok(true));
        assert_eq!(predicate.matches(&dev), Ok(false));
        assert!(predicate.matches(&json!({})).is_err());
    }
}
