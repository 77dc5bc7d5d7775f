//!
//! Key layout: `<resource prefix>/<namespace>/<name>` for namespaced
//! resources and `<resource prefix>/<name>` for cluster scoped ones.
//!
use serde_json::Value;

use crate::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameSpace {
    All,
    Named(String),
}

impl NameSpace {
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn named(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Named(name) => name,
        }
    }
}

impl From<String> for NameSpace {
    fn from(namespace: String) -> Self {
        if namespace.is_empty() {
            NameSpace::All
        } else {
            NameSpace::Named(namespace)
        }
    }
}

impl From<&str> for NameSpace {
    fn from(namespace: &str) -> Self {
        NameSpace::from(namespace.to_owned())
    }
}

impl From<Option<String>> for NameSpace {
    fn from(namespace: Option<String>) -> Self {
        namespace.map(NameSpace::from).unwrap_or(NameSpace::All)
    }
}

fn trimmed(prefix: &str) -> &str {
    prefix.trim_end_matches('/')
}

/// key of a single object
pub fn object_key(prefix: &str, namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}/{}/{}", trimmed(prefix), ns, name),
        _ => format!("{}/{}", trimmed(prefix), name),
    }
}

/// prefix shared by all keys of a collection, always ends with `/`
pub fn collection_key(prefix: &str, namespace: &NameSpace) -> String {
    match namespace {
        NameSpace::All => format!("{}/", trimmed(prefix)),
        NameSpace::Named(ns) => format!("{}/{}/", trimmed(prefix), ns),
    }
}

/// parse resourceVersion, empty string means unset
pub fn parse_revision(resource_version: &str) -> Result<Option<u64>, StorageError> {
    if resource_version.is_empty() {
        return Ok(None);
    }
    resource_version
        .parse::<u64>()
        .map(Some)
        .map_err(|_| StorageError::InvalidResourceVersion(resource_version.to_owned()))
}

/// revision recorded in `metadata.resourceVersion`
pub fn object_revision(obj: &Value) -> Result<Option<u64>, StorageError> {
    match obj.pointer("/metadata/resourceVersion").and_then(|v| v.as_str()) {
        Some(rv) => parse_revision(rv),
        None => Ok(None),
    }
}

pub fn set_object_revision(key: &str, obj: &mut Value, revision: u64) -> Result<(), StorageError> {
    let object = obj.as_object_mut().ok_or_else(|| StorageError::InvalidObject {
        key: key.to_owned(),
    })?;
    let metadata = object
        .entry("metadata")
        .or_insert_with(|| Value::Object(Default::default()));
    let metadata = metadata
        .as_object_mut()
        .ok_or_else(|| StorageError::InvalidObject {
            key: key.to_owned(),
        })?;
    metadata.insert(
        "resourceVersion".to_owned(),
        Value::String(revision.to_string()),
    );
    Ok(())
}

#[cfg(test)]
mod test {

    use serde_json::json;

    use super::collection_key;
    use super::object_key;
    use super::object_revision;
    use super::parse_revision;
    use super::set_object_revision;
    use super::NameSpace;

    #[test]
    fn test_key_layout() {
        let prefix = "/registry/wardle.example.com/flunders/";
        assert_eq!(
            object_key(prefix, Some("ns1"), "f1"),
            "/registry/wardle.example.com/flunders/ns1/f1"
        );
        assert_eq!(
            object_key("/registry/wardle.example.com/fischers", None, "x"),
            "/registry/wardle.example.com/fischers/x"
        );
        assert_eq!(
            collection_key(prefix, &NameSpace::All),
            "/registry/wardle.example.com/flunders/"
        );
        assert_eq!(
            collection_key(prefix, &"ns1".into()),
            "/registry/wardle.example.com/flunders/ns1/"
        );
    }

    #[test]
    fn test_empty_namespace_is_all() {
        assert!(NameSpace::from("").is_all());
        assert_eq!(NameSpace::from(None).named(), "all");
    }

    #[test]
    fn test_revision() {
        assert_eq!(parse_revision("").unwrap(), None);
        assert_eq!(parse_revision("12").unwrap(), Some(12));
        assert!(parse_revision("abc").is_err());

        let mut obj = json!({"kind": "Flunder"});
        set_object_revision("k", &mut obj, 7).expect("set");
        assert_eq!(obj["metadata"]["resourceVersion"], "7");
        assert_eq!(object_revision(&obj).unwrap(), Some(7));
        assert!(set_object_revision("k", &mut json!([]), 1).is_err());
    }
}
