use std::fmt::Debug;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use futures::stream::BoxStream;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::SelectionPredicate;
use crate::StorageError;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
    /// stream failure, object carries a status describing it
    Error,
}

/// change notification, object is the state after the change
/// (last known state for deletes)
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct WatchEvent {
    #[serde(rename = "type")]
    pub event_type: WatchEventType,
    pub object: Value,
    #[serde(skip)]
    pub prev_object: Option<Value>,
    #[serde(skip)]
    pub key: String,
    #[serde(skip)]
    pub revision: u64,
}

impl WatchEvent {
    /// terminal event reporting a failure to the watcher
    pub fn error(key: &str, revision: u64, code: u16, message: impl Into<String>) -> Self {
        Self {
            event_type: WatchEventType::Error,
            object: serde_json::json!({
                "kind": "Status",
                "apiVersion": "v1",
                "status": "Failure",
                "message": message.into(),
                "code": code,
            }),
            prev_object: None,
            key: key.to_owned(),
            revision,
        }
    }

    pub fn is_error(&self) -> bool {
        self.event_type == WatchEventType::Error
    }

    /// apply predicate, objects moving in or out of the selection
    /// are reported as added or deleted
    pub fn filter(self, predicate: &SelectionPredicate) -> Result<Option<Self>, StorageError> {
        if self.is_error() {
            return Ok(Some(self));
        }
        let current = predicate.matches(&self.object)?;
        let previous = match &self.prev_object {
            Some(prev) => predicate.matches(prev)?,
            None => false,
        };

        let event = match (self.event_type, previous, current) {
            (WatchEventType::Modified, true, true) => Some(self),
            (WatchEventType::Modified, false, true) => Some(Self {
                event_type: WatchEventType::Added,
                ..self
            }),
            (WatchEventType::Modified, true, false) => Some(Self {
                event_type: WatchEventType::Deleted,
                ..self
            }),
            (WatchEventType::Modified, false, false) => None,
            (_, _, true) => Some(self),
            (_, _, false) => None,
        };
        Ok(event)
    }
}

pub type WatchStream = BoxStream<'static, WatchEvent>;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ListResult {
    pub items: Vec<Value>,
    /// store revision the list was read at
    pub revision: u64,
    pub continue_token: Option<String>,
    pub remaining_item_count: Option<i64>,
}

/// key value storage of JSON objects with a global revision counter.
/// Writes stamp `metadata.resourceVersion` with the revision of the write.
#[async_trait]
pub trait StorageBackend: Debug + Send + Sync {
    /// fails with AlreadyExists when key is occupied
    async fn create(&self, key: &str, obj: Value) -> Result<Value, StorageError>;

    async fn get(&self, key: &str) -> Result<Value, StorageError>;

    /// replace object, when expected revision is given it must match the stored one
    async fn update(
        &self,
        key: &str,
        obj: Value,
        expected_revision: Option<u64>,
    ) -> Result<Value, StorageError>;

    /// remove object and return last state
    async fn delete(&self, key: &str, expected_revision: Option<u64>)
        -> Result<Value, StorageError>;

    /// objects under prefix in key order, filtered and paged by predicate
    async fn list(
        &self,
        prefix: &str,
        predicate: &SelectionPredicate,
    ) -> Result<ListResult, StorageError>;

    /// changes under prefix after the given revision
    async fn watch(
        &self,
        prefix: &str,
        since_revision: Option<u64>,
        predicate: SelectionPredicate,
    ) -> Result<WatchStream, StorageError>;

    async fn current_revision(&self) -> u64;
}

#[derive(Deserialize, Serialize, Debug, PartialEq, Eq)]
struct ContinueToken {
    rv: u64,
    start: String,
}

/// opaque token resuming a list after `last_key`
pub fn encode_continue(revision: u64, last_key: &str) -> Result<String, StorageError> {
    let raw = serde_json::to_vec(&ContinueToken {
        rv: revision,
        start: last_key.to_owned(),
    })?;
    Ok(URL_SAFE_NO_PAD.encode(raw))
}

/// returns revision and the key after which to resume
pub fn decode_continue(token: &str) -> Result<(u64, String), StorageError> {
    let invalid = || StorageError::InvalidContinue(token.to_owned());
    let raw = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
    let decoded: ContinueToken = serde_json::from_slice(&raw).map_err(|_| invalid())?;
    Ok((decoded.rv, decoded.start))
}

#[cfg(test)]
mod test {

    use std::sync::Arc;

    use serde_json::json;

    use k8_apiserver_types::Fields;
    use k8_apiserver_types::Labels;
    use k8_apiserver_types::Selector;

    use super::decode_continue;
    use super::encode_continue;
    use super::WatchEvent;
    use super::WatchEventType;
    use crate::SelectionPredicate;

    #[test]
    fn test_continue_token() {
        let token = encode_continue(42, "/registry/a/ns/f1").expect("encode");
        let (rv, start) = decode_continue(&token).expect("decode");
        assert_eq!(rv, 42);
        assert_eq!(start, "/registry/a/ns/f1");
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        // base64 of `{"rv":42` and not a full token
        assert!(decode_continue("eyJydiI6NDI").is_err());
        assert!(decode_continue("!!!").is_err());
        assert!(decode_continue("").is_err());
    }

    #[test]
    fn test_continue_token_is_compact() {
        let key = "/registry/wardle.example.com/flunders/default/a-rather-long-flunder-name";
        let token = encode_continue(7, key).expect("encode");
        let json_len = format!("{{\"rv\":7,\"start\":\"{}\"}}", key).len();
        assert!(token.len() < json_len * 2);
        assert!(token.len() <= (json_len * 4 + 2) / 3);
    }

    #[test]
    fn test_error_event_passes_filter() {
        let predicate = SelectionPredicate::new(
            Selector::parse("env=prod").unwrap(),
            Selector::everything(),
            Arc::new(|_| Ok((Labels::new(), Fields::new()))),
        );
        let event = WatchEvent::error("k", 9, 500, "broken");
        let filtered = event.filter(&predicate).expect("filter").expect("event");
        assert_eq!(filtered.event_type, WatchEventType::Error);
        assert_eq!(filtered.object["code"], 500);
        assert_eq!(
            serde_json::to_value(&filtered).expect("json")["type"],
            "ERROR"
        );
    }

    #[test]
    fn test_modified_leaving_selection_is_deleted() {
        let predicate = SelectionPredicate::new(
            Selector::parse("env=prod").unwrap(),
            Selector::everything(),
            Arc::new(|obj| {
                let mut labels = Labels::new();
                if let Some(env) = obj.pointer("/metadata/labels/env").and_then(|v| v.as_str()) {
                    labels.insert("env", env);
                }
                Ok((labels, Fields::new()))
            }),
        );

        let event = WatchEvent {
            event_type: WatchEventType::Modified,
            object: json!({"metadata": {"labels": {"env": "dev"}}}),
            prev_object: Some(json!({"metadata": {"labels": {"env": "prod"}}})),
            key: "k".to_owned(),
            revision: 3,
        };
        let filtered = event.filter(&predicate).expect("filter").expect("event");
        assert_eq!(filtered.event_type, WatchEventType::Deleted);

        let event = WatchEvent {
            event_type: WatchEventType::Added,
            object: json!({"metadata": {"labels": {"env": "dev"}}}),
            prev_object: None,
            key: "k".to_owned(),
            revision: 4,
        };
        assert!(event.filter(&predicate).expect("filter").is_none());
    }
}
