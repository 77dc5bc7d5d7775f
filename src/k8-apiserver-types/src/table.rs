//!
//! Tabular rendering of objects, as returned for `Accept: ...;as=Table`
//!
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ListMeta;

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    pub api_version: String,
    pub kind: String,
    pub metadata: ListMeta,
    pub column_definitions: Vec<TableColumnDefinition>,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn new(column_definitions: Vec<TableColumnDefinition>) -> Self {
        Self {
            api_version: "meta.k8s.io/v1".to_owned(),
            kind: "Table".to_owned(),
            column_definitions,
            ..Default::default()
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TableColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    pub description: String,
    pub priority: i32,
}

impl TableColumnDefinition {
    pub fn new<S: Into<String>>(name: S, column_type: S, format: S, description: S) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            format: format.into(),
            description: description.into(),
            priority: 0,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TableRow {
    pub cells: Vec<Value>,
    /// full object, only present when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
}
