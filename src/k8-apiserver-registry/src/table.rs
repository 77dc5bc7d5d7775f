use serde_json::Value;

use k8_apiserver_types::table::Table;
use k8_apiserver_types::table::TableColumnDefinition;
use k8_apiserver_types::table::TableRow;

use crate::Resource;

/// name and age columns, used when a strategy has no table converter
pub fn default_table<T: Resource>(objects: &[T]) -> Table {
    let mut table = Table::new(vec![
        TableColumnDefinition::new(
            "Name",
            "string",
            "name",
            "Name must be unique within a namespace.",
        ),
        TableColumnDefinition::new(
            "Created At",
            "date",
            "",
            "Time when this object was created.",
        ),
    ]);

    table.rows = objects
        .iter()
        .map(|obj| {
            let meta = obj.metadata();
            TableRow {
                cells: vec![
                    Value::String(meta.name.clone()),
                    Value::String(meta.creation_timestamp.clone()),
                ],
                object: None,
            }
        })
        .collect();
    table
}
