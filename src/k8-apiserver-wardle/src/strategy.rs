use std::sync::Arc;

use serde_json::Value;

use k8_apiserver_registry::Canonicalizer;
use k8_apiserver_registry::RequestContext;
use k8_apiserver_registry::Resource;
use k8_apiserver_registry::StoreError;
use k8_apiserver_registry::Strategy;
use k8_apiserver_registry::TableConverter;
use k8_apiserver_registry::Validater;
use k8_apiserver_types::table::Table;
use k8_apiserver_types::table::TableColumnDefinition;
use k8_apiserver_types::table::TableRow;
use k8_apiserver_types::FieldErrorList;

use crate::v1alpha1::Fischer;
use crate::validation::validate_fischer;

/// fischers carry no hooks of their own, everything lives here
#[derive(Debug, Default, Clone)]
pub struct FischerStrategy;

impl Strategy<Fischer> for FischerStrategy {
    fn validater(self: Arc<Self>) -> Option<Arc<dyn Validater<Fischer>>> {
        Some(self)
    }

    fn canonicalizer(self: Arc<Self>) -> Option<Arc<dyn Canonicalizer<Fischer>>> {
        Some(self)
    }

    fn table_converter(self: Arc<Self>) -> Option<Arc<dyn TableConverter<Fischer>>> {
        Some(self)
    }
}

impl Validater<Fischer> for FischerStrategy {
    fn validate(&self, _ctx: &RequestContext, obj: &Fischer) -> FieldErrorList {
        validate_fischer(obj)
    }
}

impl Canonicalizer<Fischer> for FischerStrategy {
    fn canonicalize(&self, obj: &mut Fischer) {
        obj.disallowed_flunders.sort();
        obj.disallowed_flunders.dedup();
    }
}

impl TableConverter<Fischer> for FischerStrategy {
    fn convert_to_table(&self, objects: &[Fischer]) -> Result<Table, StoreError> {
        let mut table = Table::new(vec![
            TableColumnDefinition::new(
                "Name",
                "string",
                "name",
                "Name must be unique within a namespace.",
            ),
            TableColumnDefinition::new(
                "Disallowed Flunders",
                "string",
                "",
                "Flunders that may not be referenced.",
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
            .map(|fischer| {
                let meta = fischer.metadata();
                TableRow {
                    cells: vec![
                        Value::String(meta.name.clone()),
                        Value::String(fischer.disallowed_flunders.join(",")),
                        Value::String(meta.creation_timestamp.clone()),
                    ],
                    object: None,
                }
            })
            .collect();
        Ok(table)
    }
}
