//! Purpose: Window metadata JSON serializer for the `info` command.
//! Exports: `window_info_json`.
//! Role: Keep the window metadata envelope shape in one place.
//! Invariants: Stable key names for the info payload; type counts list every field type.

use std::collections::BTreeMap;

use cursorwindow::api::{Error, FieldType, Window};
use serde_json::{Map, Value, json};

const FIELD_TYPES: [FieldType; 5] = [
    FieldType::Null,
    FieldType::Integer,
    FieldType::Float,
    FieldType::String,
    FieldType::Blob,
];

pub(crate) fn window_info_json(window: &Window) -> Result<Value, Error> {
    let mut map = Map::new();
    map.insert("name".to_string(), json!(window.name()));
    map.insert("size_bytes".to_string(), json!(window.size_bytes()));
    map.insert("start_position".to_string(), json!(window.start_position()));
    map.insert("num_rows".to_string(), json!(window.num_rows()));
    map.insert("num_columns".to_string(), json!(window.num_columns()));
    map.insert(
        "describe_contents".to_string(),
        json!(window.describe_contents()),
    );
    map.insert("types".to_string(), type_counts_json(window)?);
    Ok(Value::Object(map))
}

fn type_counts_json(window: &Window) -> Result<Value, Error> {
    let mut counts: BTreeMap<&'static str, u64> = FIELD_TYPES
        .iter()
        .map(|field_type| (field_type.as_str(), 0))
        .collect();
    let start = window.start_position();
    let positions = (0..window.num_rows()).map_while(|offset| start.checked_add(offset));
    for row in positions {
        for column in 0..window.num_columns() {
            *counts.entry(window.get_type(row, column)?.as_str()).or_default() += 1;
        }
    }
    let map = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), json!(count)))
        .collect::<Map<String, Value>>();
    Ok(Value::Object(map))
}
