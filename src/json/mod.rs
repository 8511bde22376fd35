//! Purpose: Map window cells to and from `serde_json` values.
//! Exports: `cell_from_json`, `row_from_json`, `cell_json`, `row_json`, and `parse`.
//! Role: Collaborator used by the CLI and tests to load and render window rows.
//! Invariants: Rendering goes through the typed window getters, never raw storage.
//! Invariants: Blobs are `{"blob": [u8, ...]}`; every other tag maps to a JSON scalar.

pub mod parse;

use serde_json::{Map, Number, Value, json};

use crate::core::cell::{Cell, FieldType, float_text};
use crate::core::cursor::RowRef;
use crate::core::error::{Error, ErrorKind};
use crate::core::window::Window;

const BLOB_KEY: &str = "blob";

pub fn cell_from_json(value: &Value) -> Result<Cell, Error> {
    match value {
        Value::Null => Ok(Cell::Null),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                Ok(Cell::Integer(integer))
            } else if let Some(float) = number.as_f64() {
                Ok(Cell::Float(float))
            } else {
                Err(unsupported(value))
            }
        }
        Value::String(text) => Ok(Cell::String(text.clone())),
        Value::Object(map) => blob_from_json(map).ok_or_else(|| unsupported(value)),
        Value::Bool(_) | Value::Array(_) => Err(unsupported(value)),
    }
}

pub fn row_from_json(value: &Value) -> Result<Vec<Cell>, Error> {
    let Value::Array(items) = value else {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("row must be a JSON array of cells")
            .with_hint("Write each row as an array, e.g. [1, \"text\", null]."));
    };
    items.iter().map(cell_from_json).collect()
}

/// Renders one cell according to its tag.
pub fn cell_json(window: &Window, row: usize, column: usize) -> Result<Value, Error> {
    let value = match window.get_type(row, column)? {
        FieldType::Null => Value::Null,
        FieldType::Integer => json!(window.get_long(row, column)?),
        FieldType::Float => {
            let float = window.get_double(row, column)?;
            Number::from_f64(float)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(float_text(float)))
        }
        FieldType::String => window
            .get_string(row, column)?
            .map(Value::String)
            .unwrap_or(Value::Null),
        FieldType::Blob => match window.get_blob(row, column)? {
            Some(bytes) => json!({ BLOB_KEY: bytes }),
            None => Value::Null,
        },
    };
    Ok(value)
}

pub fn row_json(row: RowRef<'_>) -> Result<Value, Error> {
    let cells = (0..row.num_columns())
        .map(|column| cell_json(row.window(), row.position(), column))
        .collect::<Result<Vec<_>, _>>()?;
    let mut map = Map::new();
    map.insert("pos".to_string(), json!(row.position()));
    map.insert("cells".to_string(), Value::Array(cells));
    Ok(Value::Object(map))
}

fn blob_from_json(map: &Map<String, Value>) -> Option<Cell> {
    if map.len() != 1 {
        return None;
    }
    let items = map.get(BLOB_KEY)?.as_array()?;
    let bytes = items
        .iter()
        .map(|item| item.as_u64().and_then(|byte| u8::try_from(byte).ok()))
        .collect::<Option<Vec<u8>>>()?;
    Some(Cell::Blob(bytes))
}

fn unsupported(value: &Value) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("unsupported cell value: {value}"))
        .with_hint("Cells are null, numbers, strings, or {\"blob\": [bytes]}.")
}
