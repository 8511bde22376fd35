//! Purpose: Define the stable public Rust API boundary for cursor windows.
//! Exports: Window, cell, cursor, and error types plus the JSON cell mapping.
//! Role: Single import path for the CLI and downstream callers.
//! Invariants: Re-exports only; behavior lives in `core` and `json`.

pub use crate::core::cell::{Cell, FieldType, float_text, parse_lenient_double};
pub use crate::core::cursor::{Cursor, CursorResult, RowRef, fill_window};
pub use crate::core::error::{Error, ErrorKind, to_exit_code};
pub use crate::core::window::{
    DEFAULT_WINDOW_SIZE_BYTES, UNNAMED_WINDOW, Window, WindowOptions, WindowRef,
};
pub use crate::json::{cell_from_json, cell_json, row_from_json, row_json};
