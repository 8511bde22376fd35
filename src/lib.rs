//! Purpose: Library crate behind the `cursorwindow` CLI and tests.
//! Exports: `core` (window, cells, cursor, errors), `api` (public surface), `json` (cell mapping).
//! Role: In-memory cursor window that emulates a database query-result page.
//! Invariants: All operations are synchronous and in-memory; no internal locking.
//! Invariants: Row arguments are global positions translated by the window start position.
pub mod api;
pub mod core;
pub mod json;
