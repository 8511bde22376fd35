// Core modules implementing the window buffer, cell coercion, cursors, and errors.
pub mod cell;
pub mod cursor;
pub mod error;
pub mod window;
