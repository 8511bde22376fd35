// Named, paginated buffer of typed rows with reference-counted disposal.
use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::core::cell::{Cell, FieldType, Number};
use crate::core::error::{Error, ErrorKind};

/// Budget used when a window is created without an explicit size.
pub const DEFAULT_WINDOW_SIZE_BYTES: i64 = 2024 * 1024;

/// Name given to windows constructed without one.
pub const UNNAMED_WINDOW: &str = "<unnamed>";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WindowOptions {
    pub size_bytes: i64,
}

impl WindowOptions {
    pub fn new(size_bytes: i64) -> Self {
        Self { size_bytes }
    }
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE_BYTES)
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Row {
    cells: Vec<Cell>,
}

impl Row {
    fn new(width: usize) -> Self {
        Self {
            cells: vec![Cell::Null; width],
        }
    }
}

/// A buffer holding a contiguous slice of a larger tabular result.
///
/// Row arguments to every accessor are global positions; the window subtracts
/// its start position before indexing. The byte budget is recorded but not
/// enforced against row allocation.
#[derive(Debug)]
pub struct Window {
    name: String,
    size_bytes: i64,
    start_position: usize,
    num_columns: usize,
    rows: Vec<Row>,
    references: usize,
}

impl Window {
    pub fn new(name: Option<&str>, size_bytes: i64) -> Result<Self, Error> {
        if size_bytes < 0 {
            return Err(Error::new(ErrorKind::InvalidConstruction)
                .with_message("window size cannot be less than 0"));
        }
        Ok(Self::build(name, size_bytes))
    }

    pub fn with_options(name: Option<&str>, options: WindowOptions) -> Result<Self, Error> {
        Self::new(name, options.size_bytes)
    }

    /// Creates a window with [`DEFAULT_WINDOW_SIZE_BYTES`].
    pub fn named(name: Option<&str>) -> Self {
        Self::build(name, DEFAULT_WINDOW_SIZE_BYTES)
    }

    fn build(name: Option<&str>, size_bytes: i64) -> Self {
        let name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => UNNAMED_WINDOW.to_string(),
        };
        Self {
            name,
            size_bytes,
            start_position: 0,
            num_columns: 0,
            rows: Vec::new(),
            references: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> i64 {
        self.size_bytes
    }

    /// Content flags for a transport encoder; this window never sets any.
    pub fn describe_contents(&self) -> i32 {
        0
    }

    pub fn start_position(&self) -> usize {
        self.start_position
    }

    pub fn set_start_position(&mut self, position: usize) -> Result<(), Error> {
        self.ensure_open()?;
        self.start_position = position;
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Declares the width of rows allocated from now on.
    ///
    /// Once rows exist the width is fixed: asking for a different width fails with
    /// `PreconditionViolation` and existing rows are left untouched. Re-declaring
    /// the current width is accepted.
    pub fn set_num_columns(&mut self, num_columns: usize) -> Result<(), Error> {
        self.ensure_open()?;
        if !self.rows.is_empty() && num_columns != self.num_columns {
            tracing::debug!(
                window = %self.name,
                current = self.num_columns,
                requested = num_columns,
                "rejected column count change on populated window"
            );
            return Err(Error::new(ErrorKind::PreconditionViolation)
                .with_message(format!(
                    "cannot change column count from {} to {num_columns} while {} rows exist",
                    self.num_columns,
                    self.rows.len()
                ))
                .with_hint("Call clear() before declaring a new column count."));
        }
        self.num_columns = num_columns;
        Ok(())
    }

    pub fn allocate_row(&mut self) -> Result<(), Error> {
        self.ensure_open()?;
        self.rows.push(Row::new(self.num_columns));
        tracing::trace!(window = %self.name, rows = self.rows.len(), "allocated row");
        Ok(())
    }

    pub fn free_last_row(&mut self) -> Result<(), Error> {
        self.ensure_open()?;
        if self.rows.pop().is_none() {
            tracing::debug!(window = %self.name, "free_last_row on empty window");
            return Err(Error::new(ErrorKind::EmptyRemoval)
                .with_message("no rows to free"));
        }
        Ok(())
    }

    /// Drops every row and resets the start position and column count to zero.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.ensure_open()?;
        tracing::debug!(window = %self.name, rows = self.rows.len(), "clearing window");
        self.rows.clear();
        self.start_position = 0;
        self.num_columns = 0;
        Ok(())
    }

    pub fn get_type(&self, row: usize, column: usize) -> Result<FieldType, Error> {
        Ok(self.cell(row, column)?.field_type())
    }

    #[deprecated(note = "use get_type")]
    pub fn is_null(&self, row: usize, column: usize) -> Result<bool, Error> {
        Ok(self.get_type(row, column)? == FieldType::Null)
    }

    /// True for blob and null cells.
    #[deprecated(note = "use get_type")]
    pub fn is_blob(&self, row: usize, column: usize) -> Result<bool, Error> {
        Ok(matches!(
            self.get_type(row, column)?,
            FieldType::Blob | FieldType::Null
        ))
    }

    #[deprecated(note = "use get_type")]
    pub fn is_long(&self, row: usize, column: usize) -> Result<bool, Error> {
        Ok(self.get_type(row, column)? == FieldType::Integer)
    }

    #[deprecated(note = "use get_type")]
    pub fn is_float(&self, row: usize, column: usize) -> Result<bool, Error> {
        Ok(self.get_type(row, column)? == FieldType::Float)
    }

    /// True for string and null cells.
    #[deprecated(note = "use get_type")]
    pub fn is_string(&self, row: usize, column: usize) -> Result<bool, Error> {
        Ok(matches!(
            self.get_type(row, column)?,
            FieldType::String | FieldType::Null
        ))
    }

    /// Reads a cell as bytes.
    ///
    /// - null: `None`
    /// - blob: the stored bytes (a zero-length blob is `Some(vec![])`)
    /// - string: UTF-8 bytes plus one trailing `0x00`
    /// - integer, float: `TypeMismatch`
    pub fn get_blob(&self, row: usize, column: usize) -> Result<Option<Vec<u8>>, Error> {
        self.cell(row, column)?
            .blob_view()
            .map_err(|err| err.at(row, column))
    }

    /// Reads a cell as text.
    ///
    /// Integers use base-10; floats use [`float_text`](crate::core::cell::float_text).
    /// Null is `None`; blobs are `TypeMismatch`.
    pub fn get_string(&self, row: usize, column: usize) -> Result<Option<String>, Error> {
        self.cell(row, column)?
            .text_view()
            .map_err(|err| err.at(row, column))
    }

    /// Replaces `buffer` with the cell text; a null cell leaves it empty.
    pub fn copy_string_to_buffer(
        &self,
        row: usize,
        column: usize,
        buffer: &mut String,
    ) -> Result<(), Error> {
        let text = self.get_string(row, column)?;
        buffer.clear();
        if let Some(text) = text {
            buffer.push_str(&text);
        }
        Ok(())
    }

    /// Null reads as 0, text is parsed leniently (unparseable text is 0),
    /// floats truncate toward zero. Blobs are `TypeMismatch`.
    pub fn get_long(&self, row: usize, column: usize) -> Result<i64, Error> {
        Ok(self.number(row, column)?.as_long())
    }

    pub fn get_double(&self, row: usize, column: usize) -> Result<f64, Error> {
        Ok(self.number(row, column)?.as_double())
    }

    pub fn get_short(&self, row: usize, column: usize) -> Result<i16, Error> {
        Ok(self.get_long(row, column)? as i16)
    }

    pub fn get_int(&self, row: usize, column: usize) -> Result<i32, Error> {
        Ok(self.get_long(row, column)? as i32)
    }

    pub fn get_float(&self, row: usize, column: usize) -> Result<f32, Error> {
        Ok(self.get_double(row, column)? as f32)
    }

    /// Stores a blob. `None` is rejected with `PreconditionViolation`.
    pub fn put_blob<'a>(
        &mut self,
        value: impl Into<Option<&'a [u8]>>,
        row: usize,
        column: usize,
    ) -> Result<(), Error> {
        let bytes = value.into().ok_or_else(|| {
            Error::new(ErrorKind::PreconditionViolation)
                .with_message("blob value must not be absent")
                .at(row, column)
        })?;
        self.put_value(Cell::Blob(bytes.to_vec()), row, column)
    }

    /// Stores text. `None` is rejected with `PreconditionViolation`.
    pub fn put_string<'a>(
        &mut self,
        value: impl Into<Option<&'a str>>,
        row: usize,
        column: usize,
    ) -> Result<(), Error> {
        let text = value.into().ok_or_else(|| {
            Error::new(ErrorKind::PreconditionViolation)
                .with_message("string value must not be absent")
                .at(row, column)
        })?;
        self.put_value(Cell::String(text.to_string()), row, column)
    }

    pub fn put_long(&mut self, value: i64, row: usize, column: usize) -> Result<(), Error> {
        self.put_value(Cell::Integer(value), row, column)
    }

    pub fn put_double(&mut self, value: f64, row: usize, column: usize) -> Result<(), Error> {
        self.put_value(Cell::Float(value), row, column)
    }

    pub fn put_null(&mut self, row: usize, column: usize) -> Result<(), Error> {
        self.put_value(Cell::Null, row, column)
    }

    pub fn is_disposed(&self) -> bool {
        self.references == 0
    }

    pub fn acquire_reference(&mut self) -> Result<(), Error> {
        self.ensure_open()?;
        self.references += 1;
        Ok(())
    }

    /// Drops one reference; the last release disposes the row storage.
    pub fn release_reference(&mut self) {
        if self.references == 0 {
            return;
        }
        self.references -= 1;
        if self.references == 0 {
            self.dispose();
        }
    }

    /// Releases the creator's reference.
    pub fn close(&mut self) {
        self.release_reference();
    }

    /// Holds a reference until the returned guard is dropped.
    pub fn acquire(&mut self) -> Result<WindowRef<'_>, Error> {
        self.acquire_reference()?;
        Ok(WindowRef { window: self })
    }

    fn dispose(&mut self) {
        tracing::debug!(window = %self.name, rows = self.rows.len(), "disposing window");
        self.rows = Vec::new();
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.is_disposed() {
            return Err(Error::new(ErrorKind::Disposed)
                .with_message(format!("window {} has been disposed", self.name)));
        }
        Ok(())
    }

    /// Translates a global row and validates both coordinates.
    fn locate(&self, row: usize, column: usize) -> Result<(usize, usize), Error> {
        self.ensure_open()?;
        let index = match row.checked_sub(self.start_position) {
            Some(index) if index < self.rows.len() => index,
            _ => {
                return Err(Error::new(ErrorKind::OutOfRange)
                    .with_message(format!(
                        "bad row number: start position {}, row count {}",
                        self.start_position,
                        self.rows.len()
                    ))
                    .at(row, column));
            }
        };
        let width = self.rows[index].cells.len();
        if column >= width {
            return Err(Error::new(ErrorKind::OutOfRange)
                .with_message(format!("bad column number: row has {width} columns"))
                .at(row, column));
        }
        Ok((index, column))
    }

    fn cell(&self, row: usize, column: usize) -> Result<&Cell, Error> {
        let (index, column) = self.locate(row, column)?;
        Ok(&self.rows[index].cells[column])
    }

    fn number(&self, row: usize, column: usize) -> Result<Number, Error> {
        self.cell(row, column)?
            .number()
            .map_err(|err| err.at(row, column))
    }

    fn put_value(&mut self, value: Cell, row: usize, column: usize) -> Result<(), Error> {
        let (index, column) = self.locate(row, column)?;
        self.rows[index].cells[column] = value;
        Ok(())
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Scoped reference on a [`Window`]; released on drop.
#[derive(Debug)]
pub struct WindowRef<'a> {
    window: &'a mut Window,
}

impl Deref for WindowRef<'_> {
    type Target = Window;

    fn deref(&self) -> &Window {
        self.window
    }
}

impl DerefMut for WindowRef<'_> {
    fn deref_mut(&mut self) -> &mut Window {
        self.window
    }
}

impl Drop for WindowRef<'_> {
    fn drop(&mut self) {
        self.window.release_reference();
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_WINDOW_SIZE_BYTES, UNNAMED_WINDOW, Window, WindowOptions};
    use crate::core::cell::FieldType;
    use crate::core::error::{Error, ErrorKind};

    fn window_with_rows(columns: usize, rows: usize) -> Window {
        let mut window = Window::new(Some("test"), 4096).expect("window");
        window.set_num_columns(columns).expect("columns");
        for _ in 0..rows {
            window.allocate_row().expect("alloc");
        }
        window
    }

    #[test]
    fn negative_size_is_rejected() {
        let err = Window::new(Some("w"), -1).expect_err("negative size");
        assert_eq!(err.kind(), ErrorKind::InvalidConstruction);
        Window::new(Some("w"), 0).expect("zero size is allowed");
    }

    #[test]
    fn empty_or_missing_name_uses_placeholder() {
        assert_eq!(Window::named(None).name(), UNNAMED_WINDOW);
        assert_eq!(Window::named(Some("")).name(), UNNAMED_WINDOW);
        let window = Window::named(Some("cursor"));
        assert_eq!(window.name(), "cursor");
        assert_eq!(window.to_string(), "cursor");
    }

    #[test]
    fn default_options_use_default_size() {
        let window = Window::with_options(None, WindowOptions::default()).expect("window");
        assert_eq!(window.size_bytes(), DEFAULT_WINDOW_SIZE_BYTES);
        assert_eq!(Window::named(None).size_bytes(), 2024 * 1024);
        assert_eq!(window.describe_contents(), 0);
    }

    #[test]
    fn allocated_rows_start_null() {
        let window = window_with_rows(3, 1);
        for column in 0..3 {
            assert_eq!(window.get_type(0, column).expect("type"), FieldType::Null);
        }
    }

    #[test]
    fn column_index_is_bounded() {
        let window = window_with_rows(2, 1);
        let err = window.get_type(0, 2).expect_err("column out of range");
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(err.column(), Some(2));
    }

    #[test]
    fn column_count_is_fixed_once_rows_exist() {
        let mut window = window_with_rows(2, 1);
        let err = window.set_num_columns(3).expect_err("width change");
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
        assert_eq!(window.num_columns(), 2);
        window.set_num_columns(2).expect("same width is accepted");

        window.clear().expect("clear");
        window.set_num_columns(3).expect("width change after clear");
        window.allocate_row().expect("alloc");
        window.put_long(1, 0, 2).expect("third column");
    }

    #[test]
    fn clear_resets_metadata() {
        let mut window = window_with_rows(2, 3);
        window.set_start_position(10).expect("start");
        window.clear().expect("clear");
        assert_eq!(window.num_rows(), 0);
        assert_eq!(window.start_position(), 0);
        assert_eq!(window.num_columns(), 0);
    }

    #[test]
    fn free_last_row_on_empty_window_fails() {
        let mut window = window_with_rows(1, 1);
        window.free_last_row().expect("free");
        let err = window.free_last_row().expect_err("empty removal");
        assert_eq!(err.kind(), ErrorKind::EmptyRemoval);
        assert_eq!(window.num_rows(), 0);
    }

    #[test]
    fn row_index_is_translated_by_start_position() {
        let mut window = window_with_rows(1, 2);
        window.put_long(7, 0, 0).expect("put");
        window.put_long(8, 1, 0).expect("put");
        window.set_start_position(5).expect("start");

        assert_eq!(window.get_long(5, 0).expect("first"), 7);
        assert_eq!(window.get_long(6, 0).expect("second"), 8);
        for row in [0, 4, 7] {
            let err = window.get_long(row, 0).expect_err("outside window");
            assert_eq!(err.kind(), ErrorKind::OutOfRange);
            assert_eq!(err.row(), Some(row));
        }
        let err = window.put_null(4, 0).expect_err("put before window");
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn narrowing_getters_follow_long_and_double() {
        let mut window = window_with_rows(2, 1);
        window.put_long(70_000, 0, 0).expect("put");
        window.put_double(1.0e40, 0, 1).expect("put");
        assert_eq!(window.get_short(0, 0).expect("short"), 70_000_i64 as i16);
        assert_eq!(window.get_int(0, 0).expect("int"), 70_000);
        assert_eq!(window.get_float(0, 1).expect("float"), f32::INFINITY);
    }

    #[test]
    #[allow(deprecated)]
    fn deprecated_predicates() {
        let mut window = window_with_rows(4, 1);
        window.put_long(1, 0, 1).expect("put");
        window.put_double(1.5, 0, 2).expect("put");
        window.put_string("s", 0, 3).expect("put");

        assert!(window.is_null(0, 0).expect("null"));
        assert!(window.is_blob(0, 0).expect("null counts as blob"));
        assert!(window.is_string(0, 0).expect("null counts as string"));
        assert!(window.is_long(0, 1).expect("long"));
        assert!(window.is_float(0, 2).expect("float"));
        assert!(window.is_string(0, 3).expect("string"));
        assert!(!window.is_blob(0, 3).expect("string is not blob"));
    }

    #[test]
    fn copy_string_replaces_buffer() {
        let mut window = window_with_rows(3, 1);
        window.put_double(3.0, 0, 1).expect("put");
        window.put_blob(&b"x"[..], 0, 2).expect("put");

        let mut buffer = String::from("stale");
        window.copy_string_to_buffer(0, 1, &mut buffer).expect("copy");
        assert_eq!(buffer, "3.0");
        window.copy_string_to_buffer(0, 0, &mut buffer).expect("copy null");
        assert_eq!(buffer, "");
        let err = window
            .copy_string_to_buffer(0, 2, &mut buffer)
            .expect_err("blob");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn close_disposes_window() {
        let mut window = window_with_rows(1, 2);
        window.close();
        assert!(window.is_disposed());
        assert_eq!(window.num_rows(), 0);

        let err = window.get_type(0, 0).expect_err("disposed");
        assert_eq!(err.kind(), ErrorKind::Disposed);
        let err = window.allocate_row().expect_err("disposed");
        assert_eq!(err.kind(), ErrorKind::Disposed);
        let err = window.acquire_reference().expect_err("disposed");
        assert_eq!(err.kind(), ErrorKind::Disposed);
        assert_eq!(window.name(), "test");
    }

    #[test]
    fn extra_references_delay_disposal() {
        let mut window = window_with_rows(1, 1);
        window.acquire_reference().expect("acquire");
        window.close();
        assert!(!window.is_disposed());
        window.put_long(3, 0, 0).expect("still usable");
        window.release_reference();
        assert!(window.is_disposed());
        window.release_reference();
        assert!(window.is_disposed());
    }

    #[test]
    fn guard_releases_on_every_exit_path() {
        fn fails_midway(window: &mut Window) -> Result<(), Error> {
            let mut guard = window.acquire()?;
            guard.put_long(1, 0, 0)?;
            guard.put_long(2, 0, 9)?;
            Ok(())
        }

        let mut window = window_with_rows(1, 1);
        let err = fails_midway(&mut window).expect_err("column 9");
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(window.get_long(0, 0).expect("written before failure"), 1);

        window.close();
        assert!(window.is_disposed());
    }
}
