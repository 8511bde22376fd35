// Cursor iteration over the slice of a larger result set held by one window.
use crate::core::cell::{Cell, FieldType};
use crate::core::error::{Error, ErrorKind};
use crate::core::window::Window;

#[derive(Debug)]
pub enum CursorResult<'a> {
    Row(RowRef<'a>),
    /// The position precedes the window's start position.
    BeforeWindow,
    /// The window holds no row at or after the position; refill and retry.
    PastWindow,
}

/// One row of a window, addressed by its global position.
#[derive(Clone, Copy, Debug)]
pub struct RowRef<'a> {
    window: &'a Window,
    position: usize,
}

impl<'a> RowRef<'a> {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn window(&self) -> &'a Window {
        self.window
    }

    pub fn num_columns(&self) -> usize {
        self.window.num_columns()
    }

    pub fn get_type(&self, column: usize) -> Result<FieldType, Error> {
        self.window.get_type(self.position, column)
    }

    pub fn get_blob(&self, column: usize) -> Result<Option<Vec<u8>>, Error> {
        self.window.get_blob(self.position, column)
    }

    pub fn get_string(&self, column: usize) -> Result<Option<String>, Error> {
        self.window.get_string(self.position, column)
    }

    pub fn get_long(&self, column: usize) -> Result<i64, Error> {
        self.window.get_long(self.position, column)
    }

    pub fn get_double(&self, column: usize) -> Result<f64, Error> {
        self.window.get_double(self.position, column)
    }
}

/// Walks global row positions. After yielding the row at `usize::MAX` the
/// cursor stays there and reports `PastWindow`.
#[derive(Debug, Default)]
pub struct Cursor {
    position: usize,
    exhausted: bool,
}

impl Cursor {
    pub fn new() -> Self {
        Self::at(0)
    }

    pub fn at(position: usize) -> Self {
        Self {
            position,
            exhausted: false,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn move_to(&mut self, position: usize) {
        self.position = position;
        self.exhausted = false;
    }

    /// Yields the row at the current position and advances past it.
    pub fn next<'a>(&mut self, window: &'a Window) -> Result<CursorResult<'a>, Error> {
        if window.is_disposed() {
            return Err(Error::new(ErrorKind::Disposed)
                .with_message(format!("window {window} has been disposed")));
        }

        if self.exhausted {
            return Ok(CursorResult::PastWindow);
        }
        let start = window.start_position();
        let Some(offset) = self.position.checked_sub(start) else {
            return Ok(CursorResult::BeforeWindow);
        };
        if offset >= window.num_rows() {
            return Ok(CursorResult::PastWindow);
        }

        let row = RowRef {
            window,
            position: self.position,
        };
        match self.position.checked_add(1) {
            Some(next) => self.position = next,
            None => self.exhausted = true,
        }
        Ok(CursorResult::Row(row))
    }
}

/// Replaces the window contents with `rows`, starting at global `start_position`.
///
/// Every row must hold exactly `num_columns` cells. A row of the wrong width is
/// rolled back with `free_last_row` and reported as `PreconditionViolation`; a
/// row whose position would pass `usize::MAX` is reported as `OutOfRange`. Rows
/// written before a failure stay in the window. Returns the number of rows written.
pub fn fill_window<I, R>(
    window: &mut Window,
    start_position: usize,
    num_columns: usize,
    rows: I,
) -> Result<usize, Error>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = Cell>,
{
    window.clear()?;
    window.set_start_position(start_position)?;
    window.set_num_columns(num_columns)?;

    let mut written = 0;
    for row in rows {
        let Some(position) = start_position.checked_add(written) else {
            return Err(Error::new(ErrorKind::OutOfRange)
                .with_message(format!(
                    "row {written} would lie past the last addressable position"
                ))
                .with_hint("Start the page at a lower position."));
        };
        window.allocate_row()?;
        if let Err(err) = write_row(window, row, position, num_columns) {
            window.free_last_row()?;
            return Err(err);
        }
        written += 1;
    }
    tracing::trace!(window = %window, start_position, rows = written, "filled window");
    Ok(written)
}

fn write_row<R>(window: &mut Window, row: R, position: usize, num_columns: usize) -> Result<(), Error>
where
    R: IntoIterator<Item = Cell>,
{
    let mut width = 0;
    for cell in row {
        if width >= num_columns {
            return Err(width_error(position, num_columns, "more"));
        }
        put_cell(window, cell, position, width)?;
        width += 1;
    }
    if width < num_columns {
        return Err(width_error(position, num_columns, "fewer"));
    }
    Ok(())
}

fn put_cell(window: &mut Window, cell: Cell, row: usize, column: usize) -> Result<(), Error> {
    match cell {
        Cell::Null => window.put_null(row, column),
        Cell::Integer(value) => window.put_long(value, row, column),
        Cell::Float(value) => window.put_double(value, row, column),
        Cell::String(text) => window.put_string(text.as_str(), row, column),
        Cell::Blob(bytes) => window.put_blob(bytes.as_slice(), row, column),
    }
}

fn width_error(position: usize, num_columns: usize, relation: &str) -> Error {
    Error::new(ErrorKind::PreconditionViolation)
        .with_message(format!("row has {relation} cells than the {num_columns} declared columns"))
        .with_row(position)
}
