// Error kinds and context for window construction, indexing, and cell coercion.
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Io,
    InvalidConstruction,
    OutOfRange,
    TypeMismatch,
    PreconditionViolation,
    EmptyRemoval,
    Disposed,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    row: Option<usize>,
    column: Option<usize>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            row: None,
            column: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn row(&self) -> Option<usize> {
        self.row
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Attaches the external (pre-translation) cell coordinates.
    pub fn at(self, row: usize, column: usize) -> Self {
        self.with_row(row).with_column(column)
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(row) = self.row {
            write!(f, " (row: {row})")?;
        }
        if let Some(column) = self.column {
            write!(f, " (column: {column})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Io => 3,
        ErrorKind::InvalidConstruction => 4,
        ErrorKind::OutOfRange => 5,
        ErrorKind::TypeMismatch => 6,
        ErrorKind::PreconditionViolation => 7,
        ErrorKind::EmptyRemoval => 8,
        ErrorKind::Disposed => 9,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};
    use std::error::Error as StdError;

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::Io, 3),
            (ErrorKind::InvalidConstruction, 4),
            (ErrorKind::OutOfRange, 5),
            (ErrorKind::TypeMismatch, 6),
            (ErrorKind::PreconditionViolation, 7),
            (ErrorKind::EmptyRemoval, 8),
            (ErrorKind::Disposed, 9),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn display_includes_coordinates() {
        let err = Error::new(ErrorKind::TypeMismatch)
            .with_message("blob requested on integer cell")
            .at(7, 2);
        assert_eq!(
            err.to_string(),
            "TypeMismatch: blob requested on integer cell (row: 7) (column: 2)"
        );
        assert_eq!(err.row(), Some(7));
        assert_eq!(err.column(), Some(2));
    }

    #[test]
    fn source_is_exposed() {
        let io = std::io::Error::other("disk gone");
        let err = Error::new(ErrorKind::Io).with_source(io);
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "disk gone");
    }
}
