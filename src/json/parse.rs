//! Purpose: Decode JSONL row input into window cells.
//! Exports: `rows_from_jsonl`.
//! Role: Parser boundary for CLI input so callsites avoid ad hoc decode logic.
//! Invariants: Blank lines are skipped; line numbers in errors are 1-based.
//! Notes: Only the first failing line is reported.

use serde_json::Value;

use crate::core::cell::Cell;
use crate::core::error::{Error, ErrorKind};
use crate::json::row_from_json;

pub fn rows_from_jsonl(input: &str) -> Result<Vec<Vec<Cell>>, Error> {
    let mut rows = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = index + 1;
        let value: Value = serde_json::from_str(line).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid JSON on line {line_no}"))
                .with_source(err)
        })?;
        let row = row_from_json(&value).map_err(|err| {
            let message = format!("line {line_no}: {}", err.message().unwrap_or("invalid row"));
            err.with_message(message)
        })?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::rows_from_jsonl;
    use crate::core::cell::Cell;
    use crate::core::error::ErrorKind;

    #[test]
    fn parses_rows_and_skips_blank_lines() {
        let input = "[1, \"a\"]\n\n  [null, {\"blob\": [9]}]  \n";
        let rows = rows_from_jsonl(input).expect("rows");
        assert_eq!(
            rows,
            vec![
                vec![Cell::Integer(1), Cell::from("a")],
                vec![Cell::Null, Cell::Blob(vec![9])],
            ]
        );
    }

    #[test]
    fn syntax_errors_name_the_line() {
        let err = rows_from_jsonl("[1]\n[2,\n").expect_err("syntax");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.message(), Some("invalid JSON on line 2"));
    }

    #[test]
    fn cell_errors_name_the_line() {
        let err = rows_from_jsonl("[1]\n[true]\n").expect_err("bool cell");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.message().is_some_and(|m| m.starts_with("line 2: unsupported cell value")));
    }
}
