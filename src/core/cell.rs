// Tagged cell storage plus the coercion rules between storage kinds and typed reads.
use crate::core::error::{Error, ErrorKind};

/// Storage kind of a cell. Numeric codes match the cursor field-type constants.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FieldType {
    Null = 0,
    Integer = 1,
    Float = 2,
    String = 3,
    Blob = 4,
}

impl FieldType {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Result<Self, Error> {
        match code {
            0 => Ok(FieldType::Null),
            1 => Ok(FieldType::Integer),
            2 => Ok(FieldType::Float),
            3 => Ok(FieldType::String),
            4 => Ok(FieldType::Blob),
            _ => Err(Error::new(ErrorKind::TypeMismatch)
                .with_message(format!("unknown field type code {code}"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Null => "null",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Blob => "blob",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Cell {
    #[default]
    Null,
    Integer(i64),
    Float(f64),
    String(String),
    Blob(Vec<u8>),
}

impl Cell {
    pub fn field_type(&self) -> FieldType {
        match self {
            Cell::Null => FieldType::Null,
            Cell::Integer(_) => FieldType::Integer,
            Cell::Float(_) => FieldType::Float,
            Cell::String(_) => FieldType::String,
            Cell::Blob(_) => FieldType::Blob,
        }
    }

    /// Byte view of the cell.
    ///
    /// Text comes back as its UTF-8 bytes followed by a single NUL, matching
    /// what a C-string backed window hands out. A stored blob is returned as-is,
    /// so a zero-length blob is `Some(vec![])` rather than `None`.
    pub(crate) fn blob_view(&self) -> Result<Option<Vec<u8>>, Error> {
        match self {
            Cell::Null => Ok(None),
            Cell::Blob(bytes) => Ok(Some(bytes.clone())),
            Cell::String(text) => {
                let mut bytes = Vec::with_capacity(text.len() + 1);
                bytes.extend_from_slice(text.as_bytes());
                bytes.push(0);
                Ok(Some(bytes))
            }
            Cell::Integer(_) | Cell::Float(_) => Err(Error::new(ErrorKind::TypeMismatch)
                .with_message("getting blob when column is non-blob")),
        }
    }

    pub(crate) fn text_view(&self) -> Result<Option<String>, Error> {
        match self {
            Cell::Null => Ok(None),
            Cell::Integer(value) => Ok(Some(value.to_string())),
            Cell::Float(value) => Ok(Some(float_text(*value))),
            Cell::String(text) => Ok(Some(text.clone())),
            Cell::Blob(_) => Err(Error::new(ErrorKind::TypeMismatch)
                .with_message("getting string when column is blob")),
        }
    }

    /// Shared numeric coercion behind the long and double getters.
    pub(crate) fn number(&self) -> Result<Number, Error> {
        match self {
            Cell::Null => Ok(Number::Long(0)),
            Cell::Integer(value) => Ok(Number::Long(*value)),
            Cell::Float(value) => Ok(Number::Double(*value)),
            Cell::String(text) => Ok(parse_lenient_double(text)
                .map(Number::Double)
                .unwrap_or(Number::Long(0))),
            Cell::Blob(_) => Err(Error::new(ErrorKind::TypeMismatch)
                .with_message("could not convert blob to a number")),
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Integer(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::String(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::String(value)
    }
}

impl From<Vec<u8>> for Cell {
    fn from(value: Vec<u8>) -> Self {
        Cell::Blob(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Number {
    Long(i64),
    Double(f64),
}

impl Number {
    /// Doubles truncate toward zero; NaN becomes 0 and out-of-range values saturate.
    pub(crate) fn as_long(self) -> i64 {
        match self {
            Number::Long(value) => value,
            Number::Double(value) => value as i64,
        }
    }

    pub(crate) fn as_double(self) -> f64 {
        match self {
            Number::Long(value) => value as f64,
            Number::Double(value) => value,
        }
    }
}

/// Text form used when a float cell is read as a string.
///
/// Digits are the shortest that round-trip. Magnitudes in `[1e-3, 1e7)` use plain
/// decimal notation with at least one fractional digit (`12.5`, `3.0`); anything
/// else uses `<mantissa>E<exponent>` (`1.0E10`, `2.5E-4`). Non-finite values are
/// `NaN`, `Infinity` and `-Infinity`.
pub fn float_text(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        return text.to_string();
    }
    if value == 0.0 {
        let text = if value.is_sign_negative() { "-0.0" } else { "0.0" };
        return text.to_string();
    }

    if (1e-3..1e7).contains(&value.abs()) {
        let text = format!("{value}");
        return if text.contains('.') {
            text
        } else {
            format!("{text}.0")
        };
    }

    let text = format!("{value:e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => format!("{mantissa}E{exponent}"),
        Some((mantissa, exponent)) => format!("{mantissa}.0E{exponent}"),
        None => text,
    }
}

/// Parses a floating-point literal the way numeric reads of text cells expect.
///
/// Surrounding whitespace and control characters are ignored, a trailing
/// `f`/`F`/`d`/`D` type suffix is accepted, and `NaN`/`Infinity` are spelled
/// exactly. Hexadecimal literals need a binary exponent (`0x1.8p1`); a bare
/// `0x10` is rejected. Returns `None` for anything else; callers treat that as
/// zero.
pub fn parse_lenient_double(text: &str) -> Option<f64> {
    let trimmed = text.trim_matches(|c: char| c <= ' ');
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let magnitude = match unsigned {
        "NaN" => f64::NAN,
        "Infinity" => f64::INFINITY,
        _ => {
            let body = unsigned
                .strip_suffix(|c: char| matches!(c, 'f' | 'F' | 'd' | 'D'))
                .unwrap_or(unsigned);
            match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
                Some(hex) => parse_hex_literal(hex)?,
                None => parse_decimal_literal(body)?,
            }
        }
    };

    Some(if negative { -magnitude } else { magnitude })
}

fn parse_decimal_literal(body: &str) -> Option<f64> {
    let starts_numeric = body
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_digit() || b == b'.');
    let literal_bytes = body
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !starts_numeric || !literal_bytes {
        return None;
    }
    body.parse::<f64>().ok()
}

/// `<hex>[.<hex>]p<exp>` with the `0x` prefix already removed.
fn parse_hex_literal(hex: &str) -> Option<f64> {
    let (significand, exponent) = hex.split_once(['p', 'P'])?;
    let (whole, fraction) = significand.split_once('.').unwrap_or((significand, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    let exponent = parse_binary_exponent(exponent)?;

    // Keep 64 significant bits; a dropped nonzero digit becomes a sticky low bit
    // so the final conversion still rounds correctly.
    let mut mantissa: u64 = 0;
    let mut shift: i64 = 0;
    let digits = whole
        .chars()
        .map(|c| (c, false))
        .chain(fraction.chars().map(|c| (c, true)));
    for (digit, fractional) in digits {
        let value = digit.to_digit(16)?;
        if mantissa >> 60 == 0 {
            mantissa = (mantissa << 4) | u64::from(value);
            if fractional {
                shift -= 4;
            }
        } else {
            if value != 0 {
                mantissa |= 1;
            }
            if !fractional {
                shift += 4;
            }
        }
    }
    Some(scale_by_power_of_two(mantissa as f64, exponent.saturating_add(shift)))
}

fn parse_binary_exponent(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude = digits.bytes().fold(0i64, |acc, b| {
        acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}

fn scale_by_power_of_two(mut value: f64, exponent: i64) -> f64 {
    // Anything past these bounds has already saturated to zero or infinity.
    let mut exponent = exponent.clamp(-4000, 4000) as i32;
    while exponent > 1000 {
        value *= 2f64.powi(1000);
        exponent -= 1000;
    }
    while exponent < -1000 {
        value *= 2f64.powi(-1000);
        exponent += 1000;
    }
    value * 2f64.powi(exponent)
}
