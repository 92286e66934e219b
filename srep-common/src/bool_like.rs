//! Boolean coercion for reference-table cells
//!
//! Reference tables are hand-maintained flat files, so flag columns arrive as
//! `0`/`1`, `true`/`false`, `TRUE`/`FALSE` or similar. Every flag read from
//! reference data goes through [`parse_bool_like`].

/// Coerce a boolean-like text cell to `bool`
///
/// Accepted forms (surrounding whitespace ignored):
/// - all-digit text: `true` if the number is non-zero (`"1"`, `"01"`, `"2"`),
///   `false` if it is zero (`"0"`, `"00"`)
/// - anything else: `true` only for `"true"` in any letter case
///
/// Every other input (`""`, `"yes"`, `"-1"`, `"n/a"`) is `false`.
pub fn parse_bool_like(text: &str) -> bool {
    let text = text.trim();

    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return text.bytes().any(|b| b != b'0');
    }

    text.eq_ignore_ascii_case("true")
}

/// A flag value that may arrive as a native `bool` or as text
///
/// Text goes through [`parse_bool_like`].
pub trait BoolLike {
    fn to_bool(&self) -> bool;
}

impl BoolLike for bool {
    fn to_bool(&self) -> bool {
        *self
    }
}

impl BoolLike for &str {
    fn to_bool(&self) -> bool {
        parse_bool_like(self)
    }
}

impl BoolLike for String {
    fn to_bool(&self) -> bool {
        parse_bool_like(self)
    }
}
