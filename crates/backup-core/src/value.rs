//! Cell values and their SQL literal rendering.

use std::fmt::Write;

/// A single column value read from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    /// Any value with a textual representation (numbers and dates included).
    Text(String),
    /// Bytes that are not valid UTF-8.
    Binary(Vec<u8>),
}

impl SqlValue {
    /// Build a value from raw column bytes, keeping valid UTF-8 as text.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => SqlValue::Text(text),
            Err(err) => SqlValue::Binary(err.into_bytes()),
        }
    }

    /// Append this value as a SQL literal to `out`.
    ///
    /// NULL is the bare token, text is single quoted with backslash
    /// escapes, binary data becomes a hexadecimal literal.
    pub fn write_literal(&self, out: &mut String) {
        match self {
            SqlValue::Null => out.push_str("NULL"),
            SqlValue::Text(text) => {
                out.push('\'');
                escape_into(text, out);
                out.push('\'');
            }
            SqlValue::Binary(bytes) => {
                out.push_str("X'");
                for byte in bytes {
                    let _ = write!(out, "{byte:02X}");
                }
                out.push('\'');
            }
        }
    }

    pub fn to_literal(&self) -> String {
        let mut out = String::new();
        self.write_literal(&mut out);
        out
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Escape quotes, backslashes and NUL with a backslash; newlines and
/// carriage returns become `\n` and `\r` so every tuple stays on one line.
fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_is_bare_token() {
        assert_eq!(SqlValue::Null.to_literal(), "NULL");
    }

    #[test]
    fn test_plain_text_is_quoted() {
        assert_eq!(SqlValue::from("42").to_literal(), "'42'");
    }

    #[test]
    fn test_quote_backslash_and_newline() {
        let value = SqlValue::from("it's a\\b\nc");
        assert_eq!(value.to_literal(), r"'it\'s a\\b\nc'");
    }

    #[test]
    fn test_carriage_return_double_quote_and_nul() {
        let value = SqlValue::from("a\r\n\"b\"\0");
        assert_eq!(value.to_literal(), r#"'a\r\n\"b\"\0'"#);
    }

    #[test]
    fn test_multibyte_text_is_untouched() {
        assert_eq!(SqlValue::from("año · ñ").to_literal(), "'año · ñ'");
    }

    #[test]
    fn test_invalid_utf8_becomes_hex() {
        let value = SqlValue::from_bytes(vec![0xff, 0x00, 0x1a]);
        assert_eq!(value, SqlValue::Binary(vec![0xff, 0x00, 0x1a]));
        assert_eq!(value.to_literal(), "X'FF001A'");
    }

    #[test]
    fn test_valid_utf8_bytes_become_text() {
        assert_eq!(
            SqlValue::from_bytes(b"hello".to_vec()),
            SqlValue::Text("hello".to_string())
        );
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(SqlValue::from(None::<&str>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".to_string()));
    }
}
