//! Identifier checks and small string helpers for SQL synthesis.

use crate::error::DataError;

/// Wrap `s` in parentheses.
pub fn parenthesize(s: &str) -> String {
    format!("({s})")
}

/// Whether `ident` is a plain (optionally dot-qualified) SQL identifier.
pub fn is_valid_identifier(ident: &str) -> bool {
    !ident.is_empty() && ident.split('.').all(is_valid_segment)
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Reject identifiers that would need quoting.
pub fn check_identifier(ident: &str, kind: &'static str) -> Result<(), DataError> {
    if is_valid_identifier(ident) {
        Ok(())
    } else {
        Err(DataError::InvalidIdentifier {
            kind,
            ident: ident.to_string(),
        })
    }
}
