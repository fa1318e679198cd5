//! Plain-text redirect lists.
//!
//! ```text
//! # one rule per line
//! https://old.example.com -> https://new.example.org:8443
//! ! https://paused.example.com -> https://elsewhere.example.com   # disabled
//! ```
//!
//! URLs are taken verbatim; they are validated when the rules compile. A URL
//! holding whitespace, or starting with `!`, `#` or `"`, is written in double
//! quotes with `\"`, `\\`, `\n`, `\t` and `\r` escapes.

use std::borrow::Cow;

mod error;
mod grammar;

pub use error::ParseError;

/// One line of a redirect list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectEntry {
    pub source: String,
    pub destination: String,
    pub enabled: bool,
}

/// Render `value` as one token of a redirect list, quoting it when a bare
/// token would read back differently.
#[must_use]
pub fn list_token(value: &str) -> Cow<'_, str> {
    let needs_quotes = value.is_empty()
        || value.starts_with(['!', '#', '"'])
        || value.contains(char::is_whitespace);
    if !needs_quotes {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    Cow::Owned(out)
}

/// Parse a redirect list into its entries, in file order.
///
/// # Errors
///
/// Returns [`ParseError`] if a non-comment line is not of the form
/// `[!] <source> -> <destination>`.
pub fn parse(input: &str) -> Result<Vec<RedirectEntry>, ParseError> {
    use winnow::Parser;
    grammar::redirect_list
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}
