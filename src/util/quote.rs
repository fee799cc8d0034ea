//! Double-quoted string literals shared by the IR and bytecode text forms
//!
//! `\"`, `\\` and `\n` are the only escapes, so any text fits on one line.

use std::fmt::{self, Write};

/// Quoted literal decoding error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteError {
    Unterminated,
    InvalidEscape(char),
}

/// Display adapter writing a string as a quoted literal
pub struct Quoted<'a>(pub &'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_char('"')?;
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                c => f.write_char(c)?,
            }
        }
        f.write_char('"')
    }
}

/// Split `"text" rest` into the decoded text and the rest
pub fn split_quoted(s: &str) -> Result<(String, &str), QuoteError> {
    let body = s.strip_prefix('"').ok_or(QuoteError::Unterminated)?;
    let mut text = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Ok((text, &body[idx + 1..])),
            '\\' => match chars.next() {
                Some((_, '"')) => text.push('"'),
                Some((_, '\\')) => text.push('\\'),
                Some((_, 'n')) => text.push('\n'),
                Some((_, other)) => return Err(QuoteError::InvalidEscape(other)),
                None => return Err(QuoteError::Unterminated),
            },
            c => text.push(c),
        }
    }
    Err(QuoteError::Unterminated)
}
