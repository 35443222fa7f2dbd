//! Startup command rendering.
//!
//! Templates use `{name}` placeholders with `{{` and `}}` as literal braces.
//! The rendered line is split into an argv with shell-like quoting; no shell
//! is involved in spawning.

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors produced while rendering or splitting a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A placeholder has no value.
    #[error("No value for placeholder {{{0}}} in command template")]
    MissingValue(String),

    /// A `{` or `}` that is neither a placeholder nor an escape.
    #[error("Unmatched brace at byte {0} in command template")]
    UnmatchedBrace(usize),

    /// A quote was opened but never closed.
    #[error("Unterminated quote in command line")]
    UnterminatedQuote,

    /// The command rendered to nothing.
    #[error("Command line is empty")]
    EmptyCommand,
}

/// Substitute `{name}` placeholders from `values`.
pub fn render_command(
    template: &str,
    values: &BTreeMap<String, String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, n) in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    if n == '{' {
                        return Err(TemplateError::UnmatchedBrace(pos));
                    }
                    name.push(n);
                }
                if !closed || name.is_empty() {
                    return Err(TemplateError::UnmatchedBrace(pos));
                }
                let value = values
                    .get(&name)
                    .ok_or(TemplateError::MissingValue(name))?;
                out.push_str(value);
            }
            '}' => return Err(TemplateError::UnmatchedBrace(pos)),
            other => out.push(other),
        }
    }

    Ok(out)
}

/// Split a command line into arguments.
///
/// Whitespace separates arguments. Single quotes preserve everything
/// literally, double quotes allow `\"` and `\\` escapes, and an unquoted
/// backslash escapes the next character.
pub fn split_command_line(line: &str) -> Result<Vec<String>, TemplateError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            '\'' => {
                in_arg = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(q) => current.push(q),
                        None => return Err(TemplateError::UnterminatedQuote),
                    }
                }
            }
            '"' => {
                in_arg = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(e @ ('"' | '\\')) => current.push(e),
                            Some(e) => {
                                current.push('\\');
                                current.push(e);
                            }
                            None => return Err(TemplateError::UnterminatedQuote),
                        },
                        Some(q) => current.push(q),
                        None => return Err(TemplateError::UnterminatedQuote),
                    }
                }
            }
            '\\' => {
                in_arg = true;
                if let Some(e) = chars.next() {
                    current.push(e);
                }
            }
            other => {
                in_arg = true;
                current.push(other);
            }
        }
    }
    if in_arg {
        args.push(current);
    }

    if args.is_empty() {
        return Err(TemplateError::EmptyCommand);
    }
    Ok(args)
}
