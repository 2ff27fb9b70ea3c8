//! `#{name}` interpolation for launch-rule argument templates.
//!
//! `##` produces a literal `#`; a `#` not followed by `{` or `#` is kept as is.

use std::{borrow::Borrow, collections::HashMap, ffi::OsStr, hash::Hash};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpError {
    #[error("Undefined variable '{0}' at column {}", .1 + 1)]
    UndefinedVar(String, usize),

    #[error("Unclosed brace (opened at column {})", .0 + 1)]
    UnclosedBrace(usize),
}

pub fn interp<K, V>(fmt: &str, variables: &HashMap<K, V>) -> Result<String, InterpError>
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<OsStr>,
{
    let mut res = String::with_capacity(fmt.len() * 2);
    let mut chars = fmt.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '#' {
            res.push(c);
            continue;
        }
        match chars.peek() {
            Some((_, '#')) => {
                chars.next();
                res.push('#');
            }
            Some((_, '{')) => {
                chars.next();
                let name: String = chars
                    .by_ref()
                    .map(|(_, c)| c)
                    .take_while(|&c| c != '}')
                    .collect();
                // `take_while` swallows the closing brace, so re-check it was there.
                let closed = fmt[i..].find('}').is_some();
                if !closed {
                    return Err(InterpError::UnclosedBrace(i));
                }
                let Some(value) = variables.get(name.as_str()) else {
                    return Err(InterpError::UndefinedVar(name, i + 1));
                };
                res += value.as_ref().to_string_lossy().as_ref();
            }
            _ => res.push('#'),
        }
    }
    Ok(res)
}

/// Interpolates every template of an argv list.
pub fn interp_all<K, V>(
    templates: &[String],
    variables: &HashMap<K, V>,
) -> Result<Vec<String>, InterpError>
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<OsStr>,
{
    templates.iter().map(|t| interp(t, variables)).collect()
}
