//! Forgiving JSON parsing for model output.
//!
//! Language models routinely wrap JSON in prose or code fences and emit
//! trailing commas, unquoted keys, single-quoted strings, comments and raw
//! newlines inside strings. Strict parsing is tried first; on failure the
//! text is rewritten into strict JSON and parsed again.

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum LenientJsonError {
    #[error("no JSON value found in model output")]
    Empty,

    #[error("{0}")]
    Syntax(#[from] serde_json::Error),
}

pub fn parse(text: &str) -> Result<Value, LenientJsonError> {
    let body = extract_body(text);
    if body.trim().is_empty() {
        return Err(LenientJsonError::Empty);
    }

    if let Ok(value) = serde_json::from_str(body) {
        return Ok(value);
    }

    Ok(serde_json::from_str(&repair(body))?)
}

/// Slice from the first `{` or `[`, whichever opens earlier, to its last closer
fn extract_body(text: &str) -> &str {
    let start = match (text.find('{'), text.find('[')) {
        (Some(brace), Some(bracket)) => brace.min(bracket),
        (Some(start), None) | (None, Some(start)) => start,
        (None, None) => return text.trim(),
    };
    let close = if text[start..].starts_with('[') { ']' } else { '}' };

    match text.rfind(close) {
        Some(end) if end > start => &text[start..=end],
        _ => &text[start..],
    }
}

fn repair(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut out = String::with_capacity(input.len() + 16);
    let mut i = 0;

    while i < len {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                i = copy_string(&chars, i, &mut out);
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < len && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < len && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(len);
            }
            ',' => {
                match next_significant(&chars, i + 1) {
                    Some('}') | Some(']') | None => {}
                    _ => out.push(','),
                }
                i += 1;
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                while i < len
                    && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '.' | '+' | '-'))
                {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < len && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '$')) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();

                if next_significant(&chars, i) == Some(':') {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    match word.as_str() {
                        "true" | "True" => out.push_str("true"),
                        "false" | "False" => out.push_str("false"),
                        "null" | "None" | "undefined" => out.push_str("null"),
                        _ => out.push_str(&word),
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Copy a single- or double-quoted string starting at `start` as a strict
/// JSON string. Returns the index just past the closing quote.
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    let len = chars.len();
    let mut i = start + 1;
    out.push('"');

    while i < len {
        let c = chars[i];
        match c {
            '\\' => match chars.get(i + 1) {
                Some('\'') if quote == '\'' => {
                    out.push('\'');
                    i += 2;
                }
                Some(&next) if matches!(next, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u') => {
                    out.push('\\');
                    out.push(next);
                    i += 2;
                }
                _ => {
                    out.push_str("\\\\");
                    i += 1;
                }
            },
            c if c == quote => {
                out.push('"');
                return i + 1;
            }
            '"' => {
                out.push_str("\\\"");
                i += 1;
            }
            '\n' => {
                out.push_str("\\n");
                i += 1;
            }
            '\r' => {
                out.push_str("\\r");
                i += 1;
            }
            '\t' => {
                out.push_str("\\t");
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    // Unterminated string: close it so the parser reports something useful
    out.push('"');
    len
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from.min(chars.len())..]
        .iter()
        .copied()
        .find(|c| !c.is_whitespace())
}
