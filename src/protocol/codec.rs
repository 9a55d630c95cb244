//! Protocol codec
//!
//! Conversion between [`Value`] and the instrument's parenthesized text.
//!
//! ## Wire Grammar
//! ```text
//! value   := boolean | number | string | list
//! boolean := "#t" | "#f"
//! number  := [-+]?digits | [-+]?digits "." digits
//! string  := '"' <any bytes except '"'> '"'
//! list    := "(" value (" " value)* ")"
//! ```
//!
//! There is no escape character. Parentheses inside a string do not count
//! towards list nesting, so `("a)b" 1 2)` is a three element list.

use crate::error::{DlcError, MalformedResponse, Result};

use super::value::{float_text, Value};

const BOOLEAN_TRUE: &[u8] = b"#t";
const BOOLEAN_FALSE: &[u8] = b"#f";

type ParseResult<T> = std::result::Result<T, MalformedResponse>;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a value to wire bytes
///
/// Fails with `UnsupportedType` for values the wire cannot carry:
/// non-finite floats and non-ASCII text.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_into(value, &mut out)?;
    Ok(out)
}

/// Encode a value, appending to `out`
///
/// Lists are walked with an explicit stack, so nesting depth is bounded only
/// by memory.
pub fn encode_into(value: &Value, out: &mut Vec<u8>) -> Result<()> {
    // (remaining items, whether the next item is the first of its list)
    let mut open: Vec<(std::slice::Iter<'_, Value>, bool)> = Vec::new();
    let mut next = Some(value);

    loop {
        match next.take() {
            Some(Value::List(items)) => {
                out.push(b'(');
                open.push((items.iter(), true));
            }
            Some(Value::Boolean(true)) => out.extend_from_slice(BOOLEAN_TRUE),
            Some(Value::Boolean(false)) => out.extend_from_slice(BOOLEAN_FALSE),
            Some(Value::Integer(i)) => out.extend_from_slice(i.to_string().as_bytes()),
            Some(Value::Float(x)) => {
                if !x.is_finite() {
                    return Err(DlcError::UnsupportedType(format!("non-finite float {}", x)));
                }
                out.extend_from_slice(float_text(*x).as_bytes());
            }
            Some(Value::Text(s)) => {
                if !s.is_ascii() {
                    return Err(DlcError::UnsupportedType(format!("non-ASCII text {:?}", s)));
                }
                out.push(b'"');
                out.extend_from_slice(s.as_bytes());
                out.push(b'"');
            }
            None => {}
        }

        let Some((items, first)) = open.last_mut() else {
            return Ok(());
        };
        match items.next() {
            Some(item) => {
                if !*first {
                    out.push(b' ');
                }
                *first = false;
                next = Some(item);
            }
            None => {
                out.push(b')');
                open.pop();
            }
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a complete reply payload into exactly one value
///
/// Single pass over the input; open lists live on an explicit stack, so any
/// nesting depth that fits in memory decodes.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    let mut values = parse_sequence(bytes)?;
    if values.len() > 1 {
        return Err(MalformedResponse::MultipleTopLevelValues(values.len()).into());
    }
    values.pop().ok_or_else(|| MalformedResponse::Empty.into())
}

/// Decode a single atom: boolean, integer, float or quoted text
///
/// Lists are not atoms; use [`decode`] for them.
pub fn parse_atom(token: &[u8]) -> Result<Value> {
    Ok(atom(token)?)
}

/// A list whose `)` has not been seen yet
struct OpenList {
    position: usize,
    items: Vec<Value>,
}

/// Parse `bytes` into the sequence of top-level values
fn parse_sequence(bytes: &[u8]) -> ParseResult<Vec<Value>> {
    let mut top = Vec::new();
    let mut open: Vec<OpenList> = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let value = match bytes[pos] {
            b if b.is_ascii_whitespace() => {
                pos += 1;
                continue;
            }
            b'(' => {
                open.push(OpenList {
                    position: pos,
                    items: Vec::new(),
                });
                pos += 1;
                continue;
            }
            b')' => {
                let list = open
                    .pop()
                    .ok_or(MalformedResponse::UnexpectedClose { position: pos })?;
                pos += 1;
                Value::List(list.items)
            }
            b'"' => {
                let end = find_string_end(bytes, pos)?;
                let value = Value::Text(text(&bytes[pos + 1..end - 1], pos)?);
                pos = end;
                value
            }
            _ => {
                let end = bytes[pos..]
                    .iter()
                    .position(|&b| b.is_ascii_whitespace() || b == b'(' || b == b')')
                    .map_or(bytes.len(), |i| pos + i);
                let value = atom(&bytes[pos..end])?;
                pos = end;
                value
            }
        };

        match open.last_mut() {
            Some(list) => list.items.push(value),
            None => top.push(value),
        }
    }

    // The outermost unclosed list is the one reported
    if let Some(list) = open.first() {
        return Err(MalformedResponse::UnterminatedList {
            position: list.position,
        });
    }
    Ok(top)
}

/// Index one past the quote closing the string opened at `start`
fn find_string_end(bytes: &[u8], start: usize) -> ParseResult<usize> {
    bytes[start + 1..]
        .iter()
        .position(|&b| b == b'"')
        .map(|i| start + 1 + i + 1)
        .ok_or(MalformedResponse::UnterminatedString { position: start })
}

fn atom(token: &[u8]) -> ParseResult<Value> {
    match token {
        BOOLEAN_TRUE => return Ok(Value::Boolean(true)),
        BOOLEAN_FALSE => return Ok(Value::Boolean(false)),
        _ => {}
    }

    if let Ok(s) = std::str::from_utf8(token) {
        if let Ok(i) = s.parse::<i64>() {
            return Ok(Value::Integer(i));
        }
        // "inf" and "NaN" parse as f64 but are not numbers on the wire
        if let Ok(x) = s.parse::<f64>() {
            if x.is_finite() {
                return Ok(Value::Float(x));
            }
        }
    }

    if token.len() >= 2 && token[0] == b'"' && token[token.len() - 1] == b'"' {
        return Ok(Value::Text(text(&token[1..token.len() - 1], 0)?));
    }

    Err(MalformedResponse::UnparsableAtom(
        String::from_utf8_lossy(token).into_owned(),
    ))
}

fn text(content: &[u8], position: usize) -> ParseResult<String> {
    String::from_utf8(content.to_vec()).map_err(|_| MalformedResponse::InvalidUtf8 { position })
}
