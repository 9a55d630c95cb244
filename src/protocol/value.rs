//! Value definitions
//!
//! Native representation of the literal forms the instrument speaks.

use std::fmt;

/// A decoded protocol value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// `#t` / `#f`
    Boolean(bool),

    /// Base-10 integer
    Integer(i64),

    /// Decimal floating point
    Float(f64),

    /// Double-quoted text
    Text(String),

    /// Parenthesized sequence, may nest
    List(Vec<Value>),
}

impl Value {
    /// The empty list `()`, the instrument's "nothing" reply
    pub fn unit() -> Self {
        Value::List(Vec::new())
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::List(items) if items.is_empty())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value widened to f64 (integers included)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
        }
    }
}

/// Decimal text of a float that always re-reads as a float
///
/// `f64`'s `Display` never switches to exponent notation, but drops the
/// fraction for whole numbers, which would decode as an integer.
pub(crate) fn float_text(x: f64) -> String {
    let mut text = x.to_string();
    if x.is_finite() && !text.contains('.') {
        text.push_str(".0");
    }
    text
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Same walk as the encoder: deep lists must not exhaust the stack
        let mut open: Vec<(std::slice::Iter<'_, Value>, bool)> = Vec::new();
        let mut next = Some(self);

        loop {
            match next.take() {
                Some(Value::List(items)) => {
                    f.write_str("(")?;
                    open.push((items.iter(), true));
                }
                Some(Value::Boolean(true)) => f.write_str("#t")?,
                Some(Value::Boolean(false)) => f.write_str("#f")?,
                Some(Value::Integer(i)) => write!(f, "{}", i)?,
                Some(Value::Float(x)) => f.write_str(&float_text(*x))?,
                Some(Value::Text(s)) => write!(f, "\"{}\"", s)?,
                None => {}
            }

            let Some((items, first)) = open.last_mut() else {
                return Ok(());
            };
            match items.next() {
                Some(item) => {
                    if !*first {
                        f.write_str(" ")?;
                    }
                    *first = false;
                    next = Some(item);
                }
                None => {
                    f.write_str(")")?;
                    open.pop();
                }
            }
        }
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        let Value::List(items) = self else {
            return;
        };
        if !items.iter().any(|item| matches!(item, Value::List(inner) if !inner.is_empty())) {
            return;
        }

        // Flatten nested lists so each one is dropped empty, without recursion
        let mut pending = std::mem::take(items);
        while let Some(mut item) = pending.pop() {
            if let Value::List(inner) = &mut item {
                pending.append(inner);
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}
