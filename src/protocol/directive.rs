//! Directive definitions
//!
//! The verbs sent to the instrument and the request line built from them.

use std::fmt;

use crate::error::Result;

use super::codec::encode_into;
use super::name::ParameterName;
use super::value::Value;

/// Wire-level verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// `(exec 'NAME ARG...)` - run a command
    Exec,

    /// `(param-set! 'NAME VALUE)` - write a parameter
    ParamSet,

    /// `(param-ref 'NAME)` - read a parameter
    ParamRef,

    /// `(quit)` - end the session
    Quit,
}

impl Directive {
    /// The tag written after the opening parenthesis
    pub fn tag(&self) -> &'static str {
        match self {
            Directive::Exec => "exec",
            Directive::ParamSet => "param-set!",
            Directive::ParamRef => "param-ref",
            Directive::Quit => "quit",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Build one request line, newline included
///
/// Format: `(` tag ` '` name (` ` arg)* `)` `\n`. A `None` name gives the
/// bare form used by `quit`.
pub fn request_line(
    directive: Directive,
    name: Option<&ParameterName>,
    args: &[Value],
) -> Result<Vec<u8>> {
    let mut line = Vec::with_capacity(64);
    line.push(b'(');
    line.extend_from_slice(directive.tag().as_bytes());

    if let Some(name) = name {
        line.extend_from_slice(b" '");
        line.extend_from_slice(name.as_bytes());
    }

    for arg in args {
        line.push(b' ');
        encode_into(arg, &mut line)?;
    }

    line.extend_from_slice(b")\n");
    Ok(line)
}
