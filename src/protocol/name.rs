//! Parameter names
//!
//! Every name accepted from a caller goes through [`canonicalize`] before it
//! is sent to the instrument or used as a lookup key.

use std::fmt;
use std::str::FromStr;

use crate::error::{DlcError, Result};

/// Canonical, ASCII-only parameter identifier
///
/// Leading whitespace is trimmed, as is any trailing run of whitespace and
/// `:` characters, so `"laser1:dl:cc:current-set: "` and
/// `"laser1:dl:cc:current-set"` are the same parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct ParameterName(String);

impl ParameterName {
    /// Canonicalize a raw name given as text or bytes
    pub fn new(raw: impl AsRef<[u8]>) -> Result<Self> {
        let raw = raw.as_ref();
        if !raw.is_ascii() {
            return Err(DlcError::InvalidParameterName(format!(
                "'{}' is not ASCII",
                String::from_utf8_lossy(raw)
            )));
        }

        let start = raw
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(raw.len());
        let end = raw
            .iter()
            .rposition(|b| !b.is_ascii_whitespace() && *b != b':')
            .map_or(start, |i| i + 1)
            .max(start);

        let canonical = &raw[start..end];
        if canonical.is_empty() {
            return Err(DlcError::InvalidParameterName(format!(
                "'{}' is empty after canonicalization",
                String::from_utf8_lossy(raw)
            )));
        }

        // ASCII was checked above
        Ok(Self(String::from_utf8_lossy(canonical).into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Convert a raw parameter name to its canonical form
pub fn canonicalize(raw: impl AsRef<[u8]>) -> Result<ParameterName> {
    ParameterName::new(raw)
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<[u8]> for ParameterName {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<str> for ParameterName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ParameterName {
    type Err = DlcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ParameterName {
    type Error = DlcError;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ParameterName {
    type Error = DlcError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<ParameterName> for String {
    fn from(name: ParameterName) -> Self {
        name.0
    }
}
