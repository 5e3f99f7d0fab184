//! Literal property values.
//!
//! Two string values are reserved as sentinels by every writer of the store:
//! `""` leaves the stored property untouched and `"-"` removes it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal (non-relation) property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    String(String),
}

/// Sentinel meaning carried by a reserved literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// `""`: keep whatever is stored.
    Keep,
    /// `"-"`: delete the stored property.
    Remove,
}

impl Scalar {
    /// Returns the sentinel this value stands for, if any.
    #[must_use]
    pub fn sentinel(&self) -> Option<Sentinel> {
        match self {
            Self::String(s) if s.is_empty() => Some(Sentinel::Keep),
            Self::String(s) if s == "-" => Some(Sentinel::Remove),
            _ => None,
        }
    }

    /// Compares two values the way the dirty latch does.
    ///
    /// Strings are equal when they only differ in leading, trailing or
    /// repeated whitespace. Other variants compare exactly.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => squash_whitespace(a) == squash_whitespace(b),
            _ => self == other,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
