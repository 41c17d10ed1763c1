// ABOUTME: Store-relative path newtype used to address objects in the store.
// ABOUTME: Validates segments so paths cannot escape the store root.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorePathError {
    #[error("store path cannot be empty")]
    Empty,

    #[error("store path cannot be absolute: {0}")]
    Absolute(String),

    #[error("store path segment cannot be '.' or '..': {0}")]
    Traversal(String),

    #[error("invalid character in store path: '{0}'")]
    InvalidChar(char),
}

/// A relative path addressing one object inside the storage collaborator.
///
/// Paths are `/`-separated and validated on construction: no absolute
/// paths, no `.`/`..` segments, and a conservative character set, so a
/// `StorePath` is always safe to join under the store root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StorePath(String);

impl StorePath {
    pub fn parse(input: &str) -> Result<Self, StorePathError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(StorePathError::Empty);
        }

        if input.starts_with('/') {
            return Err(StorePathError::Absolute(input.to_string()));
        }

        for segment in input.split('/') {
            if segment == "." || segment == ".." {
                return Err(StorePathError::Traversal(input.to_string()));
            }
            if segment.is_empty() {
                return Err(StorePathError::Empty);
            }
            for c in segment.chars() {
                if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
                    return Err(StorePathError::InvalidChar(c));
                }
            }
        }

        Ok(Self(input.to_string()))
    }

    /// Append a validated segment, returning a new path.
    pub fn join(&self, segment: &str) -> Result<Self, StorePathError> {
        Self::parse(&format!("{}/{}", self.0, segment))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for StorePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}
