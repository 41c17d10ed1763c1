// ABOUTME: Validated production slot identifier.
// ABOUTME: Slot names follow RFC 1123 label requirements so they are safe as path segments.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlotNameError {
    #[error("slot name cannot be empty")]
    Empty,

    #[error("slot name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("slot name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("slot name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("slot name must be lowercase")]
    NotLowercase,

    #[error("invalid character in slot name: '{0}'")]
    InvalidChar(char),
}

/// The name of a production slot: the single pointer to "what is serving".
///
/// One slot corresponds to one serving process; deployments to the same
/// slot are serialized, deployments to different slots are independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotName(String);

impl SlotName {
    pub fn new(value: &str) -> Result<Self, SlotNameError> {
        if value.is_empty() {
            return Err(SlotNameError::Empty);
        }

        if value.len() > 63 {
            return Err(SlotNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(SlotNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(SlotNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(SlotNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(SlotNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
