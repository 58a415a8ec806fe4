//! Destination value object
//!
//! A destination is the cache key of the whole system: the same place typed as
//! `"Kandy"`, `"kandy "` or `"KANDY"` must resolve to one entry.
//!
//! # Examples
//!
//! ```
//! use domain::Destination;
//!
//! let d = Destination::parse("  Kandy ").unwrap();
//! assert_eq!(d.as_str(), "kandy");
//!
//! assert!(Destination::parse("   ").is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::DomainError;

/// A normalized (trimmed, lowercased) destination name
///
/// Deserialization goes through [`Destination::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Validate)]
#[serde(try_from = "String", into = "String")]
pub struct Destination {
    #[validate(length(min = 1, max = 200))]
    value: String,
}

impl Destination {
    /// Maximum accepted length in characters after trimming
    pub const MAX_LEN: usize = 200;

    /// Normalize and validate a raw destination name
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidDestination` if the name is empty after
    /// trimming or longer than [`Self::MAX_LEN`] characters.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let value = raw.as_ref().trim().to_lowercase();
        if value.is_empty() {
            return Err(DomainError::InvalidDestination(
                "destination must not be empty".to_string(),
            ));
        }

        let candidate = Self { value };
        candidate
            .validate()
            .map_err(|e| DomainError::InvalidDestination(e.to_string()))?;

        Ok(candidate)
    }

    /// Get the normalized name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Consume and return the normalized name
    #[must_use]
    pub fn into_inner(self) -> String {
        self.value
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for Destination {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl TryFrom<&str> for Destination {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Destination {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Destination> for String {
    fn from(destination: Destination) -> Self {
        destination.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_lowercases() {
        let d = Destination::parse("  New York  ").unwrap();
        assert_eq!(d.as_str(), "new york");
    }

    #[test]
    fn case_and_whitespace_variants_are_equal() {
        let a = Destination::parse("Kandy").unwrap();
        let b = Destination::parse("kandy ").unwrap();
        let c = Destination::parse("KANDY").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn rejects_empty() {
        assert!(Destination::parse("").is_err());
        assert!(Destination::parse(" \t\n").is_err());
    }

    #[test]
    fn rejects_overlong() {
        let long = "a".repeat(Destination::MAX_LEN + 1);
        let err = Destination::parse(&long).unwrap_err();
        assert!(matches!(err, DomainError::InvalidDestination(_)));
    }

    #[test]
    fn accepts_max_length() {
        let exact = "b".repeat(Destination::MAX_LEN);
        assert!(Destination::parse(&exact).is_ok());
    }

    #[test]
    fn keeps_inner_punctuation() {
        let d = Destination::parse("São Paulo, BR").unwrap();
        assert_eq!(d.as_str(), "são paulo, br");
    }

    #[test]
    fn serializes_as_plain_string() {
        let d = Destination::parse("Paris").unwrap();
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"paris\"");
    }

    #[test]
    fn deserialization_normalizes() {
        let d: Destination = serde_json::from_str("\"KANDY \"").unwrap();
        assert_eq!(d, Destination::parse("kandy").unwrap());
    }

    #[test]
    fn deserialization_rejects_blank() {
        assert!(serde_json::from_str::<Destination>("\"   \"").is_err());
    }
}
