//! Object identifiers.
//!
//! Objects are addressed by a ULID: 26 characters of Crockford base32 where
//! the first character is limited to `0-7` (the top three bits of a 128-bit
//! value). Validation is case-insensitive. Generation and decoding go through
//! the `ulid` crate; the pattern rejects the alias letters it would accept.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

static OBJECT_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[0-7][0-9A-HJKMNP-TV-Z]{25}$").expect("valid regex"));

/// Canonical object identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Generate a new time-ordered id.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Whether `s` has the canonical id format.
    pub fn is_valid(s: &str) -> bool {
        OBJECT_ID_PATTERN.is_match(s) && Ulid::from_string(s).is_ok()
    }

    /// Parse `s`, returning `None` when it is not a canonical id.
    pub fn parse(s: &str) -> Option<Self> {
        Self::is_valid(s).then(|| Self(s.to_owned()))
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn generated_ids_are_valid() {
        let id = ObjectId::new();
        assert_eq!(id.as_str().len(), 26);
        assert!(ObjectId::is_valid(id.as_str()), "{id}");
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(ObjectId::new(), ObjectId::new());
    }

    #[test]
    fn accepts_lowercase() {
        assert!(ObjectId::is_valid("01arz3ndektsv4rrffq69g5fav"));
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(!ObjectId::is_valid(""));
        assert!(!ObjectId::is_valid("not-an-id"));
        // Too short.
        assert!(!ObjectId::is_valid("01ARZ3NDEKTSV4RRFFQ69G5FA"));
        // First char out of range.
        assert!(!ObjectId::is_valid("81ARZ3NDEKTSV4RRFFQ69G5FAV"));
        // Excluded letters.
        assert!(!ObjectId::is_valid("01ARZ3NDEKTSV4RRFFQ69G5FAU"));
        assert!(!ObjectId::is_valid("01ARZ3NDEKTSV4RRFFQ69G5FAI"));
    }

    #[test]
    fn parse_returns_none_for_invalid() {
        assert!(ObjectId::parse("nope").is_none());
        assert_eq!(
            ObjectId::parse("01ARZ3NDEKTSV4RRFFQ69G5FAV").map(|id| id.to_string()),
            Some("01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string())
        );
    }

    proptest! {
        #[test]
        fn every_ulid_value_validates(value in any::<u128>()) {
            let id = Ulid(value).to_string();
            prop_assert!(ObjectId::is_valid(&id), "{}", id);
            prop_assert!(ObjectId::is_valid(&id.to_lowercase()));
        }
    }
}
