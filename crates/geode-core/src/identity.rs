//! # User Identity
//!
//! [`UserId`] is the identifier a position is keyed by. It is derived from
//! the caller's credentials on every request and is never stored on its own.
//!
//! ## Validation
//!
//! A `UserId` always holds a well-formed, non-nil UUID. Parsing accepts every
//! textual form the `uuid` crate accepts (hyphenated, simple, braced, URN).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Identifier of the authenticated caller whose position is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Uuid", into = "Uuid")]
pub struct UserId(Uuid);

impl UserId {
    /// Wrap an existing UUID, rejecting the nil UUID.
    pub fn from_uuid(id: Uuid) -> Result<Self, ValidationError> {
        if id.is_nil() {
            return Err(ValidationError::NilUserId);
        }
        Ok(Self(id))
    }

    /// Parse a textual UUID into a user identifier.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let id = Uuid::parse_str(value).map_err(|e| ValidationError::InvalidUserId {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_uuid(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Uuid> for UserId {
    type Error = ValidationError;

    fn try_from(id: Uuid) -> Result<Self, Self::Error> {
        Self::from_uuid(id)
    }
}

impl From<UserId> for Uuid {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_hyphenated_uuid() {
        let id = UserId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn parses_simple_form() {
        let id = UserId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn rejects_garbage() {
        let err = UserId::parse("not-a-uuid").unwrap_err();
        match err {
            ValidationError::InvalidUserId { value, .. } => assert_eq!(value, "not-a-uuid"),
            other => panic!("expected InvalidUserId, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_string() {
        assert!(matches!(
            UserId::parse(""),
            Err(ValidationError::InvalidUserId { .. })
        ));
    }

    #[test]
    fn rejects_nil_uuid() {
        assert_eq!(
            UserId::parse("00000000-0000-0000-0000-000000000000"),
            Err(ValidationError::NilUserId)
        );
        assert_eq!(UserId::from_uuid(Uuid::nil()), Err(ValidationError::NilUserId));
    }

    #[test]
    fn serde_rejects_nil() {
        let result: Result<UserId, _> =
            serde_json::from_str("\"00000000-0000-0000-0000-000000000000\"");
        assert!(result.is_err());
    }

    #[test]
    fn serde_is_plain_uuid_string() {
        let id = UserId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    proptest! {
        #[test]
        fn any_non_nil_uuid_parses_back(bits in 1u128..) {
            let uuid = Uuid::from_u128(bits);
            let id = UserId::parse(&uuid.to_string()).unwrap();
            prop_assert_eq!(id.as_uuid(), &uuid);
        }
    }
}
