//! Account and session identifiers.
//!
//! `AccountId` is the normalized messaging account number supplied by the
//! caller; `SessionId` keys the registry and stays unique across repeated
//! pairing attempts for the same account.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// Normalized account identifier: 10-15 ASCII digits, no leading zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Validate and wrap a raw account identifier.
    pub fn parse(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        let reason = if !(10..=15).contains(&value.len()) {
            Some("must be 10 to 15 characters long")
        } else if !value.bytes().all(|b| b.is_ascii_digit()) {
            Some("must contain only digits")
        } else if value.starts_with('0') {
            Some("must not start with a leading zero")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(CoreError::InvalidAccount {
                value,
                reason: reason.to_string(),
            }),
            None => Ok(AccountId(value)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountId::parse(s)
    }
}

// Deserialization goes through `parse` so an invalid identifier can never
// enter the system from a wire payload.
impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        AccountId::parse(raw).map_err(serde::de::Error::custom)
    }
}

/// Opaque registry key for one linking attempt.
///
/// Combines the account digits with a high-resolution timestamp, so a
/// repeated pairing attempt for the same account never reuses an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh id for the given account.
    pub fn generate(account: &AccountId) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        SessionId(format!("{}-{}", account.as_str(), nanos))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SessionId(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn accepts_valid_account_numbers() {
        for value in ["2348140825959", "1234567890", "123456789012345"] {
            let account = AccountId::parse(value).expect("should be valid");
            assert_eq!(account.as_str(), value);
        }
    }

    #[test]
    fn rejects_leading_zero() {
        let err = AccountId::parse("0348140825959").unwrap_err();
        assert!(matches!(err, CoreError::InvalidAccount { .. }));
    }

    #[test]
    fn rejects_bad_length_and_non_digits() {
        assert!(AccountId::parse("123456789").is_err());
        assert!(AccountId::parse("1234567890123456").is_err());
        assert!(AccountId::parse("12345abc90").is_err());
        assert!(AccountId::parse("+2348140825959").is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<AccountId, _> = serde_json::from_str("\"2348140825959\"");
        assert!(ok.is_ok());
        let bad: Result<AccountId, _> = serde_json::from_str("\"0123\"");
        assert!(bad.is_err());
    }

    #[test]
    fn session_ids_are_unique_per_attempt() {
        let account = AccountId::parse("2348140825959").expect("valid account");
        let a = SessionId::generate(&account);
        let b = SessionId::generate(&account);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("2348140825959-"));
    }
}
