//! Twelve-byte record identifiers rendered as 24 lowercase hex characters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Sqlite, Type};
use thiserror::Error;
use uuid::{NoContext, Timestamp, Uuid};

/// Identifier for a stored record.
///
/// The leading six bytes carry a millisecond timestamp, so ids generated later sort later.
/// Stored as TEXT in its hex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is not a valid object id")]
pub struct ParseObjectIdError(pub String);

impl ObjectId {
    pub const LEN: usize = 12;

    /// Generate a fresh id from a UUID v7.
    pub fn new() -> Self {
        let uuid = Uuid::new_v7(Timestamp::now(NoContext));
        let mut bytes = [0u8; Self::LEN];
        bytes.copy_from_slice(&uuid.as_bytes()[..Self::LEN]);
        Self(bytes)
    }

    /// Returns true when `value` is exactly 24 hex characters.
    pub fn is_valid(value: &str) -> bool {
        value.parse::<Self>().is_ok()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; Self::LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ParseObjectIdError(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Type<Sqlite> for ObjectId {
    fn type_info() -> SqliteTypeInfo {
        <str as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <str as Type<Sqlite>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Sqlite> for ObjectId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<SqliteArgumentValue<'q>>,
    ) -> Result<IsNull, BoxDynError> {
        <String as Encode<'q, Sqlite>>::encode(self.to_string(), buf)
    }
}

impl<'r> Decode<'r, Sqlite> for ObjectId {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let text = <&str as Decode<'r, Sqlite>>::decode(value)?;
        Ok(text.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_then_parse_yields_same_id() {
        let id = ObjectId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 24);
        assert_eq!(text.parse::<ObjectId>().unwrap(), id);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!("1".parse::<ObjectId>().is_err());
        assert!("zzzzzzzzzzzzzzzzzzzzzzzz".parse::<ObjectId>().is_err());
        assert!("0123456789abcdef012345678".parse::<ObjectId>().is_err());
        assert!("0123456789abcdef0123456789".parse::<ObjectId>().is_err());
        assert!(!ObjectId::is_valid(""));
    }

    #[test]
    fn accepts_uppercase_hex() {
        let id: ObjectId = "0123456789ABCDEF01234567".parse().unwrap();
        assert_eq!(id.to_string(), "0123456789abcdef01234567");
    }

    #[test]
    fn later_ids_sort_after_earlier_ones() {
        let first = ObjectId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = ObjectId::new();
        assert!(second > first);
    }

    #[test]
    fn serializes_as_hex_string() {
        let id: ObjectId = "5f1d7c2e9b1e8a0012345678".parse().unwrap();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::json!("5f1d7c2e9b1e8a0012345678"));
    }
}
