//! Order identifier newtype.
//!
//! Orders are keyed by an opaque string assigned by the producer. The
//! wrapper keeps identifiers from being mixed up with the many other string
//! fields on an order (track numbers, transaction ids, rids).

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OrderUid`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderUidError {
    /// The input is empty or only whitespace.
    #[error("order_uid cannot be empty")]
    Empty,
    /// The input does not fit the `order_uid` column.
    #[error("order_uid must be at most {max} characters (got {len})")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length of the input.
        len: usize,
    },
}

/// Unique, immutable identifier of an order.
///
/// Deserialization is deliberately lenient (any string, including the empty
/// one) so that a payload with a bad identifier still decodes and can be
/// rejected by [`Order::validate`](crate::Order::validate) with a precise
/// reason. Use [`OrderUid::parse`] for untrusted input such as URL paths.
///
/// ## Examples
///
/// ```
/// use order_stream_core::OrderUid;
///
/// assert!(OrderUid::parse("b563feb7b2b84b6test").is_ok());
/// assert!(OrderUid::parse("").is_err());
/// assert!(OrderUid::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderUid(String);

impl OrderUid {
    /// Maximum length of an identifier (width of the `order_uid` columns).
    pub const MAX_LENGTH: usize = 255;

    /// Parse and validate an identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is blank or longer than
    /// [`Self::MAX_LENGTH`] characters.
    pub fn parse(s: &str) -> Result<Self, OrderUidError> {
        let uid = Self(s.to_owned());
        uid.check()?;
        Ok(uid)
    }

    /// Validate an identifier that was constructed without checks.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::parse`].
    pub fn check(&self) -> Result<(), OrderUidError> {
        if self.0.trim().is_empty() {
            return Err(OrderUidError::Empty);
        }

        let len = self.0.chars().count();
        if len > Self::MAX_LENGTH {
            return Err(OrderUidError::TooLong {
                max: Self::MAX_LENGTH,
                len,
            });
        }

        Ok(())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OrderUid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderUid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderUid {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<OrderUid> for String {
    fn from(uid: OrderUid) -> Self {
        uid.0
    }
}

#[cfg(feature = "postgres")]
impl ::sqlx::Type<::sqlx::Postgres> for OrderUid {
    fn type_info() -> ::sqlx::postgres::PgTypeInfo {
        <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
        <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for OrderUid {
    fn decode(
        value: ::sqlx::postgres::PgValueRef<'r>,
    ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
        let uid = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
        Ok(Self(uid))
    }
}

#[cfg(feature = "postgres")]
impl ::sqlx::Encode<'_, ::sqlx::Postgres> for OrderUid {
    fn encode_by_ref(
        &self,
        buf: &mut ::sqlx::postgres::PgArgumentBuffer,
    ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
        <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_whitespace() {
        assert_eq!(OrderUid::parse(" \t\n"), Err(OrderUidError::Empty));
    }

    #[test]
    fn test_parse_length_limit_counts_chars() {
        let at_limit = "ж".repeat(OrderUid::MAX_LENGTH);
        assert!(OrderUid::parse(&at_limit).is_ok());

        let over = "a".repeat(OrderUid::MAX_LENGTH + 1);
        assert_eq!(
            OrderUid::parse(&over),
            Err(OrderUidError::TooLong {
                max: OrderUid::MAX_LENGTH,
                len: OrderUid::MAX_LENGTH + 1,
            })
        );
    }

    #[test]
    fn test_deserialize_is_lenient() {
        let uid: OrderUid = serde_json::from_str("\"\"").expect("valid json string");
        assert_eq!(uid.as_str(), "");
        assert!(uid.check().is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let uid = OrderUid::from("A1");
        assert_eq!(serde_json::to_string(&uid).expect("serializable"), "\"A1\"");
        assert_eq!(uid.to_string(), "A1");
    }
}
