use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::ledger::domain::transactions::TransactionCursor;

/// A transaction cursor in the opaque form handed to clients.
///
/// The encoded value is the URL-safe base64 of `<created_at>|<id>`.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedTransactionCursor(pub TransactionCursor);

#[derive(Debug, Error, PartialEq)]
#[error("invalid transaction cursor")]
pub struct InvalidCursor;

impl EncodedTransactionCursor {
    pub fn encode(&self) -> String {
        let raw = format!(
            "{}|{}",
            self.0.before_created_at.to_rfc3339(),
            self.0.before_id
        );

        base64::encode_config(raw, base64::URL_SAFE_NO_PAD)
    }

    pub fn decode(encoded: &str) -> Result<Self, InvalidCursor> {
        let bytes =
            base64::decode_config(encoded, base64::URL_SAFE_NO_PAD).map_err(|_| InvalidCursor)?;
        let raw = String::from_utf8(bytes).map_err(|_| InvalidCursor)?;

        let (created_at, id) = raw.split_once('|').ok_or(InvalidCursor)?;

        Ok(Self(TransactionCursor {
            before_created_at: DateTime::parse_from_rfc3339(created_at)
                .map_err(|_| InvalidCursor)?
                .with_timezone(&Utc),
            before_id: id.parse().map_err(|_| InvalidCursor)?,
        }))
    }
}

impl From<TransactionCursor> for EncodedTransactionCursor {
    fn from(cursor: TransactionCursor) -> Self {
        Self(cursor)
    }
}

impl Serialize for EncodedTransactionCursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn decodes_what_it_encodes() {
        let cursor = EncodedTransactionCursor(TransactionCursor {
            before_created_at: Utc.timestamp_nanos(1_650_000_000_123_456_789),
            before_id: 42,
        });

        let encoded = cursor.encode();

        assert!(!encoded.contains('='));
        assert_eq!(Ok(cursor), EncodedTransactionCursor::decode(&encoded));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!("invalid transaction cursor", InvalidCursor.to_string());
        assert_eq!(
            Err(InvalidCursor),
            EncodedTransactionCursor::decode("not a cursor")
        );
        assert_eq!(
            Err(InvalidCursor),
            EncodedTransactionCursor::decode(&base64::encode_config(
                "yesterday|1",
                base64::URL_SAFE_NO_PAD
            ))
        );
    }
}
