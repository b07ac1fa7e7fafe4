//! Row decoder: turns a stored coverage blob into structured JSON.

use serde_json::Value;
use tracing::debug;

use crate::error::DecodeError;

/// Decode a serialized coverage blob (e.g. `{"1":1,"2":0}`).
///
/// A NULL blob is an error, like a malformed one.
pub fn decode_coverage(blob: Option<&str>) -> Result<Value, DecodeError> {
    let raw = blob.ok_or(DecodeError::Missing)?;
    let value = serde_json::from_str(raw).map_err(|e| {
        debug!(error = %e, len = raw.len(), "Coverage blob failed to decode");
        DecodeError::Malformed(e)
    })?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_line_hits() {
        let value = decode_coverage(Some(r#"{"1":1,"2":0}"#)).unwrap();
        assert_eq!(value["1"], 1);
        assert_eq!(value["2"], 0);
    }

    #[test]
    fn missing_blob_is_an_error() {
        assert!(matches!(decode_coverage(None), Err(DecodeError::Missing)));
    }

    #[test]
    fn truncated_blob_is_malformed() {
        assert!(matches!(
            decode_coverage(Some(r#"{"1":1,"#)),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn re_encoding_is_idempotent() {
        let first = decode_coverage(Some(r#"{ "10": 3, "11": 0, "12": [1, 2] }"#)).unwrap();
        let encoded = serde_json::to_string(&first).unwrap();
        let second = decode_coverage(Some(&encoded)).unwrap();
        assert_eq!(first, second);
    }
}
