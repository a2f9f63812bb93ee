//! Frame encoding and reply decoding.
//!
//! # Format
//!
//! Outbound frames are JSON arrays led by the sequence id and the
//! operation name:
//!
//! ```json
//! [0, "get_track_volume", "track-1"]
//! ```
//!
//! Inbound frames echo the id and carry the result, or nothing for a bare
//! acknowledgement:
//!
//! ```json
//! [0, -3.5]
//! [4]
//! ```
//!
//! A string result starting with [`ERROR_MARKER`] reports a host failure.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value as JsonValue, from_str};

use crate::error::{Error, Result};
use crate::identifiers::SequenceId;

use super::Value;

// ============================================================================
// Constants
// ============================================================================

/// Prefix of a string result that reports a host-side failure.
pub const ERROR_MARKER: &str = "error:";

// ============================================================================
// Frame
// ============================================================================

/// An encoded outbound frame, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Sequence id the frame was encoded with.
    pub id: SequenceId,
    /// Serialized JSON text.
    pub text: String,
}

impl Frame {
    /// Encodes `[id, operation, ...args]`.
    #[must_use]
    pub fn encode(id: SequenceId, operation: &str, args: &[Value]) -> Self {
        let mut items = Vec::with_capacity(args.len() + 2);
        items.push(JsonValue::from(id.as_u64()));
        items.push(JsonValue::from(operation));
        items.extend(args.iter().map(Value::to_wire));

        Self {
            id,
            text: JsonValue::Array(items).to_string(),
        }
    }
}

// ============================================================================
// Reply
// ============================================================================

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Echoed sequence id.
    pub id: SequenceId,
    /// Result, absent for a bare acknowledgement.
    pub result: Option<Value>,
}

impl Reply {
    /// Decodes `[id]` or `[id, result]`.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not JSON
    /// - [`Error::Protocol`] if the JSON is not a reply frame
    pub fn decode(text: &str) -> Result<Self> {
        let json: JsonValue = from_str(text)?;

        let JsonValue::Array(mut items) = json else {
            return Err(Error::protocol("reply is not an array"));
        };

        if items.is_empty() || items.len() > 2 {
            return Err(Error::protocol(format!(
                "reply has {} elements, expected 1 or 2",
                items.len()
            )));
        }

        let result = if items.len() == 2 {
            items.pop().map(Value::from_wire)
        } else {
            None
        };

        let id = items[0]
            .as_u64()
            .map(SequenceId::new)
            .ok_or_else(|| Error::protocol(format!("invalid reply id: {}", items[0])))?;

        Ok(Self { id, result })
    }

    /// Returns `true` if the result carries the error marker.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(&self.result, Some(Value::String(s)) if s.starts_with(ERROR_MARKER))
    }

    /// Converts into the caller-facing outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] with the text after the marker if the host
    /// reported a failure.
    pub fn into_outcome(self) -> Result<Option<Value>> {
        match self.result {
            Some(Value::String(s)) if s.starts_with(ERROR_MARKER) => {
                Err(Error::remote(&s[ERROR_MARKER.len()..]))
            }
            result => Ok(result),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn round_trip(value: Value) -> Option<Value> {
        // Reuse the outbound encoding for an inbound frame shape.
        let frame = Frame::encode(SequenceId::new(1), "op", &[value]);
        let json: JsonValue = from_str(&frame.text).expect("valid json");
        let reply_text = JsonValue::Array(vec![json[0].clone(), json[2].clone()]).to_string();
        Reply::decode(&reply_text).expect("decode").result
    }

    #[test]
    fn test_encode_frame() {
        let frame = Frame::encode(SequenceId::new(0), "get_volume", &[Value::from("track-1")]);
        assert_eq!(frame.text, r#"[0,"get_volume","track-1"]"#);
        assert_eq!(frame.id, SequenceId::new(0));
    }

    #[test]
    fn test_encode_without_args() {
        let frame = Frame::encode(SequenceId::new(12), "get_tracks", &[]);
        assert_eq!(frame.text, r#"[12,"get_tracks"]"#);
    }

    #[test]
    fn test_encode_escapes_infinity() {
        let frame = Frame::encode(
            SequenceId::new(3),
            "set_parameter_value",
            &[Value::from("p"), Value::Float(f64::NEG_INFINITY)],
        );
        let json: JsonValue = from_str(&frame.text).expect("valid json");
        assert_eq!(json[3].as_f64(), Some(-f64::MAX));
    }

    #[test]
    fn test_decode_result() {
        let reply = Reply::decode("[0,-3.5]").expect("decode");
        assert_eq!(reply.id, SequenceId::new(0));
        assert_eq!(reply.result, Some(Value::Float(-3.5)));
    }

    #[test]
    fn test_decode_void_ack() {
        let reply = Reply::decode("[7]").expect("decode");
        assert_eq!(reply.id, SequenceId::new(7));
        assert_eq!(reply.result, None);
        assert!(matches!(reply.into_outcome(), Ok(None)));
    }

    #[test]
    fn test_decode_null_result_is_not_void() {
        let reply = Reply::decode("[7,null]").expect("decode");
        assert_eq!(reply.result, Some(Value::Null));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(matches!(Reply::decode("not json"), Err(Error::Json(_))));
        assert!(matches!(Reply::decode("{}"), Err(Error::Protocol { .. })));
        assert!(matches!(Reply::decode("[]"), Err(Error::Protocol { .. })));
        assert!(matches!(Reply::decode("[1,2,3]"), Err(Error::Protocol { .. })));
        assert!(matches!(Reply::decode("[-1,2]"), Err(Error::Protocol { .. })));
        assert!(matches!(Reply::decode(r#"["a",2]"#), Err(Error::Protocol { .. })));
    }

    #[test]
    fn test_error_marker() {
        let reply = Reply::decode(r#"[2,"error:disk full"]"#).expect("decode");
        assert!(reply.is_error());

        let err = reply.into_outcome().unwrap_err();
        assert_eq!(err.remote_message(), Some("disk full"));
    }

    #[test]
    fn test_error_marker_empty_message() {
        let err = Reply::decode(r#"[2,"error:"]"#)
            .expect("decode")
            .into_outcome()
            .unwrap_err();
        assert_eq!(err.remote_message(), Some(""));
    }

    #[test]
    fn test_plain_string_is_success() {
        let reply = Reply::decode(r#"[2,"Master"]"#).expect("decode");
        assert!(!reply.is_error());
        assert_eq!(reply.into_outcome().expect("ok"), Some(Value::from("Master")));
    }

    #[test]
    fn test_infinity_round_trip() {
        assert_eq!(round_trip(Value::Float(f64::INFINITY)), Some(Value::Float(f64::INFINITY)));
        assert_eq!(
            round_trip(Value::Float(f64::NEG_INFINITY)),
            Some(Value::Float(f64::NEG_INFINITY))
        );
        assert_eq!(round_trip(Value::Float(42.5)), Some(Value::Float(42.5)));
    }

    proptest! {
        #[test]
        fn prop_finite_floats_round_trip(x in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            prop_assume!(x.abs() != f64::MAX);
            prop_assert_eq!(round_trip(Value::Float(x)), Some(Value::Float(x)));
        }

        #[test]
        fn prop_integers_round_trip(i in any::<i64>()) {
            prop_assert_eq!(round_trip(Value::Integer(i)), Some(Value::Integer(i)));
        }

        #[test]
        fn prop_decode_never_panics(text in ".{0,64}") {
            let _ = Reply::decode(&text);
        }
    }
}
