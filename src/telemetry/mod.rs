// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Payload decoding for AqaraHub attribute reports.
//!
//! AqaraHub publishes three payload shapes:
//!
//! - a bare literal, e.g. `18` on `<root>/<device>/linkquality`
//! - a typed value, e.g. `{"type":"int16","value":2128}`
//! - a read-attributes response, e.g.
//!   `{"success":{"type":"string","value":"lumi.weather"}}`
//!
//! The typed value may itself be a bitmap (`[true,false,...]`) or the Xiaomi
//! `0xFF01` block, a map whose entries are typed values again.
//!
//! # Examples
//!
//! ```
//! use aqara_bridge::telemetry::{DecodedValue, decode};
//!
//! let value = decode(br#"{"type":"int16","value":2128}"#).unwrap();
//! assert_eq!(value, DecodedValue::Number(2128.0));
//!
//! let value = decode(b"18").unwrap();
//! assert_eq!(value.as_number(), Some(18.0));
//! ```

pub mod attribute;

pub use attribute::{AttributeRule, AttributeTable, Setter, Transform, TransformedValue};

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::PayloadError;

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    /// Any numeric value, integer or float.
    Number(f64),
    /// A boolean value.
    Bool(bool),
    /// A bitmap; index 0 is the lowest-order flag.
    Bitmap(Vec<bool>),
    /// A map of nested typed values (the vendor aggregated block).
    KeyedMap(BTreeMap<String, DecodedValue>),
    /// A string value, such as a model identifier.
    Text(String),
    /// A vendor block entry that did not decode, kept as received.
    Undecoded(Value),
}

impl DecodedValue {
    /// Returns a short name of the variant, for diagnostics.
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Bitmap(_) => "bitmap",
            Self::KeyedMap(_) => "keyed map",
            Self::Text(_) => "text",
            Self::Undecoded(_) => "undecoded",
        }
    }

    /// Returns the numeric value, if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string value, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the nested entries, if this is a keyed map.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, DecodedValue>> {
        match self {
            Self::KeyedMap(map) => Some(map),
            _ => None,
        }
    }
}

/// The `{type, value}` envelope, optionally wrapped in `success`.
///
/// Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    success: Option<Box<Envelope>>,
}

impl Envelope {
    /// Unwraps `success` framing down to the innermost value.
    fn into_value(self) -> Result<Value, PayloadError> {
        match (self.value, self.success) {
            (Some(value), _) => Ok(value),
            (None, Some(inner)) => inner.into_value(),
            (None, None) => Err(PayloadError::MissingValue),
        }
    }
}

/// Decodes a raw payload.
///
/// # Errors
///
/// Returns [`PayloadError`] if the payload is not JSON, if a keyed payload has
/// no `value`, or if the value cannot be represented as a [`DecodedValue`].
pub fn decode(raw: impl AsRef<[u8]>) -> Result<DecodedValue, PayloadError> {
    let root: Value = serde_json::from_slice(raw.as_ref())?;
    match root {
        Value::Object(_) => decode_typed(root),
        literal => convert(literal),
    }
}

/// Decodes a payload that must be a number, e.g. a link-quality report.
///
/// # Errors
///
/// Returns [`PayloadError::UnexpectedShape`] if the payload decodes to
/// anything other than a number.
pub fn decode_number(raw: impl AsRef<[u8]>) -> Result<f64, PayloadError> {
    let value = decode(raw)?;
    value.as_number().ok_or(PayloadError::UnexpectedShape {
        expected: "number",
        found: value.shape(),
    })
}

fn decode_typed(object: Value) -> Result<DecodedValue, PayloadError> {
    let envelope: Envelope = serde_json::from_value(object)?;
    if let Some(kind) = envelope.kind.as_deref() {
        tracing::trace!(kind = %kind, "Decoding typed value");
    }
    convert(envelope.into_value()?)
}

fn convert(value: Value) -> Result<DecodedValue, PayloadError> {
    match value {
        Value::Null => Err(PayloadError::MissingValue),
        Value::Bool(b) => Ok(DecodedValue::Bool(b)),
        Value::Number(n) => n
            .as_f64()
            .map(DecodedValue::Number)
            .ok_or_else(|| PayloadError::InvalidValue(n.to_string())),
        Value::String(s) => Ok(DecodedValue::Text(s)),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Bool(bit) => Ok(bit),
                other => Err(PayloadError::InvalidValue(format!(
                    "bitmap element {other} is not a bool"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(DecodedValue::Bitmap),
        Value::Object(entries) => Ok(DecodedValue::KeyedMap(
            entries
                .into_iter()
                .map(|(key, entry)| {
                    let decoded = decode_entry(&key, entry);
                    (key, decoded)
                })
                .collect(),
        )),
    }
}

/// Decodes one keyed map entry.
///
/// An entry that fails to decode is kept as [`DecodedValue::Undecoded`], so
/// only the rule that reads it can reject it.
fn decode_entry(key: &str, entry: Value) -> DecodedValue {
    let raw = entry.clone();
    let decoded = match entry {
        Value::Object(_) => decode_typed(entry),
        literal => convert(literal),
    };
    decoded.unwrap_or_else(|e| {
        tracing::trace!(key = %key, error = %e, "Keeping undecoded map entry");
        DecodedValue::Undecoded(raw)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const XIAOMI_BLOCK: &str = r#"{"type":"xiaomi_ff01","value":{
        "1":{"type":"uint16","value":3005},
        "10":{"type":"uint16","value":0},
        "100":{"type":"int16","value":2206},
        "101":{"type":"uint16","value":5527},
        "102":{"type":"int32","value":102982},
        "4":{"type":"uint16","value":17320},
        "5":{"type":"uint16","value":6},
        "6":{"type":"uint40","value":1}
    }}"#;

    #[test]
    fn bare_number() {
        assert_eq!(decode("18").unwrap(), DecodedValue::Number(18.0));
        assert_eq!(decode_number("-3.5").unwrap(), -3.5);
    }

    #[test]
    fn typed_number() {
        let value = decode(r#"{"type":"int16","value":2128}"#).unwrap();
        assert_eq!(value, DecodedValue::Number(2128.0));
    }

    #[test]
    fn typed_bool() {
        let value = decode(r#"{"type":"bool","value":true}"#).unwrap();
        assert_eq!(value, DecodedValue::Bool(true));
    }

    #[test]
    fn typed_bitmap() {
        let value = decode(r#"{"type":"bitmap8","value":[true,false,false]}"#).unwrap();
        assert_eq!(value, DecodedValue::Bitmap(vec![true, false, false]));
    }

    #[test]
    fn typed_string() {
        let value = decode(r#"{"type":"string","value":"lumi.weather"}"#).unwrap();
        assert_eq!(value.as_text(), Some("lumi.weather"));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let value = decode(r#"{"type":"uint8","value":4,"extra":{"nested":1}}"#).unwrap();
        assert_eq!(value, DecodedValue::Number(4.0));
    }

    #[test]
    fn success_wrapper_is_unwrapped() {
        let value =
            decode(r#"{"success":{"type":"string","value":"lumi.sensor_motion.aq2"}}"#).unwrap();
        assert_eq!(value.as_text(), Some("lumi.sensor_motion.aq2"));
    }

    #[test]
    fn vendor_block() {
        let value = decode(XIAOMI_BLOCK).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 8);
        assert_eq!(map["1"], DecodedValue::Number(3005.0));
        assert_eq!(map["102"], DecodedValue::Number(102_982.0));
    }

    #[test]
    fn missing_value_is_malformed() {
        let err = decode(r#"{"type":"int16"}"#).unwrap_err();
        assert!(matches!(err, PayloadError::MissingValue));
    }

    #[test]
    fn null_value_is_malformed() {
        let err = decode(r#"{"type":"int16","value":null}"#).unwrap_err();
        assert!(matches!(err, PayloadError::MissingValue));
    }

    #[test]
    fn odd_nested_entries_are_kept_undecoded() {
        let value = decode(
            r#"{"type":"xiaomi_ff01","value":{
                "1":{"type":"uint16"},
                "8":{"type":"octstr","value":[1,2,3]},
                "9":{"type":"unk","value":null},
                "100":{"type":"int16","value":2206}
            }}"#,
        )
        .unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map["100"], DecodedValue::Number(2206.0));
        assert_eq!(map["1"].shape(), "undecoded");
        assert_eq!(
            map["8"],
            DecodedValue::Undecoded(serde_json::json!({"type": "octstr", "value": [1, 2, 3]}))
        );
        assert_eq!(map["9"].shape(), "undecoded");
    }

    #[test]
    fn non_bool_bitmap_is_malformed() {
        let err = decode(r#"{"type":"bitmap8","value":[true,2]}"#).unwrap_err();
        assert!(matches!(err, PayloadError::InvalidValue(_)));
    }

    #[test]
    fn unparseable_json_is_malformed() {
        let err = decode(r#"{"type":"int16","value":"#).unwrap_err();
        assert!(matches!(err, PayloadError::Json(_)));
        assert!(decode("Online").is_err());
    }

    #[test]
    fn decode_number_rejects_text() {
        let err = decode_number(r#""18""#).unwrap_err();
        assert!(matches!(
            err,
            PayloadError::UnexpectedShape {
                expected: "number",
                found: "text"
            }
        ));
    }
}
