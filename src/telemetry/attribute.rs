// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attribute tables: mapping attribute keys to value transforms.
//!
//! Each adapter kind declares two `static` tables, one keyed by the full
//! inbound attribute path and one keyed by the short codes of the Xiaomi
//! `0xFF01` block. A rule pairs a [`Transform`] with a [`Setter`] that writes
//! the transformed value into the adapter's state.
//!
//! # Examples
//!
//! ```
//! use aqara_bridge::telemetry::{AttributeRule, AttributeTable, DecodedValue};
//!
//! #[derive(Default)]
//! struct Thermo {
//!     celsius: f64,
//! }
//!
//! static TABLE: AttributeTable<Thermo> = AttributeTable::new(&[(
//!     "Temperature Measurement/Report Attributes/MeasuredValue",
//!     AttributeRule::scaled(0.01, |s, v| s.celsius = v),
//! )]);
//!
//! let mut state = Thermo::default();
//! let rule = TABLE
//!     .get("Temperature Measurement/Report Attributes/MeasuredValue")
//!     .unwrap();
//! rule.apply("MeasuredValue", &mut state, &DecodedValue::Number(2128.0))
//!     .unwrap();
//! assert!((state.celsius - 21.28).abs() < 1e-9);
//! ```

use crate::error::TransformError;
use crate::telemetry::DecodedValue;

/// How a raw decoded value becomes a physical value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// Multiply a number by a constant factor.
    Scale(f64),
    /// Pass a number through unchanged.
    Identity,
    /// Pass a boolean through unchanged.
    BoolPassthrough,
    /// Take bit 0 of a bitmap.
    FirstBitmapBit,
}

/// The output of a [`Transform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformedValue {
    /// A calibrated number.
    Number(f64),
    /// A flag.
    Flag(bool),
}

impl Transform {
    /// Evaluates the transform against a decoded value.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] if `raw` has the wrong shape for this transform.
    pub fn evaluate(
        self,
        attribute: &str,
        raw: &DecodedValue,
    ) -> Result<TransformedValue, TransformError> {
        match (self, raw) {
            (Self::Scale(factor), DecodedValue::Number(n)) => {
                Ok(TransformedValue::Number(n * factor))
            }
            (Self::Identity, DecodedValue::Number(n)) => Ok(TransformedValue::Number(*n)),
            (Self::Scale(_) | Self::Identity, other) => Err(TransformError::ExpectedNumber {
                attribute: attribute.to_owned(),
                found: other.shape(),
            }),
            (Self::BoolPassthrough, DecodedValue::Bool(b)) => Ok(TransformedValue::Flag(*b)),
            (Self::BoolPassthrough, other) => Err(TransformError::ExpectedBool {
                attribute: attribute.to_owned(),
                found: other.shape(),
            }),
            (Self::FirstBitmapBit, DecodedValue::Bitmap(bits)) => bits
                .first()
                .copied()
                .map(TransformedValue::Flag)
                .ok_or_else(|| TransformError::EmptyBitmap {
                    attribute: attribute.to_owned(),
                }),
            (Self::FirstBitmapBit, other) => Err(TransformError::ExpectedBitmap {
                attribute: attribute.to_owned(),
                found: other.shape(),
            }),
        }
    }
}

/// Writes a transformed value into adapter state `S`.
pub enum Setter<S> {
    /// Receives a calibrated number.
    Number(fn(&mut S, f64)),
    /// Receives a flag.
    Flag(fn(&mut S, bool)),
}

// Manual impls: `S` carries no bounds.
impl<S> Clone for Setter<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Setter<S> {}

impl<S> std::fmt::Debug for Setter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(_) => f.write_str("Setter::Number"),
            Self::Flag(_) => f.write_str("Setter::Flag"),
        }
    }
}

/// A transform paired with the setter that consumes its output.
///
/// Rules are built with the `const` constructors, which only pair numeric
/// transforms with numeric setters and flag transforms with flag setters.
#[derive(Debug)]
pub struct AttributeRule<S> {
    transform: Transform,
    setter: Setter<S>,
}

impl<S> AttributeRule<S> {
    /// A number multiplied by `factor`.
    #[must_use]
    pub const fn scaled(factor: f64, set: fn(&mut S, f64)) -> Self {
        Self {
            transform: Transform::Scale(factor),
            setter: Setter::Number(set),
        }
    }

    /// A number passed through unchanged.
    #[must_use]
    pub const fn identity(set: fn(&mut S, f64)) -> Self {
        Self {
            transform: Transform::Identity,
            setter: Setter::Number(set),
        }
    }

    /// A boolean passed through unchanged.
    #[must_use]
    pub const fn flag(set: fn(&mut S, bool)) -> Self {
        Self {
            transform: Transform::BoolPassthrough,
            setter: Setter::Flag(set),
        }
    }

    /// Bit 0 of a bitmap.
    #[must_use]
    pub const fn first_bit(set: fn(&mut S, bool)) -> Self {
        Self {
            transform: Transform::FirstBitmapBit,
            setter: Setter::Flag(set),
        }
    }

    /// Evaluates the transform and hands the result to the setter.
    ///
    /// `state` is untouched when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] if `raw` has the wrong shape for this rule.
    pub fn apply(
        &self,
        attribute: &str,
        state: &mut S,
        raw: &DecodedValue,
    ) -> Result<TransformedValue, TransformError> {
        let value = self.transform.evaluate(attribute, raw)?;
        match (self.setter, value) {
            (Setter::Number(set), TransformedValue::Number(n)) => set(state, n),
            (Setter::Flag(set), TransformedValue::Flag(b)) => set(state, b),
            (Setter::Number(_), TransformedValue::Flag(_)) => {
                return Err(TransformError::ExpectedNumber {
                    attribute: attribute.to_owned(),
                    found: "bool",
                });
            }
            (Setter::Flag(_), TransformedValue::Number(_)) => {
                return Err(TransformError::ExpectedBool {
                    attribute: attribute.to_owned(),
                    found: "number",
                });
            }
        }
        Ok(value)
    }
}

/// An immutable, statically initialized lookup table of attribute rules.
#[derive(Debug)]
pub struct AttributeTable<S: 'static> {
    entries: &'static [(&'static str, AttributeRule<S>)],
}

impl<S: 'static> AttributeTable<S> {
    /// Wraps a static slice of `(key, rule)` pairs.
    #[must_use]
    pub const fn new(entries: &'static [(&'static str, AttributeRule<S>)]) -> Self {
        Self { entries }
    }

    /// An empty table.
    #[must_use]
    pub const fn empty() -> Self {
        Self { entries: &[] }
    }

    /// Looks up the rule for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'static AttributeRule<S>> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, rule)| rule)
    }

    /// Returns true if `key` has a rule.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        self.entries.iter().map(|(key, _)| *key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Gauge {
        level: f64,
        active: bool,
    }

    static TABLE: AttributeTable<Gauge> = AttributeTable::new(&[
        ("scaled", AttributeRule::scaled(0.01, |p, v| p.level = v)),
        ("raw", AttributeRule::identity(|p, v| p.level = v)),
        ("flag", AttributeRule::flag(|p, b| p.active = b)),
        ("bit", AttributeRule::first_bit(|p, b| p.active = b)),
    ]);

    #[test]
    fn scale_transform() {
        let mut gauge = Gauge::default();
        let rule = TABLE.get("scaled").unwrap();
        let out = rule
            .apply("scaled", &mut gauge, &DecodedValue::Number(2128.0))
            .unwrap();
        assert_eq!(out, TransformedValue::Number(2128.0 * 0.01));
        assert!((gauge.level - 21.28).abs() < 1e-9);
    }

    #[test]
    fn identity_transform() {
        let mut gauge = Gauge::default();
        TABLE
            .get("raw")
            .unwrap()
            .apply("raw", &mut gauge, &DecodedValue::Number(42.0))
            .unwrap();
        assert!((gauge.level - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bool_passthrough() {
        let mut gauge = Gauge::default();
        TABLE
            .get("flag")
            .unwrap()
            .apply("flag", &mut gauge, &DecodedValue::Bool(true))
            .unwrap();
        assert!(gauge.active);
    }

    #[test]
    fn first_bitmap_bit() {
        let mut gauge = Gauge {
            active: true,
            ..Gauge::default()
        };
        TABLE
            .get("bit")
            .unwrap()
            .apply("bit", &mut gauge, &DecodedValue::Bitmap(vec![false, true]))
            .unwrap();
        assert!(!gauge.active);
    }

    #[test]
    fn wrong_shape_leaves_state_untouched() {
        let mut gauge = Gauge {
            level: 5.0,
            active: false,
        };
        let err = TABLE
            .get("scaled")
            .unwrap()
            .apply("scaled", &mut gauge, &DecodedValue::Bool(true))
            .unwrap_err();
        assert!(matches!(err, TransformError::ExpectedNumber { found: "bool", .. }));
        assert!((gauge.level - 5.0).abs() < f64::EPSILON);

        let err = TABLE
            .get("flag")
            .unwrap()
            .apply("flag", &mut gauge, &DecodedValue::Number(1.0))
            .unwrap_err();
        assert!(matches!(err, TransformError::ExpectedBool { .. }));
        assert!(!gauge.active);
    }

    #[test]
    fn empty_bitmap() {
        let mut gauge = Gauge::default();
        let err = TABLE
            .get("bit")
            .unwrap()
            .apply("bit", &mut gauge, &DecodedValue::Bitmap(Vec::new()))
            .unwrap_err();
        assert_eq!(
            err,
            TransformError::EmptyBitmap {
                attribute: "bit".to_string()
            }
        );
    }

    #[test]
    fn unknown_key() {
        assert!(TABLE.get("missing").is_none());
        assert!(!TABLE.contains("missing"));
        assert_eq!(TABLE.len(), 4);
        assert_eq!(TABLE.keys().collect::<Vec<_>>(), ["scaled", "raw", "flag", "bit"]);
    }
}
