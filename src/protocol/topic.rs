// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AqaraHub topic grammar.
//!
//! AqaraHub publishes on two families of topics:
//!
//! ```text
//! <root>/<device_id>/linkquality
//! <root>/<device_id>/<endpoint>/in/<cluster>/<command>/<attribute>
//! ```
//!
//! [`Topic`] splits a raw topic once and exposes the pieces the adapters
//! route on. Short or oddly shaped topics never fail to parse; their derived
//! fields are simply absent.

/// Marker segment that introduces an inbound attribute path.
const INBOUND_MARKER: &str = "in";

/// A parsed AqaraHub topic.
///
/// # Examples
///
/// ```
/// use aqara_bridge::protocol::Topic;
///
/// let topic = Topic::parse(
///     "AqaraHub",
///     "AqaraHub/00158D000272C69E/1/in/Temperature Measurement/Report Attributes/MeasuredValue",
/// );
/// assert!(topic.matches_root());
/// assert_eq!(topic.device_id(), Some("00158D000272C69E"));
/// assert_eq!(
///     topic.inbound_attribute_path().as_deref(),
///     Some("Temperature Measurement/Report Attributes/MeasuredValue")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    expected_root: String,
    segments: Vec<String>,
}

impl Topic {
    /// Splits `raw` on `/`, remembering the root this bridge expects.
    #[must_use]
    pub fn parse(root: impl Into<String>, raw: &str) -> Self {
        Self {
            expected_root: root.into(),
            segments: raw.split('/').map(str::to_owned).collect(),
        }
    }

    /// Returns true if the first segment equals the expected root (case-sensitive).
    #[must_use]
    pub fn matches_root(&self) -> bool {
        self.segments
            .first()
            .is_some_and(|segment| *segment == self.expected_root)
    }

    /// Returns the root this topic was parsed against.
    #[must_use]
    pub fn expected_root(&self) -> &str {
        &self.expected_root
    }

    /// Returns the first segment as published, or an empty string.
    #[must_use]
    pub fn root_segment(&self) -> &str {
        self.segments.first().map_or("", String::as_str)
    }

    /// Returns the device identifier (segment 1).
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        self.segments.get(1).map(String::as_str)
    }

    /// Returns everything after the device identifier, joined by `/`.
    #[must_use]
    pub fn topic_path(&self) -> Option<String> {
        self.segments
            .get(2..)
            .filter(|rest| !rest.is_empty())
            .map(|rest| rest.join("/"))
    }

    /// Returns the attribute path after an `<endpoint>/in/` marker.
    ///
    /// Absent unless segment 3 is literally `in` and at least one segment follows.
    #[must_use]
    pub fn inbound_attribute_path(&self) -> Option<String> {
        if self.segments.len() < 5 || self.segments[3] != INBOUND_MARKER {
            return None;
        }
        Some(self.segments[4..].join("/"))
    }
}
