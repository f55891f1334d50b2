// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge.
//!
//! Every failure here is scoped to a single inbound message: the dispatcher
//! logs it and moves on, so none of these errors ever stops the message loop.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The payload could not be decoded at all; nothing was mutated.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] PayloadError),

    /// A recognized attribute carried a value of the wrong shape.
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    /// The device directory rejected a read or write.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Error occurred during transport communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Errors raised while decoding a message payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The payload is not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A keyed payload has no `value` field.
    #[error("missing `value` field")]
    MissingValue,

    /// The `value` field holds something the decoder cannot represent.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The payload decoded, but not into the shape the caller needs.
    #[error("expected {expected}, found {found}")]
    UnexpectedShape {
        /// The shape the caller asked for.
        expected: &'static str,
        /// The shape that was decoded.
        found: &'static str,
    },
}

/// Errors raised when a known attribute's value does not fit its rule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// A scaling rule received a non-numeric value.
    #[error("attribute `{attribute}` expects a number, found {found}")]
    ExpectedNumber {
        /// The attribute key.
        attribute: String,
        /// The shape that was decoded.
        found: &'static str,
    },

    /// A boolean rule received a non-boolean value.
    #[error("attribute `{attribute}` expects a bool, found {found}")]
    ExpectedBool {
        /// The attribute key.
        attribute: String,
        /// The shape that was decoded.
        found: &'static str,
    },

    /// A bitmap rule received something other than a bitmap.
    #[error("attribute `{attribute}` expects a bitmap, found {found}")]
    ExpectedBitmap {
        /// The attribute key.
        attribute: String,
        /// The shape that was decoded.
        found: &'static str,
    },

    /// A bitmap rule received a bitmap with no bits.
    #[error("attribute `{attribute}` carries an empty bitmap")]
    EmptyBitmap {
        /// The attribute key.
        attribute: String,
    },
}

/// Errors reported by a device directory.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// No record exists at the given handle.
    #[error("no device record at handle {0}")]
    UnknownHandle(u32),

    /// A record already occupies the given handle.
    #[error("handle {0} is already in use")]
    DuplicateHandle(u32),

    /// The backing store refused the operation.
    #[error("directory rejected the operation: {0}")]
    Rejected(String),
}

/// Errors related to the MQTT transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT connection or communication failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
