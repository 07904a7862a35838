// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// `CalDAV` client errors.
///
/// Per-resource failures inside a multistatus body are not errors: such
/// entries are dropped from mapped results. Ordinary HTTP error statuses of
/// write operations are reported through [`DavResponse::ok`](crate::DavResponse::ok).
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CalDavError {
    /// A time range bound is not an ISO 8601 date-time. Raised before any
    /// request is sent.
    #[error("invalid timeRange format, not in ISO8601")]
    InvalidTimeRange,

    /// The transport failed to complete the call (connection, timeout,
    /// cancellation).
    #[error("HTTP error: {0}")]
    Http(String),

    /// A query expecting a multistatus body got a non-2xx status.
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The response body is not a parseable multistatus document.
    #[error("Malformed multistatus response: {0}")]
    MalformedResponse(String),

    /// Request body serialization error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Configuration error, e.g. a required account URL is missing.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for CalDavError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl From<quick_xml::Error> for CalDavError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<std::io::Error> for CalDavError {
    fn from(e: std::io::Error) -> Self {
        Self::Xml(format!("IO error: {e}"))
    }
}
