// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Boundary between the protocol layer and the HTTP stack.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Method;

use crate::config::RequestHeaders;
use crate::error::CalDavError;

/// A fully built DAV request.
#[derive(Debug, Clone)]
pub struct DavRequest {
    /// HTTP method (`PROPFIND`, `REPORT`, `PUT`, ...).
    pub method: Method,
    /// Absolute target URL.
    pub url: String,
    /// Request headers.
    pub headers: RequestHeaders,
    /// Request body.
    pub body: Option<String>,
}

impl DavRequest {
    /// Creates a request without headers or body.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: RequestHeaders::default(),
            body: None,
        }
    }

    /// Merges `headers` on top of the request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: &RequestHeaders) -> Self {
        self.headers = self.headers.merge(headers);
        self
    }
}

/// A response as seen by the protocol layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, names lower-cased.
    pub headers: BTreeMap<String, String>,
    /// `true` for any 2xx status.
    pub ok: bool,
    /// Response body.
    pub body: String,
}

impl DavResponse {
    /// Creates a response, deriving `ok` from the status.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            ok: (200..300).contains(&status),
            body: body.into(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Looks up a header case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Sends DAV requests.
///
/// Implementations report ordinary HTTP error statuses through
/// [`DavResponse::ok`] and return an error only when no response was
/// obtained (connection failure, timeout, cancellation). Retries, if any,
/// belong to the implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the server response.
    ///
    /// # Errors
    ///
    /// Returns an error if the call could not be completed.
    async fn send(&self, request: DavRequest) -> Result<DavResponse, CalDavError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: DavRequest) -> Result<DavResponse, CalDavError> {
        (**self).send(request).await
    }
}
