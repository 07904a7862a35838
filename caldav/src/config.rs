// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt;

use crate::types::ETag;

/// Default content type of calendar object uploads.
pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Content type of XML request bodies.
pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Kind of DAV account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
pub enum AccountType {
    /// Calendar account.
    #[serde(rename = "caldav")]
    #[default]
    CalDav,
    /// Address book account.
    #[serde(rename = "carddav")]
    CardDav,
}

/// A discovered DAV account.
///
/// The URLs are filled in by account bootstrap, which happens outside this
/// crate. The account is never mutated by the client.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Account {
    /// Server URL as given by the user.
    #[serde(default)]
    pub server_url: Option<String>,
    /// Root URL of the DAV service; hrefs are resolved against it.
    #[serde(default)]
    pub root_url: Option<String>,
    /// Calendar home set URL.
    #[serde(default)]
    pub home_url: Option<String>,
    /// Principal URL of the user.
    #[serde(default)]
    pub principal_url: Option<String>,
    /// Account type.
    #[serde(default)]
    pub account_type: AccountType,
    /// Headers merged into every request (e.g. `Authorization`).
    #[serde(default)]
    pub headers: RequestHeaders,
}

/// WebDAV `Depth` header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub enum Depth {
    /// The resource itself.
    #[serde(rename = "0")]
    Zero,
    /// The resource and its direct members.
    #[serde(rename = "1")]
    One,
    /// The whole subtree.
    #[serde(rename = "infinity")]
    Infinity,
}

impl Depth {
    /// Header value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "0",
            Self::One => "1",
            Self::Infinity => "infinity",
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request headers.
///
/// The recognized headers are typed; anything else goes to `extra`. When
/// rendered, `extra` entries win over recognized headers of the same name
/// (compared case-insensitively).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct RequestHeaders {
    /// `Content-Type`
    #[serde(default)]
    pub content_type: Option<String>,
    /// `Depth`
    #[serde(default)]
    pub depth: Option<Depth>,
    /// `If-Match`
    #[serde(default)]
    pub if_match: Option<ETag>,
    /// `If-None-Match`
    #[serde(default)]
    pub if_none_match: Option<String>,
    /// `Authorization`
    #[serde(default)]
    pub authorization: Option<String>,
    /// Pass-through headers.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl RequestHeaders {
    /// Creates an empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `Content-Type`.
    #[must_use]
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    /// Sets `Depth`.
    #[must_use]
    pub fn depth(mut self, depth: Depth) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Sets `If-Match`.
    #[must_use]
    pub fn if_match(mut self, etag: ETag) -> Self {
        self.if_match = Some(etag);
        self
    }

    /// Sets `If-None-Match`.
    #[must_use]
    pub fn if_none_match(mut self, value: impl Into<String>) -> Self {
        self.if_none_match = Some(value.into());
        self
    }

    /// Sets `Authorization`.
    #[must_use]
    pub fn authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    /// Adds a pass-through header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Merges `other` on top of `self`; values set in `other` win.
    #[must_use]
    pub fn merge(mut self, other: &Self) -> Self {
        if other.content_type.is_some() {
            self.content_type.clone_from(&other.content_type);
        }
        if other.depth.is_some() {
            self.depth = other.depth;
        }
        if other.if_match.is_some() {
            self.if_match.clone_from(&other.if_match);
        }
        if other.if_none_match.is_some() {
            self.if_none_match.clone_from(&other.if_none_match);
        }
        if other.authorization.is_some() {
            self.authorization.clone_from(&other.authorization);
        }
        for (name, value) in &other.extra {
            self.extra
                .retain(|existing, _| !existing.eq_ignore_ascii_case(name));
            self.extra.insert(name.clone(), value.clone());
        }
        self
    }

    /// Renders the headers as (name, value) pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let recognized = [
            ("Content-Type", self.content_type.clone()),
            ("Depth", self.depth.map(|d| d.as_str().to_string())),
            ("If-Match", self.if_match.as_ref().map(ToString::to_string)),
            ("If-None-Match", self.if_none_match.clone()),
            ("Authorization", self.authorization.clone()),
        ];

        let mut pairs: Vec<(String, String)> = recognized
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
            .filter(|(name, _)| !self.extra.keys().any(|k| k.eq_ignore_ascii_case(name)))
            .collect();
        pairs.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        pairs
    }

    /// Looks up a rendered header value by name, case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.to_pairs()
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }
}

/// Authentication method of [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(tag = "type")]
pub enum AuthMethod {
    /// No authentication.
    #[serde(rename = "none")]
    #[default]
    None,
    /// Basic authentication (username/password).
    #[serde(rename = "basic")]
    Basic {
        /// Username for authentication.
        username: String,
        /// Password for authentication.
        password: String,
    },
    /// Bearer token authentication (OAuth).
    #[serde(rename = "bearer")]
    Bearer {
        /// Bearer token.
        token: String,
    },
}

/// [`HttpTransport`](crate::HttpTransport) configuration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TransportConfig {
    /// Authentication method.
    #[serde(default)]
    pub auth: AuthMethod,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("calwire-caldav/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            auth: AuthMethod::default(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}
