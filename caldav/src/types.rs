// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::ops::Deref;

/// Calendar resource href (path).
///
/// A `Href` represents the path to a calendar resource on a `CalDAV` server,
/// such as `/calendars/user/event1.ics`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Href(String);

impl Href {
    /// Creates a new `Href` from a string.
    #[must_use]
    pub const fn new(href: String) -> Self {
        Self(href)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Href {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Href {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Href {
    fn from(href: String) -> Self {
        Self(href)
    }
}

impl From<&str> for Href {
    fn from(href: &str) -> Self {
        Self(href.to_string())
    }
}

/// Entity tag for change detection.
///
/// An `ETag` is an opaque version token returned by the server. It changes
/// whenever the content of the resource changes. Collection tags (`CTag`) use
/// the same representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(transparent)]
pub struct ETag(String);

impl ETag {
    /// Creates a new `ETag` from a string.
    #[must_use]
    pub const fn new(etag: String) -> Self {
        Self(etag)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ETag {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ETag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ETag {
    fn from(etag: String) -> Self {
        Self(etag)
    }
}

impl From<&str> for ETag {
    fn from(etag: &str) -> Self {
        Self(etag.to_string())
    }
}

/// Calendar collection metadata.
///
/// A read-only snapshot of a calendar collection as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calendar {
    /// Absolute URL of the calendar collection.
    pub url: String,
    /// The display name of the calendar.
    pub display_name: Option<String>,
    /// The collection tag (`CTag`) for change detection.
    pub ctag: Option<ETag>,
    /// Supported component types (VEVENT, VTODO, etc.).
    pub components: Vec<String>,
    /// The calendar timezone (a VTIMEZONE iCalendar document).
    pub timezone: Option<String>,
    /// The description of the calendar.
    pub description: Option<String>,
    /// The WebDAV sync token.
    pub sync_token: Option<String>,
    /// The calendar color (Apple extension).
    pub color: Option<String>,
    /// Local names of the reported resource types.
    pub resource_types: Vec<String>,
}

impl Calendar {
    /// Creates a calendar snapshot with only a URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// A calendar object resource (event, todo, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarObject {
    /// Absolute URL of the object.
    pub url: String,
    /// The entity tag, when the server reported one.
    pub etag: Option<ETag>,
    /// Raw iCalendar text; empty when the server sent no calendar data.
    pub data: String,
}

impl CalendarObject {
    /// Creates a new `CalendarObject`.
    #[must_use]
    pub fn new(url: impl Into<String>, etag: Option<ETag>, data: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            etag,
            data: data.into(),
        }
    }
}
