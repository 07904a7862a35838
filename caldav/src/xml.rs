// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! XML namespaces, properties and element trees for WebDAV/CalDAV processing.

use std::borrow::Cow;
use std::fmt;

/// XML namespaces understood by the client.
///
/// Every namespace maps to one canonical URI and one prefix. Request bodies
/// always use the same prefix for a namespace, whatever the set of requested
/// properties is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Namespace {
    /// `WebDAV` (`DAV:`).
    Dav,
    /// `CalDAV` (RFC 4791).
    CalDav,
    /// `CardDAV` (RFC 6352).
    CardDav,
    /// Apple calendar server extensions (`getctag`, ...).
    CalendarServer,
    /// Apple iCal extensions (`calendar-color`, ...).
    ICal,
}

impl Namespace {
    /// All namespaces, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Dav,
        Self::CalDav,
        Self::CardDav,
        Self::CalendarServer,
        Self::ICal,
    ];

    /// Canonical namespace URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Dav => "DAV:",
            Self::CalDav => "urn:ietf:params:xml:ns:caldav",
            Self::CardDav => "urn:ietf:params:xml:ns:carddav",
            Self::CalendarServer => "http://calendarserver.org/ns/",
            Self::ICal => "http://apple.com/ns/ical/",
        }
    }

    /// Prefix used when writing request bodies.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Dav => "D",
            Self::CalDav => "C",
            Self::CardDav => "CARD",
            Self::CalendarServer => "CS",
            Self::ICal => "ICAL",
        }
    }

    /// Maps a resolved namespace URI back to a known namespace.
    #[must_use]
    pub fn from_uri(uri: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.uri().as_bytes() == uri)
    }

    /// Returns the prefixed element name, e.g. `C:calendar-data`.
    #[must_use]
    pub fn qualify(self, local_name: &str) -> String {
        format!("{}:{local_name}", self.prefix())
    }
}

/// A `WebDAV` property: a local name in a namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Property {
    namespace: Namespace,
    name: Cow<'static, str>,
}

impl Property {
    /// `D:displayname`
    pub const DISPLAY_NAME: Self = Self::known(Namespace::Dav, "displayname");
    /// `D:resourcetype`
    pub const RESOURCE_TYPE: Self = Self::known(Namespace::Dav, "resourcetype");
    /// `D:getetag`
    pub const GET_ETAG: Self = Self::known(Namespace::Dav, "getetag");
    /// `D:sync-token`
    pub const SYNC_TOKEN: Self = Self::known(Namespace::Dav, "sync-token");
    /// `D:current-user-principal`
    pub const CURRENT_USER_PRINCIPAL: Self =
        Self::known(Namespace::Dav, "current-user-principal");
    /// `C:calendar-data`
    pub const CALENDAR_DATA: Self = Self::known(Namespace::CalDav, "calendar-data");
    /// `C:calendar-home-set`
    pub const CALENDAR_HOME_SET: Self = Self::known(Namespace::CalDav, "calendar-home-set");
    /// `C:calendar-description`
    pub const CALENDAR_DESCRIPTION: Self =
        Self::known(Namespace::CalDav, "calendar-description");
    /// `C:calendar-timezone`
    pub const CALENDAR_TIMEZONE: Self = Self::known(Namespace::CalDav, "calendar-timezone");
    /// `C:supported-calendar-component-set`
    pub const SUPPORTED_CALENDAR_COMPONENT_SET: Self =
        Self::known(Namespace::CalDav, "supported-calendar-component-set");
    /// `C:calendar-user-address-set`
    pub const CALENDAR_USER_ADDRESS_SET: Self =
        Self::known(Namespace::CalDav, "calendar-user-address-set");
    /// `CS:getctag`
    pub const GET_CTAG: Self = Self::known(Namespace::CalendarServer, "getctag");
    /// `ICAL:calendar-color`
    pub const CALENDAR_COLOR: Self = Self::known(Namespace::ICal, "calendar-color");

    pub(crate) const fn known(namespace: Namespace, name: &'static str) -> Self {
        Self {
            namespace,
            name: Cow::Borrowed(name),
        }
    }

    /// Creates a property from a namespace and a local name.
    #[must_use]
    pub fn new(namespace: Namespace, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    /// The local name, e.g. `getetag`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The namespace of the property.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// The prefixed element name used in request bodies.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.namespace.qualify(&self.name)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace.uri(), self.name)
    }
}

/// A parsed XML element whose namespace is known.
///
/// Empty and self-closing elements both have no text and no children, and
/// are reported as "no value" by [`XmlElement::text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Name of the element.
    pub name: Property,
    /// Attributes as (local name, unescaped value).
    pub attributes: Vec<(String, String)>,
    /// Concatenated text content, trimmed; `None` when empty.
    pub text: Option<String>,
    /// Child elements.
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Creates an element without content.
    #[must_use]
    pub const fn new(name: Property) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Text content, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Value of an attribute by local name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether a direct child with the given name exists.
    #[must_use]
    pub fn has_child(&self, name: &Property) -> bool {
        self.children.iter().any(|child| &child.name == name)
    }

    /// Iterates over direct children with the given name.
    pub fn children_named<'a>(
        &'a self,
        name: &Property,
    ) -> impl Iterator<Item = &'a XmlElement> + use<'a> {
        let name = name.clone();
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Whether the element carries neither text nor children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.children.is_empty()
    }
}
