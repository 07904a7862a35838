// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Response parsers for WebDAV/CalDAV operations.
//!
//! A multistatus body is first read into a namespace-resolved element tree,
//! then each `D:response` becomes an independent [`MultistatusEntry`]. A
//! failed entry never affects its siblings.

use std::collections::BTreeMap;

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use reqwest::Url;

use crate::error::CalDavError;
use crate::types::{Calendar, CalendarObject, ETag, Href};
use crate::xml::{Namespace, Property, XmlElement};

/// iCalendar components a calendar collection may advertise.
const CALENDAR_COMPONENTS: [&str; 6] = [
    "VEVENT",
    "VTODO",
    "VJOURNAL",
    "VFREEBUSY",
    "VTIMEZONE",
    "VALARM",
];

const MULTISTATUS: Property = Property::known(Namespace::Dav, "multistatus");
const RESPONSE: Property = Property::known(Namespace::Dav, "response");
const HREF: Property = Property::known(Namespace::Dav, "href");
const STATUS: Property = Property::known(Namespace::Dav, "status");
const PROPSTAT: Property = Property::known(Namespace::Dav, "propstat");
const PROP: Property = Property::known(Namespace::Dav, "prop");
const RESPONSE_DESCRIPTION: Property = Property::known(Namespace::Dav, "responsedescription");
const CALENDAR: Property = Property::known(Namespace::CalDav, "calendar");
const COMP: Property = Property::known(Namespace::CalDav, "comp");

/// `WebDAV` multistatus response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multistatus {
    /// The response entries, in document order.
    pub responses: Vec<MultistatusEntry>,
    /// Top-level `D:sync-token`, if any.
    pub sync_token: Option<String>,
}

/// Outcome for a single resource in a multistatus response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultistatusEntry {
    /// The href of the resource.
    pub href: Href,
    /// Response-level status, used when the server reports no properties.
    pub status: Option<u16>,
    /// Property groups, one per status.
    pub prop_stats: Vec<PropStat>,
    /// Human readable description sent by the server.
    pub description: Option<String>,
}

/// Properties sharing one status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropStat {
    /// HTTP status of the group.
    pub status: Option<u16>,
    /// Properties by name.
    pub props: BTreeMap<Property, XmlElement>,
}

impl PropStat {
    /// Whether the group succeeded. A group without a status counts as
    /// successful.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_none_or(is_success_status)
    }
}

impl MultistatusEntry {
    /// Whether the resource itself succeeded.
    ///
    /// A response-level status decides on its own; otherwise the entry
    /// succeeds when it has no property groups or at least one successful
    /// group.
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self.status {
            Some(status) => is_success_status(status),
            None => {
                self.prop_stats.is_empty() || self.prop_stats.iter().any(PropStat::is_success)
            }
        }
    }

    /// Status to report for the entry: the response-level one, or the first
    /// property group status.
    #[must_use]
    pub fn effective_status(&self) -> Option<u16> {
        self.status
            .or_else(|| self.prop_stats.iter().find_map(|p| p.status))
    }

    /// A property from a successful group.
    #[must_use]
    pub fn prop(&self, name: &Property) -> Option<&XmlElement> {
        self.prop_stats
            .iter()
            .filter(|p| p.is_success())
            .find_map(|p| p.props.get(name))
    }

    /// Text value of a property from a successful group.
    ///
    /// `None` both when the property is missing and when it is empty.
    #[must_use]
    pub fn text(&self, name: &Property) -> Option<&str> {
        self.prop(name).and_then(XmlElement::text)
    }
}

impl Multistatus {
    /// Parses a multistatus response from XML.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::MalformedResponse`] if the body is not
    /// well-formed XML or its root is not `D:multistatus`.
    pub fn from_xml(xml: &str) -> Result<Self, CalDavError> {
        let root = read_tree(xml)?;
        if root.name != MULTISTATUS {
            return Err(malformed(format!("unexpected root element {}", root.name)));
        }

        let sync_token = root
            .children_named(&Property::SYNC_TOKEN)
            .find_map(|e| e.text.clone());

        let mut responses = Vec::new();
        for response in root.children_named(&RESPONSE) {
            let status = response
                .children_named(&STATUS)
                .find_map(XmlElement::text)
                .and_then(parse_status_line);
            let description = response
                .children_named(&RESPONSE_DESCRIPTION)
                .find_map(|e| e.text.clone());
            let prop_stats: Vec<PropStat> = response
                .children_named(&PROPSTAT)
                .map(read_propstat)
                .collect();

            // RFC 4918 allows several hrefs sharing one status.
            let hrefs: Vec<&str> = response
                .children_named(&HREF)
                .filter_map(XmlElement::text)
                .collect();
            if hrefs.is_empty() {
                tracing::warn!("skipping multistatus response without href");
                continue;
            }
            for href in hrefs {
                responses.push(MultistatusEntry {
                    href: Href::from(href),
                    status,
                    prop_stats: prop_stats.clone(),
                    description: description.clone(),
                });
            }
        }

        tracing::debug!(count = responses.len(), "parsed multistatus");
        Ok(Self {
            responses,
            sync_token,
        })
    }

    /// Successful entries; failed ones are logged and dropped.
    fn successful(self) -> impl Iterator<Item = MultistatusEntry> {
        self.responses.into_iter().filter(|entry| {
            let ok = entry.is_success();
            if !ok {
                tracing::warn!(
                    href = %entry.href,
                    status = ?entry.effective_status(),
                    "dropping failed resource from multistatus"
                );
            }
            ok
        })
    }

    /// Converts the response into calendar objects.
    ///
    /// Missing `getetag` yields `etag: None`, missing `calendar-data` yields
    /// empty data. Hrefs are resolved against `base`.
    #[must_use]
    pub fn into_calendar_objects(self, base: Option<&str>) -> Vec<CalendarObject> {
        self.successful()
            .map(|entry| {
                CalendarObject::new(
                    resolve_href(base, &entry.href),
                    entry.text(&Property::GET_ETAG).map(ETag::from),
                    entry.text(&Property::CALENDAR_DATA).unwrap_or_default(),
                )
            })
            .collect()
    }

    /// Converts the response into calendar collections.
    ///
    /// Only collections whose resource type includes `C:calendar` and that
    /// advertise at least one iCalendar component (or none at all) are kept.
    #[must_use]
    pub fn into_calendars(self, base: Option<&str>) -> Vec<Calendar> {
        self.successful()
            .filter(|entry| {
                entry
                    .prop(&Property::RESOURCE_TYPE)
                    .is_some_and(|rt| rt.has_child(&CALENDAR))
            })
            .filter_map(|entry| {
                let components: Vec<String> = entry
                    .prop(&Property::SUPPORTED_CALENDAR_COMPONENT_SET)
                    .map(|set| {
                        set.children_named(&COMP)
                            .filter_map(|comp| comp.attribute("name"))
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();

                if !components.is_empty()
                    && !components
                        .iter()
                        .any(|c| CALENDAR_COMPONENTS.contains(&c.as_str()))
                {
                    tracing::debug!(
                        href = %entry.href,
                        ?components,
                        "skipping non-calendar collection"
                    );
                    return None;
                }

                let text = |prop: &Property| entry.text(prop).map(str::to_string);
                Some(Calendar {
                    url: resolve_href(base, &entry.href),
                    display_name: text(&Property::DISPLAY_NAME),
                    ctag: text(&Property::GET_CTAG).map(ETag::new),
                    timezone: text(&Property::CALENDAR_TIMEZONE),
                    description: text(&Property::CALENDAR_DESCRIPTION),
                    sync_token: text(&Property::SYNC_TOKEN),
                    color: text(&Property::CALENDAR_COLOR),
                    resource_types: entry
                        .prop(&Property::RESOURCE_TYPE)
                        .map(|rt| {
                            rt.children
                                .iter()
                                .map(|c| c.name.name().to_string())
                                .collect()
                        })
                        .unwrap_or_default(),
                    components,
                })
            })
            .collect()
    }

    /// Collects the hrefs of `C:calendar-user-address-set`.
    #[must_use]
    pub fn into_calendar_user_addresses(self) -> Vec<String> {
        self.successful()
            .flat_map(|entry| {
                entry
                    .prop(&Property::CALENDAR_USER_ADDRESS_SET)
                    .map(|set| {
                        set.children_named(&HREF)
                            .filter_map(XmlElement::text)
                            .map(str::to_string)
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default()
            })
            .collect()
    }
}

fn malformed(msg: impl Into<String>) -> CalDavError {
    CalDavError::MalformedResponse(msg.into())
}

fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Parses `HTTP/1.1 200 OK` into `200`.
fn parse_status_line(line: &str) -> Option<u16> {
    line.split_whitespace().nth(1).and_then(|code| code.parse().ok())
}

fn read_propstat(propstat: &XmlElement) -> PropStat {
    let status = propstat
        .children_named(&STATUS)
        .find_map(XmlElement::text)
        .and_then(parse_status_line);
    let props = propstat
        .children_named(&PROP)
        .flat_map(|prop| prop.children.iter())
        .map(|elem| (elem.name.clone(), elem.clone()))
        .collect();
    PropStat { status, props }
}

/// Resolves an href against a base URL; the href is kept as-is when there is
/// no usable base.
#[must_use]
pub fn resolve_href(base: Option<&str>, href: &str) -> String {
    base.and_then(|base| Url::parse(base).ok())
        .and_then(|base| base.join(href).ok())
        .map_or_else(|| href.to_string(), String::from)
}

/// An element being built. `name` is `None` for elements in namespaces the
/// client does not know; those are dropped with their subtree.
struct PartialElement {
    name: Option<Property>,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlElement>,
}

impl PartialElement {
    fn finish(self) -> Option<XmlElement> {
        let text = self.text.trim();
        Some(XmlElement {
            name: self.name?,
            attributes: self.attributes,
            text: (!text.is_empty()).then(|| text.to_string()),
            children: self.children,
        })
    }
}

fn element_name(ns: &ResolveResult<'_>, start: &BytesStart<'_>) -> Option<Property> {
    let local = String::from_utf8_lossy(start.name().local_name().into_inner()).into_owned();
    match ns {
        ResolveResult::Bound(uri) => match Namespace::from_uri(uri.as_ref()) {
            Some(namespace) => Some(Property::new(namespace, local)),
            None => {
                tracing::trace!(
                    namespace = %String::from_utf8_lossy(uri.as_ref()),
                    element = %local,
                    "skipping element in unknown namespace"
                );
                None
            }
        },
        _ => {
            tracing::trace!(element = %local, "skipping element without namespace");
            None
        }
    }
}

fn read_attributes(start: &BytesStart<'_>) -> Result<Vec<(String, String)>, CalDavError> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(e.to_string()))?;
        if attr.key.as_ref().starts_with(b"xmlns") {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().into_inner()).into_owned();
        let raw = std::str::from_utf8(&attr.value).map_err(|e| malformed(e.to_string()))?;
        let value = quick_xml::escape::unescape(raw).map_err(|e| malformed(e.to_string()))?;
        attributes.push((key, value.into_owned()));
    }
    Ok(attributes)
}

/// Reads the whole document into a tree of known-namespace elements.
fn read_tree(xml: &str) -> Result<XmlElement, CalDavError> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().check_end_names = true;

    let mut stack: Vec<PartialElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| malformed(e.to_string()))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let elem = PartialElement {
                    name: element_name(&ns, e),
                    attributes: read_attributes(e)?,
                    text: String::new(),
                    children: Vec::new(),
                };
                if matches!(event, Event::Empty(_)) {
                    attach(&mut stack, &mut root, elem);
                } else {
                    stack.push(elem);
                }
            }
            Event::End(_) => {
                let elem = stack
                    .pop()
                    .ok_or_else(|| malformed("unbalanced end element"))?;
                attach(&mut stack, &mut root, elem);
            }
            Event::Text(e) => {
                if let Some(top) = stack.last_mut() {
                    let raw = e.decode().map_err(|e| malformed(e.to_string()))?;
                    let text =
                        quick_xml::escape::unescape(&raw).map_err(|e| malformed(e.to_string()))?;
                    top.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(top) = stack.last_mut() {
                    let text = std::str::from_utf8(&e).map_err(|e| malformed(e.to_string()))?;
                    top.text.push_str(text);
                }
            }
            Event::GeneralRef(e) => {
                if let Some(top) = stack.last_mut() {
                    let ch = e.resolve_char_ref().map_err(|e| malformed(e.to_string()))?;
                    if let Some(ch) = ch {
                        top.text.push(ch);
                    } else {
                        let name = e.decode().map_err(|e| malformed(e.to_string()))?;
                        let resolved = quick_xml::escape::resolve_predefined_entity(&name)
                            .ok_or_else(|| malformed(format!("unknown entity &{name};")))?;
                        top.text.push_str(resolved);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(malformed("unexpected end of document"));
    }
    root.ok_or_else(|| malformed("empty document"))
}

fn attach(stack: &mut [PartialElement], root: &mut Option<XmlElement>, elem: PartialElement) {
    match stack.last_mut() {
        Some(parent) => {
            if let Some(child) = elem.finish() {
                parent.children.push(child);
            }
        }
        None => {
            if root.is_none() {
                *root = elem.finish();
            }
        }
    }
}
