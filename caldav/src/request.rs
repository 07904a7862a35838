// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Request builders for `CalDAV` operations.

use std::collections::BTreeSet;
use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use reqwest::Method;

use crate::config::{CALENDAR_CONTENT_TYPE, Depth, RequestHeaders, XML_CONTENT_TYPE};
use crate::error::CalDavError;
use crate::time_range::TimeRange;
use crate::transport::DavRequest;
use crate::xml::{Namespace, Property};

/// Builds a method that is not one of the standard HTTP verbs.
pub(crate) fn extension_method(name: &str) -> Result<Method, CalDavError> {
    Method::from_bytes(name.as_bytes())
        .map_err(|e| CalDavError::Http(format!("Invalid method: {e}")))
}

/// XML document writer declaring each namespace once on the root element.
struct XmlBody {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlBody {
    fn start(root: &Property, props: &[Property]) -> Result<Self, CalDavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let namespaces: BTreeSet<Namespace> = std::iter::once(Namespace::Dav)
            .chain(std::iter::once(root.namespace()))
            .chain(props.iter().map(Property::namespace))
            .collect();

        let mut elem = BytesStart::new(root.qualified_name());
        for ns in namespaces {
            elem.push_attribute((format!("xmlns:{}", ns.prefix()).as_str(), ns.uri()));
        }
        writer.write_event(Event::Start(elem))?;

        Ok(Self { writer })
    }

    fn open(&mut self, name: &Property) -> Result<(), CalDavError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name.qualified_name())))?;
        Ok(())
    }

    fn open_with(&mut self, name: &Property, attrs: &[(&str, &str)]) -> Result<(), CalDavError> {
        let mut elem = BytesStart::new(name.qualified_name());
        for attr in attrs {
            elem.push_attribute(*attr);
        }
        self.writer.write_event(Event::Start(elem))?;
        Ok(())
    }

    fn close(&mut self, name: &Property) -> Result<(), CalDavError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name.qualified_name())))?;
        Ok(())
    }

    fn empty(&mut self, name: &Property, attrs: &[(&str, &str)]) -> Result<(), CalDavError> {
        let mut elem = BytesStart::new(name.qualified_name());
        for attr in attrs {
            elem.push_attribute(*attr);
        }
        self.writer.write_event(Event::Empty(elem))?;
        Ok(())
    }

    fn text_element(&mut self, name: &Property, text: &str) -> Result<(), CalDavError> {
        self.open(name)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn finish(mut self, root: &Property) -> Result<String, CalDavError> {
        self.close(root)?;
        let bytes = self.writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| CalDavError::Xml(format!("UTF-8 error: {e}")))
    }
}

const PROP: Property = Property::known(Namespace::Dav, "prop");
const HREF: Property = Property::known(Namespace::Dav, "href");
const SET: Property = Property::known(Namespace::Dav, "set");

fn caldav(name: &'static str) -> Property {
    Property::new(Namespace::CalDav, name)
}

/// Writes `<D:prop>` with each requested property as an empty element.
///
/// With `expand`, `calendar-data` gets an `<C:expand/>` child and is added
/// when missing from `props`.
fn write_props(
    body: &mut XmlBody,
    props: &[Property],
    expand: Option<&TimeRange>,
) -> Result<(), CalDavError> {
    body.open(&PROP)?;
    for prop in props {
        match expand {
            Some(range) if *prop == Property::CALENDAR_DATA => {
                write_expanded_data(body, range)?;
            }
            _ => body.empty(prop, &[])?,
        }
    }
    match expand {
        Some(range) if !props.contains(&Property::CALENDAR_DATA) => {
            write_expanded_data(body, range)?;
        }
        _ => {}
    }
    body.close(&PROP)
}

fn write_expanded_data(body: &mut XmlBody, range: &TimeRange) -> Result<(), CalDavError> {
    body.open(&Property::CALENDAR_DATA)?;
    body.empty(
        &caldav("expand"),
        &[
            ("start", range.caldav_start().as_str()),
            ("end", range.caldav_end().as_str()),
        ],
    )?;
    body.close(&Property::CALENDAR_DATA)
}

fn xml_request(method: Method, url: &str, depth: Depth, body: String) -> DavRequest {
    let mut request = DavRequest::new(method, url);
    request.headers = RequestHeaders::new()
        .content_type(XML_CONTENT_TYPE)
        .depth(depth);
    request.body = Some(body);
    request
}

/// PROPFIND request builder.
#[derive(Debug, Clone, Default)]
pub struct PropFindRequest {
    props: Vec<Property>,
}

impl PropFindRequest {
    /// Creates a new PROPFIND request.
    #[must_use]
    pub fn new() -> Self {
        Self { props: Vec::new() }
    }

    /// Adds a property to the request.
    pub fn add_property(&mut self, prop: Property) -> &mut Self {
        self.props.push(prop);
        self
    }

    /// Builds the XML body for the PROPFIND request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, CalDavError> {
        let root = Property::known(Namespace::Dav, "propfind");
        let mut body = XmlBody::start(&root, &self.props)?;
        write_props(&mut body, &self.props, None)?;
        body.finish(&root)
    }

    /// Builds the PROPFIND request for `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn to_request(&self, url: &str, depth: Depth) -> Result<DavRequest, CalDavError> {
        Ok(xml_request(
            extension_method("PROPFIND")?,
            url,
            depth,
            self.build()?,
        ))
    }
}

/// Calendar query (`REPORT`) request builder.
#[derive(Debug, Clone)]
pub struct CalendarQueryRequest {
    props: Vec<Property>,
    component: String,
    time_range: Option<TimeRange>,
    expand: bool,
}

impl CalendarQueryRequest {
    /// Creates a query for VEVENT objects requesting `getetag` and
    /// `calendar-data`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            props: vec![Property::GET_ETAG, Property::CALENDAR_DATA],
            component: "VEVENT".to_string(),
            time_range: None,
            expand: false,
        }
    }

    /// Replaces the requested properties.
    #[must_use]
    pub fn properties(mut self, props: Vec<Property>) -> Self {
        self.props = props;
        self
    }

    /// Sets the component filter (VEVENT, VTODO, etc.).
    #[must_use]
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    /// Sets the time range filter.
    #[must_use]
    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    /// Asks the server to return one object per recurrence instance.
    ///
    /// Only effective together with a time range. `calendar-data` is
    /// requested even if [`Self::properties`] left it out.
    #[must_use]
    pub fn expand(mut self, expand: bool) -> Self {
        self.expand = expand;
        self
    }

    /// Builds the XML body for the calendar query request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, CalDavError> {
        let root = caldav("calendar-query");
        let mut body = XmlBody::start(&root, &self.props)?;

        let expand = self.time_range.as_ref().filter(|_| self.expand);
        write_props(&mut body, &self.props, expand)?;

        let filter = caldav("filter");
        let comp_filter = caldav("comp-filter");
        body.open(&filter)?;
        body.open_with(&comp_filter, &[("name", "VCALENDAR")])?;
        body.open_with(&comp_filter, &[("name", self.component.as_str())])?;
        if let Some(range) = &self.time_range {
            body.empty(
                &caldav("time-range"),
                &[
                    ("start", range.caldav_start().as_str()),
                    ("end", range.caldav_end().as_str()),
                ],
            )?;
        }
        body.close(&comp_filter)?;
        body.close(&comp_filter)?;
        body.close(&filter)?;

        body.finish(&root)
    }

    /// Builds the REPORT request for the calendar at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn to_request(&self, url: &str) -> Result<DavRequest, CalDavError> {
        Ok(xml_request(
            extension_method("REPORT")?,
            url,
            Depth::One,
            self.build()?,
        ))
    }
}

impl Default for CalendarQueryRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Calendar multiget (`REPORT`) request builder.
#[derive(Debug, Clone)]
pub struct CalendarMultiGetRequest {
    props: Vec<Property>,
    hrefs: Vec<String>,
    expand: Option<TimeRange>,
}

impl CalendarMultiGetRequest {
    /// Creates a multiget requesting `getetag` and `calendar-data`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            props: vec![Property::GET_ETAG, Property::CALENDAR_DATA],
            hrefs: Vec::new(),
            expand: None,
        }
    }

    /// Replaces the requested properties.
    #[must_use]
    pub fn properties(mut self, props: Vec<Property>) -> Self {
        self.props = props;
        self
    }

    /// Expands recurring objects into the instances overlapping `range`.
    #[must_use]
    pub fn expand(mut self, range: TimeRange) -> Self {
        self.expand = Some(range);
        self
    }

    /// Adds an href to the request.
    pub fn add_href(&mut self, href: impl Into<String>) -> &mut Self {
        self.hrefs.push(href.into());
        self
    }

    /// Builds the XML body for the calendar multiget request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, CalDavError> {
        let root = caldav("calendar-multiget");
        let mut body = XmlBody::start(&root, &self.props)?;
        write_props(&mut body, &self.props, self.expand.as_ref())?;
        for href in &self.hrefs {
            body.text_element(&HREF, href)?;
        }
        body.finish(&root)
    }

    /// Builds the REPORT request for the calendar at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn to_request(&self, url: &str) -> Result<DavRequest, CalDavError> {
        Ok(xml_request(
            extension_method("REPORT")?,
            url,
            Depth::One,
            self.build()?,
        ))
    }
}

impl Default for CalendarMultiGetRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// MKCALENDAR request builder.
#[derive(Debug, Clone, Default)]
pub struct MkCalendarRequest {
    display_name: Option<String>,
    description: Option<String>,
}

impl MkCalendarRequest {
    /// Creates an MKCALENDAR request without properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display name.
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the calendar description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builds the XML body for the MKCALENDAR request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, CalDavError> {
        let root = caldav("mkcalendar");
        let mut body = XmlBody::start(&root, &[])?;

        body.open(&SET)?;
        body.open(&PROP)?;
        if let Some(name) = &self.display_name {
            body.text_element(&Property::DISPLAY_NAME, name)?;
        }
        if let Some(desc) = &self.description {
            body.text_element(&Property::CALENDAR_DESCRIPTION, desc)?;
        }
        body.close(&PROP)?;
        body.close(&SET)?;

        body.finish(&root)
    }

    /// Builds the MKCALENDAR request for `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn to_request(&self, url: &str) -> Result<DavRequest, CalDavError> {
        let mut request = DavRequest::new(extension_method("MKCALENDAR")?, url);
        request.headers = RequestHeaders::new().content_type(XML_CONTENT_TYPE);
        request.body = Some(self.build()?);
        Ok(request)
    }
}

/// Builds a PUT request uploading calendar data.
///
/// `Content-Type` defaults to `text/calendar; charset=utf-8`; `headers` are
/// merged on top and may override it.
#[must_use]
pub fn put_request(url: &str, data: impl Into<String>, headers: &RequestHeaders) -> DavRequest {
    let mut request = DavRequest::new(Method::PUT, url);
    request.headers = RequestHeaders::new().content_type(CALENDAR_CONTENT_TYPE);
    request.body = Some(data.into());
    request.with_headers(headers)
}

/// Builds a DELETE request. No body is sent.
#[must_use]
pub fn delete_request(url: &str, headers: &RequestHeaders) -> DavRequest {
    DavRequest::new(Method::DELETE, url).with_headers(headers)
}
