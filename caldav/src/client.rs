// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `CalDAV` client for calendar operations.

use std::sync::Arc;

use reqwest::Url;

use crate::config::{Account, Depth, RequestHeaders, TransportConfig};
use crate::error::CalDavError;
use crate::http::HttpTransport;
use crate::request::{
    CalendarMultiGetRequest, CalendarQueryRequest, MkCalendarRequest, PropFindRequest,
    delete_request, put_request,
};
use crate::response::{Multistatus, resolve_href};
use crate::time_range::TimeRange;
use crate::transport::{DavRequest, DavResponse, Transport};
use crate::types::{Calendar, CalendarObject};
use crate::xml::Property;

/// Properties requested when listing calendars.
const CALENDAR_PROPS: [Property; 8] = [
    Property::CALENDAR_DESCRIPTION,
    Property::CALENDAR_TIMEZONE,
    Property::DISPLAY_NAME,
    Property::GET_CTAG,
    Property::RESOURCE_TYPE,
    Property::SUPPORTED_CALENDAR_COMPONENT_SET,
    Property::SYNC_TOKEN,
    Property::CALENDAR_COLOR,
];

/// `CalDAV` client for accessing and managing calendars on `CalDAV` servers.
///
/// The client holds no mutable state: every operation sends exactly one
/// request and can run concurrently with others. Nothing is retried.
///
/// # Example
///
/// ```ignore
/// use calwire_caldav::{Account, CalDavClient, FetchObjectsOptions, TransportConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let account = Account {
///     root_url: Some("https://caldav.example.com/".to_string()),
///     home_url: Some("https://caldav.example.com/dav/calendars/user/".to_string()),
///     ..Default::default()
/// };
///
/// let client = CalDavClient::with_http(account, TransportConfig::default())?;
/// let calendars = client.fetch_calendars().await?;
/// let options = FetchObjectsOptions::new()
///     .time_range("2021-05-01T00:00:00Z", "2021-05-02T00:00:00Z")
///     .expand(true);
/// let objects = client.fetch_calendar_objects(&calendars[0], &options).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CalDavClient<T = HttpTransport> {
    transport: Arc<T>,
    account: Account,
}

impl<T> Clone for CalDavClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            account: self.account.clone(),
        }
    }
}

impl CalDavClient<HttpTransport> {
    /// Creates a client over the default HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client initialization fails.
    pub fn with_http(account: Account, config: TransportConfig) -> Result<Self, CalDavError> {
        Ok(Self::new(HttpTransport::new(config)?, account))
    }
}

/// Options of [`CalDavClient::fetch_calendar_objects`].
#[derive(Debug, Clone, Default)]
pub struct FetchObjectsOptions {
    time_range: Option<(String, String)>,
    expand: bool,
    object_urls: Option<Vec<String>>,
    component: Option<String>,
}

impl FetchObjectsOptions {
    /// Fetches every VEVENT of the calendar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps objects with an occurrence in `[start, end)`.
    ///
    /// Both bounds are validated when the fetch runs.
    #[must_use]
    pub fn time_range(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.time_range = Some((start.into(), end.into()));
        self
    }

    /// Asks the server to return each occurrence of recurring objects as a
    /// separate object. Requires a time range.
    #[must_use]
    pub fn expand(mut self, expand: bool) -> Self {
        self.expand = expand;
        self
    }

    /// Fetches exactly these objects with a calendar-multiget.
    #[must_use]
    pub fn object_urls(mut self, urls: Vec<String>) -> Self {
        self.object_urls = Some(urls);
        self
    }

    /// Filters on another component than VEVENT, e.g. VTODO.
    #[must_use]
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }
}

impl<T: Transport> CalDavClient<T> {
    /// Creates a new `CalDAV` client.
    pub fn new(transport: T, account: Account) -> Self {
        Self {
            transport: Arc::new(transport),
            account,
        }
    }

    /// The account this client works on.
    pub const fn account(&self) -> &Account {
        &self.account
    }

    /// Sends a request after merging the account headers and then `headers`
    /// on top of the request's own headers.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    pub async fn send(
        &self,
        mut request: DavRequest,
        headers: &RequestHeaders,
    ) -> Result<DavResponse, CalDavError> {
        request.headers = request
            .headers
            .merge(&self.account.headers)
            .merge(headers);

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            depth = ?request.headers.depth,
            "sending request"
        );
        self.transport.send(request).await
    }

    /// Sends a request expecting a multistatus body.
    async fn send_multistatus(&self, request: DavRequest) -> Result<Multistatus, CalDavError> {
        let url = request.url.clone();
        let resp = self.send(request, &RequestHeaders::default()).await?;
        if !resp.ok {
            tracing::warn!(status = resp.status, url = %url, "multistatus request failed");
            return Err(CalDavError::UnexpectedStatus {
                status: resp.status,
                url,
            });
        }
        Multistatus::from_xml(&resp.body)
    }

    /// Sends a PROPFIND for `props` on `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails, the status is not 2xx or the
    /// body is not a multistatus document.
    pub async fn propfind(
        &self,
        url: &str,
        props: &[Property],
        depth: Depth,
    ) -> Result<Multistatus, CalDavError> {
        let mut propfind = PropFindRequest::new();
        for prop in props {
            propfind.add_property(prop.clone());
        }
        self.send_multistatus(propfind.to_request(url, depth)?).await
    }

    /// Runs a calendar-query REPORT on the calendar at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails, the status is not 2xx or the
    /// body is not a multistatus document.
    pub async fn calendar_query(
        &self,
        url: &str,
        query: &CalendarQueryRequest,
    ) -> Result<Multistatus, CalDavError> {
        self.send_multistatus(query.to_request(url)?).await
    }

    /// Retrieves multiple calendar objects by URL.
    ///
    /// Objects the server reports as failed (e.g. 404) are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails, the status is not 2xx or the
    /// body is not a multistatus document.
    pub async fn calendar_multiget(
        &self,
        calendar_url: &str,
        object_urls: &[String],
    ) -> Result<Vec<CalendarObject>, CalDavError> {
        self.multiget(calendar_url, object_urls, None).await
    }

    async fn multiget(
        &self,
        calendar_url: &str,
        object_urls: &[String],
        expand: Option<TimeRange>,
    ) -> Result<Vec<CalendarObject>, CalDavError> {
        if object_urls.is_empty() {
            return Ok(Vec::new());
        }

        let mut multiget = CalendarMultiGetRequest::new();
        if let Some(range) = expand {
            multiget = multiget.expand(range);
        }
        for url in object_urls {
            multiget.add_href(href_path(url));
        }

        let multistatus = self
            .send_multistatus(multiget.to_request(calendar_url)?)
            .await?;
        Ok(multistatus.into_calendar_objects(self.base_url()))
    }

    /// Lists the calendars in the account's calendar home.
    ///
    /// # Errors
    ///
    /// Returns an error if the account has no home URL or the PROPFIND fails.
    pub async fn fetch_calendars(&self) -> Result<Vec<Calendar>, CalDavError> {
        let home = required(self.account.home_url.as_deref(), "home URL")?;
        let multistatus = self.propfind(home, &CALENDAR_PROPS, Depth::One).await?;
        let calendars = multistatus.into_calendars(self.base_url());
        tracing::debug!(count = calendars.len(), "fetched calendars");
        Ok(calendars)
    }

    /// Lists the calendar user addresses of the account's principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the account has no principal URL or the PROPFIND
    /// fails.
    pub async fn fetch_calendar_user_addresses(&self) -> Result<Vec<String>, CalDavError> {
        let principal = required(self.account.principal_url.as_deref(), "principal URL")?;
        let multistatus = self
            .propfind(
                principal,
                &[Property::CALENDAR_USER_ADDRESS_SET],
                Depth::Zero,
            )
            .await?;
        Ok(multistatus.into_calendar_user_addresses())
    }

    /// Fetches the objects of a calendar.
    ///
    /// The time range is validated before anything is sent. Matching against
    /// the range, including recurrence, is done by the server and the result
    /// is returned as is. With `object_urls`, the range does not filter and
    /// only bounds the expansion of recurring objects.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::InvalidTimeRange`] if a bound is not ISO 8601,
    /// or an error if the request fails.
    pub async fn fetch_calendar_objects(
        &self,
        calendar: &Calendar,
        options: &FetchObjectsOptions,
    ) -> Result<Vec<CalendarObject>, CalDavError> {
        let time_range = options
            .time_range
            .as_ref()
            .map(|(start, end)| TimeRange::parse(start, end))
            .transpose()?;

        if time_range.is_none() && options.expand {
            tracing::warn!("expand requested without a time range, ignoring");
        }

        if let Some(urls) = &options.object_urls {
            let expand = time_range.filter(|_| options.expand);
            if time_range.is_some() && expand.is_none() {
                tracing::debug!("time range does not filter a multiget, fetching all objects");
            }
            return self.multiget(&calendar.url, urls, expand).await;
        }

        let mut query = CalendarQueryRequest::new().expand(options.expand);
        if let Some(component) = &options.component {
            query = query.component(component.clone());
        }
        if let Some(range) = time_range {
            tracing::debug!(%range, expand = options.expand, "filtering calendar objects");
            query = query.time_range(range);
        }

        let multistatus = self.calendar_query(&calendar.url, &query).await?;
        Ok(multistatus.into_calendar_objects(self.base_url()))
    }

    /// Uploads a new calendar object named `filename` into `calendar`.
    ///
    /// The request carries `If-None-Match: *` so an existing object is never
    /// overwritten. The server-assigned `ETag` is only known after a fetch.
    ///
    /// # Errors
    ///
    /// Returns an error only if the transport fails; HTTP failures are
    /// reported by [`DavResponse::ok`].
    pub async fn create_calendar_object(
        &self,
        calendar: &Calendar,
        filename: &str,
        data: &str,
        headers: &RequestHeaders,
    ) -> Result<DavResponse, CalDavError> {
        let url = resolve_href(Some(calendar.url.as_str()), filename);
        let defaults = RequestHeaders::new().if_none_match("*");
        self.send(put_request(&url, data, &defaults), headers).await
    }

    /// Replaces an existing calendar object with its current data.
    ///
    /// Sends `If-Match` with the object's `ETag` when it is known.
    ///
    /// # Errors
    ///
    /// Returns an error only if the transport fails.
    pub async fn update_calendar_object(
        &self,
        object: &CalendarObject,
        headers: &RequestHeaders,
    ) -> Result<DavResponse, CalDavError> {
        let request = put_request(&object.url, object.data.as_str(), &if_match(object));
        self.send(request, headers).await
    }

    /// Deletes a calendar object.
    ///
    /// Sends `If-Match` with the object's `ETag` when it is known.
    ///
    /// # Errors
    ///
    /// Returns an error only if the transport fails.
    pub async fn delete_calendar_object(
        &self,
        object: &CalendarObject,
        headers: &RequestHeaders,
    ) -> Result<DavResponse, CalDavError> {
        self.send(delete_request(&object.url, &if_match(object)), headers)
            .await
    }

    /// Creates a new calendar collection at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the transport fails.
    pub async fn make_calendar(
        &self,
        url: &str,
        request: &MkCalendarRequest,
    ) -> Result<DavResponse, CalDavError> {
        self.send(request.to_request(url)?, &RequestHeaders::default())
            .await
    }

    /// Tells whether the calendar changed since the snapshot was taken, by
    /// comparing collection tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the PROPFIND fails.
    pub async fn is_calendar_dirty(&self, calendar: &Calendar) -> Result<bool, CalDavError> {
        let multistatus = self
            .propfind(&calendar.url, &[Property::GET_CTAG], Depth::Zero)
            .await?;

        let remote = multistatus
            .responses
            .iter()
            .filter(|entry| entry.is_success())
            .find_map(|entry| entry.text(&Property::GET_CTAG));

        Ok(remote != calendar.ctag.as_deref())
    }

    fn base_url(&self) -> Option<&str> {
        self.account
            .root_url
            .as_deref()
            .or(self.account.server_url.as_deref())
    }
}

fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str, CalDavError> {
    value.ok_or_else(|| CalDavError::Config(format!("account has no {what}")))
}

fn if_match(object: &CalendarObject) -> RequestHeaders {
    match &object.etag {
        Some(etag) => RequestHeaders::new().if_match(etag.clone()),
        None => RequestHeaders::new(),
    }
}

/// Reduces an absolute URL to its path, as expected in `D:href`.
fn href_path(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_string(), |u| u.path().to_string())
}
