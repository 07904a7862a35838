// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Client tests over an in-memory `CalDAV` server.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use calwire_caldav::{
    Account, CALENDAR_CONTENT_TYPE, CalDavClient, CalDavError, Calendar, CalendarObject,
    DavRequest, DavResponse, FetchObjectsOptions, MkCalendarRequest, RequestHeaders, Transport,
};

const ORIGIN: &str = "https://dav.example.com";
const ROOT: &str = "https://dav.example.com/";
const HOME: &str = "https://dav.example.com/dav/calendars/user/";
const PRINCIPAL: &str = "https://dav.example.com/dav/principals/user/";
const CALENDAR: &str = "https://dav.example.com/dav/calendars/user/personal/";

#[derive(Debug, Default)]
struct State {
    /// Object path -> (etag, data)
    objects: BTreeMap<String, (String, String)>,
    next_etag: u32,
    ctag: u32,
}

/// Minimal `CalDAV` server: one principal, one calendar home with a single
/// calendar. Time-range matching compares UTC `DTSTART`/`DTEND` values.
#[derive(Debug, Default)]
struct FakeServer {
    state: Mutex<State>,
    requests: Mutex<Vec<DavRequest>>,
}

impl FakeServer {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn requests(&self) -> Vec<DavRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn handle(&self, request: &DavRequest) -> DavResponse {
        let path = request
            .url
            .strip_prefix(ORIGIN)
            .unwrap_or(&request.url)
            .to_string();
        let body = request.body.as_deref().unwrap_or_default();
        let mut state = self.state.lock().unwrap();

        match request.method.as_str() {
            "PROPFIND" if path == "/dav/principals/user/" => multistatus(&principal_entry()),
            "PROPFIND" if path == "/dav/calendars/user/" => {
                multistatus(&calendar_entries(state.ctag))
            }
            "PROPFIND" if path == "/dav/calendars/user/personal/" => {
                multistatus(&ctag_entry(&path, state.ctag))
            }
            "REPORT" if body.contains("calendar-multiget") => {
                let entries: String = hrefs(body)
                    .iter()
                    .map(|href| match state.objects.get(href) {
                        Some((etag, data)) => object_entry(href, etag, data),
                        None => missing_entry(href),
                    })
                    .collect();
                multistatus(&entries)
            }
            "REPORT" => {
                let range = attribute(body, "<C:time-range", "start")
                    .zip(attribute(body, "<C:time-range", "end"));
                let entries: String = state
                    .objects
                    .iter()
                    .filter(|(p, _)| p.starts_with(&path))
                    .filter(|(_, (_, data))| overlaps(data, range))
                    .map(|(p, (etag, data))| object_entry(p, etag, data))
                    .collect();
                multistatus(&entries)
            }
            "PUT" => {
                let existing = state.objects.get(&path).map(|(etag, _)| etag.clone());
                if request.headers.get("If-None-Match").as_deref() == Some("*")
                    && existing.is_some()
                {
                    return DavResponse::new(412, "");
                }
                if let Some(expected) = request.headers.get("If-Match") {
                    if existing.as_deref() != Some(expected.as_str()) {
                        return DavResponse::new(412, "");
                    }
                }

                state.next_etag += 1;
                state.ctag += 1;
                let etag = format!("\"{}\"", state.next_etag);
                state
                    .objects
                    .insert(path, (etag.clone(), body.to_string()));
                let status = if existing.is_some() { 204 } else { 201 };
                DavResponse::new(status, "").with_header("ETag", etag)
            }
            "DELETE" => {
                let Some((etag, _)) = state.objects.get(&path).cloned() else {
                    return DavResponse::new(404, "");
                };
                if let Some(expected) = request.headers.get("If-Match") {
                    if expected != etag {
                        return DavResponse::new(412, "");
                    }
                }
                state.objects.remove(&path);
                state.ctag += 1;
                DavResponse::new(204, "")
            }
            "MKCALENDAR" => DavResponse::new(201, ""),
            _ => DavResponse::new(405, ""),
        }
    }
}

#[async_trait]
impl Transport for FakeServer {
    async fn send(&self, request: DavRequest) -> Result<DavResponse, CalDavError> {
        let response = self.handle(&request);
        self.requests.lock().unwrap().push(request);
        Ok(response)
    }
}

/// Answers every request with the same response.
#[derive(Debug)]
struct StaticTransport(DavResponse);

#[async_trait]
impl Transport for StaticTransport {
    async fn send(&self, _request: DavRequest) -> Result<DavResponse, CalDavError> {
        Ok(self.0.clone())
    }
}

/// Fails every request as a dropped connection would.
#[derive(Debug)]
struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn send(&self, _request: DavRequest) -> Result<DavResponse, CalDavError> {
        Err(CalDavError::Http("connection reset by peer".to_string()))
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

fn multistatus(entries: &str) -> DavResponse {
    DavResponse::new(
        207,
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<d:multistatus xmlns:d=\"DAV:\" xmlns:cal=\"urn:ietf:params:xml:ns:caldav\" \
xmlns:cs=\"http://calendarserver.org/ns/\">{entries}</d:multistatus>"
        ),
    )
    .with_header("Content-Type", "application/xml; charset=utf-8")
}

fn object_entry(href: &str, etag: &str, data: &str) -> String {
    format!(
        "<d:response><d:href>{href}</d:href><d:propstat><d:prop>\
<d:getetag>{}</d:getetag><cal:calendar-data>{}</cal:calendar-data>\
</d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>",
        escape(etag),
        escape(data)
    )
}

fn missing_entry(href: &str) -> String {
    format!(
        "<d:response><d:href>{href}</d:href>\
<d:status>HTTP/1.1 404 Not Found</d:status></d:response>"
    )
}

fn calendar_entries(ctag: u32) -> String {
    format!(
        "<d:response><d:href>/dav/calendars/user/</d:href><d:propstat><d:prop>\
<d:resourcetype><d:collection/></d:resourcetype>\
</d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>\
<d:response><d:href>/dav/calendars/user/personal/</d:href><d:propstat><d:prop>\
<d:displayname>Personal</d:displayname>\
<d:resourcetype><d:collection/><cal:calendar/></d:resourcetype>\
<cal:supported-calendar-component-set><cal:comp name=\"VEVENT\"/></cal:supported-calendar-component-set>\
<cs:getctag>ctag-{ctag}</cs:getctag>\
</d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat>\
<d:propstat><d:prop><cal:calendar-timezone/></d:prop>\
<d:status>HTTP/1.1 404 Not Found</d:status></d:propstat></d:response>"
    )
}

fn ctag_entry(href: &str, ctag: u32) -> String {
    format!(
        "<d:response><d:href>{href}</d:href><d:propstat><d:prop>\
<cs:getctag>ctag-{ctag}</cs:getctag>\
</d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>"
    )
}

fn principal_entry() -> String {
    "<d:response><d:href>/dav/principals/user/</d:href><d:propstat><d:prop>\
<cal:calendar-user-address-set><d:href>mailto:user@example.com</d:href></cal:calendar-user-address-set>\
</d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>"
        .to_string()
}

fn hrefs(body: &str) -> Vec<String> {
    body.split("<D:href>")
        .skip(1)
        .filter_map(|rest| rest.split_once("</D:href>"))
        .map(|(href, _)| href.to_string())
        .collect()
}

fn attribute<'a>(body: &'a str, element: &str, name: &str) -> Option<&'a str> {
    let rest = &body[body.find(element)?..];
    let key = format!("{name}=\"");
    let rest = &rest[rest.find(&key)? + key.len()..];
    Some(&rest[..rest.find('"')?])
}

fn ical_property<'a>(data: &'a str, name: &str) -> Option<&'a str> {
    data.lines()
        .find_map(|line| line.strip_prefix(name)?.strip_prefix(':'))
}

fn overlaps(data: &str, range: Option<(&str, &str)>) -> bool {
    let Some((start, end)) = range else {
        return true;
    };
    let Some(dtstart) = ical_property(data, "DTSTART") else {
        return false;
    };
    let dtend = ical_property(data, "DTEND").unwrap_or(dtstart);
    dtstart < end && dtend > start
}

fn event(uid: &str, start: &str, end: &str) -> String {
    format!(
        "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//calwire//tests//EN\r\n\
BEGIN:VEVENT\r\n\
UID:{uid}\r\n\
DTSTAMP:20210401T000000Z\r\n\
DTSTART:{start}\r\n\
DTEND:{end}\r\n\
SUMMARY:Meeting {uid}\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n"
    )
}

fn account() -> Account {
    Account {
        server_url: Some(ROOT.to_string()),
        root_url: Some(ROOT.to_string()),
        home_url: Some(HOME.to_string()),
        principal_url: Some(PRINCIPAL.to_string()),
        ..Default::default()
    }
}

fn client(server: &Arc<FakeServer>) -> CalDavClient<Arc<FakeServer>> {
    CalDavClient::new(Arc::clone(server), account())
}

async fn seed(client: &CalDavClient<Arc<FakeServer>>, filename: &str, data: &str) {
    let resp = client
        .create_calendar_object(
            &Calendar::new(CALENDAR),
            filename,
            data,
            &RequestHeaders::default(),
        )
        .await
        .expect("Failed to create object");
    assert!(resp.ok, "create {filename} failed with {}", resp.status);
}

#[tokio::test]
async fn client_fetch_calendars_returns_urls() {
    let server = FakeServer::new();
    let client = client(&server);

    let calendars = client
        .fetch_calendars()
        .await
        .expect("Failed to fetch calendars");

    assert!(!calendars.is_empty());
    assert!(calendars.iter().all(|c| !c.url.is_empty()));
    assert_eq!(calendars.len(), 1);
    assert_eq!(calendars[0].url, CALENDAR);
    assert_eq!(calendars[0].display_name.as_deref(), Some("Personal"));
    assert_eq!(calendars[0].ctag.as_deref(), Some("ctag-0"));
    assert_eq!(calendars[0].components, vec!["VEVENT"]);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method.as_str(), "PROPFIND");
    assert_eq!(requests[0].url, HOME);
    assert_eq!(requests[0].headers.get("Depth").as_deref(), Some("1"));
    let body = requests[0].body.as_deref().expect("Missing PROPFIND body");
    assert!(body.contains("<CS:getctag/>"));
    assert!(body.contains("<C:supported-calendar-component-set/>"));
}

#[tokio::test]
async fn client_fetch_calendars_requires_home_url() {
    let server = FakeServer::new();
    let account = Account {
        home_url: None,
        ..account()
    };
    let client = CalDavClient::new(Arc::clone(&server), account);

    let err = client
        .fetch_calendars()
        .await
        .expect_err("Fetching calendars should fail");

    assert!(matches!(err, CalDavError::Config(_)));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn client_fetch_calendar_user_addresses() {
    let server = FakeServer::new();
    let client = client(&server);

    let addresses = client
        .fetch_calendar_user_addresses()
        .await
        .expect("Failed to fetch addresses");

    assert_eq!(addresses, vec!["mailto:user@example.com"]);
    let requests = server.requests();
    assert_eq!(requests[0].url, PRINCIPAL);
    assert_eq!(requests[0].headers.get("Depth").as_deref(), Some("0"));
}

#[tokio::test]
async fn client_created_object_is_returned_by_multiget() {
    let server = FakeServer::new();
    let client = client(&server);
    let data = event("a@example.com", "20210501T100000Z", "20210501T110000Z");
    seed(&client, "a.ics", &data).await;

    let url = format!("{CALENDAR}a.ics");
    let options = FetchObjectsOptions::new().object_urls(vec![url.clone()]);
    let objects = client
        .fetch_calendar_objects(&Calendar::new(CALENDAR), &options)
        .await
        .expect("Failed to fetch objects");

    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].url, url);
    assert!(!objects[0].data.is_empty());
    assert!(objects[0].data.contains("UID:a@example.com"));
    assert!(objects[0].etag.as_deref().is_some_and(|e| !e.is_empty()));

    let requests = server.requests();
    let report = requests.last().expect("Missing REPORT");
    assert_eq!(report.method.as_str(), "REPORT");
    let body = report.body.as_deref().expect("Missing REPORT body");
    assert!(body.contains("<C:calendar-multiget"));
    assert!(body.contains("<D:href>/dav/calendars/user/personal/a.ics</D:href>"));
}

#[tokio::test]
async fn client_multiget_with_time_range_expands() {
    let server = FakeServer::new();
    let client = client(&server);
    seed(
        &client,
        "weekly.ics",
        &event("weekly@example.com", "20210501T100000Z", "20210501T110000Z"),
    )
    .await;

    let urls = vec![format!("{CALENDAR}weekly.ics")];
    let options = FetchObjectsOptions::new()
        .object_urls(urls.clone())
        .time_range("2021-05-01T00:00:00Z", "2021-05-02T00:00:00Z")
        .expand(true);
    let objects = client
        .fetch_calendar_objects(&Calendar::new(CALENDAR), &options)
        .await
        .expect("Failed to fetch objects");
    assert_eq!(objects.len(), 1);

    let body = server
        .requests()
        .last()
        .and_then(|r| r.body.clone())
        .expect("Missing REPORT body");
    assert!(body.contains("<C:calendar-multiget"));
    assert!(body.contains("<C:expand start=\"20210501T000000Z\" end=\"20210502T000000Z\"/>"));

    // Without expand the range has nothing to bound
    let options = FetchObjectsOptions::new()
        .object_urls(urls)
        .time_range("2021-05-01T00:00:00Z", "2021-05-02T00:00:00Z");
    client
        .fetch_calendar_objects(&Calendar::new(CALENDAR), &options)
        .await
        .expect("Failed to fetch objects");
    let body = server
        .requests()
        .last()
        .and_then(|r| r.body.clone())
        .expect("Missing REPORT body");
    assert!(!body.contains("<C:expand"));
}

#[tokio::test]
async fn client_multiget_skips_missing_objects() {
    let server = FakeServer::new();
    let client = client(&server);
    seed(
        &client,
        "a.ics",
        &event("a@example.com", "20210501T100000Z", "20210501T110000Z"),
    )
    .await;

    let objects = client
        .calendar_multiget(
            CALENDAR,
            &[format!("{CALENDAR}a.ics"), format!("{CALENDAR}gone.ics")],
        )
        .await
        .expect("Failed to fetch objects");

    assert_eq!(objects.len(), 1);
    assert!(objects[0].url.ends_with("/a.ics"));
}

#[tokio::test]
async fn client_multiget_without_urls_sends_nothing() {
    let server = FakeServer::new();
    let client = client(&server);

    let objects = client
        .calendar_multiget(CALENDAR, &[])
        .await
        .expect("Failed to fetch objects");

    assert!(objects.is_empty());
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn client_time_range_returns_overlapping_object() {
    let server = FakeServer::new();
    let client = client(&server);
    seed(
        &client,
        "may.ics",
        &event("may@example.com", "20210501T100000Z", "20210501T110000Z"),
    )
    .await;
    seed(
        &client,
        "june.ics",
        &event("june@example.com", "20210601T100000Z", "20210601T110000Z"),
    )
    .await;

    let options =
        FetchObjectsOptions::new().time_range("2021-05-01T00:00:00Z", "2021-05-02T00:00:00Z");
    let objects = client
        .fetch_calendar_objects(&Calendar::new(CALENDAR), &options)
        .await
        .expect("Failed to fetch objects");

    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].url, format!("{CALENDAR}may.ics"));

    let requests = server.requests();
    let report = requests.last().expect("Missing REPORT");
    assert_eq!(report.url, CALENDAR);
    assert_eq!(report.headers.get("Depth").as_deref(), Some("1"));
    let body = report.body.as_deref().expect("Missing REPORT body");
    assert!(body.contains("<C:time-range start=\"20210501T000000Z\" end=\"20210502T000000Z\"/>"));
}

#[tokio::test]
async fn client_time_range_with_offset_is_sent_in_utc() {
    let server = FakeServer::new();
    let client = client(&server);
    seed(
        &client,
        "late.ics",
        &event("late@example.com", "20210430T170000Z", "20210430T180000Z"),
    )
    .await;

    let options = FetchObjectsOptions::new()
        .time_range("2021-05-01T00:00:00+08:00", "2021-05-02T00:00:00+08:00");
    let objects = client
        .fetch_calendar_objects(&Calendar::new(CALENDAR), &options)
        .await
        .expect("Failed to fetch objects");

    assert_eq!(objects.len(), 1);
    assert!(objects[0].url.ends_with("/late.ics"));
}

#[tokio::test]
async fn client_time_range_without_overlap_is_empty() {
    let server = FakeServer::new();
    let client = client(&server);
    seed(
        &client,
        "june.ics",
        &event("june@example.com", "20210601T100000Z", "20210601T110000Z"),
    )
    .await;

    let options = FetchObjectsOptions::new()
        .time_range("2021-05-01T00:00:00.000Z", "2021-05-02T00:00:00.000Z")
        .expand(true);
    let objects = client
        .fetch_calendar_objects(&Calendar::new(CALENDAR), &options)
        .await
        .expect("Failed to fetch objects");

    assert!(objects.is_empty());
    let requests = server.requests();
    let body = requests
        .last()
        .and_then(|r| r.body.as_deref())
        .expect("Missing REPORT body");
    assert!(body.contains("<C:expand start=\"20210501T000000Z\" end=\"20210502T000000Z\"/>"));
}

#[tokio::test]
async fn client_invalid_time_range_sends_nothing() {
    let server = FakeServer::new();
    let client = client(&server);

    let options = FetchObjectsOptions::new()
        .time_range("Sat May 01 2021 00:00:00 GMT+0800", "2021-05-02T00:00:00Z")
        .expand(true);
    let err = client
        .fetch_calendar_objects(&Calendar::new(CALENDAR), &options)
        .await
        .expect_err("Fetching should fail");

    assert!(matches!(err, CalDavError::InvalidTimeRange));
    assert_eq!(err.to_string(), "invalid timeRange format, not in ISO8601");
    assert!(server.requests().is_empty());

    // The range is validated even when fetching explicit objects
    let options = FetchObjectsOptions::new()
        .time_range("2021-05-01T00:00:00Z", "Sun May 02 2021")
        .object_urls(vec![format!("{CALENDAR}a.ics")]);
    let err = client
        .fetch_calendar_objects(&Calendar::new(CALENDAR), &options)
        .await
        .expect_err("Fetching should fail");
    assert!(matches!(err, CalDavError::InvalidTimeRange));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn client_fetch_without_range_returns_all_objects() {
    let server = FakeServer::new();
    let client = client(&server);
    seed(
        &client,
        "a.ics",
        &event("a@example.com", "20210501T100000Z", "20210501T110000Z"),
    )
    .await;
    seed(
        &client,
        "b.ics",
        &event("b@example.com", "20220101T100000Z", "20220101T110000Z"),
    )
    .await;

    let objects = client
        .fetch_calendar_objects(&Calendar::new(CALENDAR), &FetchObjectsOptions::new().expand(true))
        .await
        .expect("Failed to fetch objects");

    assert_eq!(objects.len(), 2);
    let body = server
        .requests()
        .last()
        .and_then(|r| r.body.clone())
        .expect("Missing REPORT body");
    assert!(!body.contains("<C:time-range"));
    assert!(!body.contains("<C:expand"));
}

#[tokio::test]
async fn client_create_then_delete_round_trip() {
    let server = FakeServer::new();
    let client = client(&server);
    let calendar = Calendar::new(CALENDAR);
    let data = event("gone@example.com", "20210501T100000Z", "20210501T110000Z");

    let created = client
        .create_calendar_object(&calendar, "gone.ics", &data, &RequestHeaders::default())
        .await
        .expect("Failed to create object");
    assert!(created.ok);
    assert_eq!(created.status, 201);
    assert!(created.header("etag").is_some());

    let objects = client
        .fetch_calendar_objects(&calendar, &FetchObjectsOptions::new())
        .await
        .expect("Failed to fetch objects");
    let object = objects
        .iter()
        .find(|o| o.url.ends_with("/gone.ics"))
        .expect("Created object not found");

    let deleted = client
        .delete_calendar_object(object, &RequestHeaders::default())
        .await
        .expect("Failed to delete object");
    assert!(deleted.ok);

    let objects = client
        .fetch_calendar_objects(&calendar, &FetchObjectsOptions::new())
        .await
        .expect("Failed to fetch objects");
    assert!(objects.iter().all(|o| o.url != object.url));

    let requests = server.requests();
    let delete = requests
        .iter()
        .find(|r| r.method.as_str() == "DELETE")
        .expect("Missing DELETE");
    assert!(delete.body.is_none());
    assert_eq!(
        delete.headers.get("If-Match"),
        object.etag.as_ref().map(ToString::to_string)
    );
}

#[tokio::test]
async fn client_create_does_not_overwrite() {
    let server = FakeServer::new();
    let client = client(&server);
    let data = event("a@example.com", "20210501T100000Z", "20210501T110000Z");
    seed(&client, "a.ics", &data).await;

    let resp = client
        .create_calendar_object(
            &Calendar::new(CALENDAR),
            "a.ics",
            &data,
            &RequestHeaders::default(),
        )
        .await
        .expect("Transport should not fail");

    assert!(!resp.ok);
    assert_eq!(resp.status, 412);

    let put = server.requests().remove(0);
    assert_eq!(put.method.as_str(), "PUT");
    assert_eq!(put.url, format!("{CALENDAR}a.ics"));
    assert_eq!(put.headers.get("If-None-Match").as_deref(), Some("*"));
    assert_eq!(
        put.headers.get("Content-Type").as_deref(),
        Some(CALENDAR_CONTENT_TYPE)
    );
}

#[tokio::test]
async fn client_update_checks_etag() {
    let server = FakeServer::new();
    let client = client(&server);
    let url = format!("{CALENDAR}a.ics");
    seed(
        &client,
        "a.ics",
        &event("a@example.com", "20210501T100000Z", "20210501T110000Z"),
    )
    .await;

    let mut object = client
        .calendar_multiget(CALENDAR, std::slice::from_ref(&url))
        .await
        .expect("Failed to fetch objects")
        .pop()
        .expect("Missing object");
    object.data = event("a@example.com", "20210501T120000Z", "20210501T130000Z");

    let updated = client
        .update_calendar_object(&object, &RequestHeaders::default())
        .await
        .expect("Failed to update object");
    assert!(updated.ok);

    // The etag changed with the update, so the old snapshot is stale
    let stale = client
        .update_calendar_object(&object, &RequestHeaders::default())
        .await
        .expect("Transport should not fail");
    assert!(!stale.ok);
    assert_eq!(stale.status, 412);

    let stale = client
        .delete_calendar_object(&object, &RequestHeaders::default())
        .await
        .expect("Transport should not fail");
    assert_eq!(stale.status, 412);

    let current = client
        .calendar_multiget(CALENDAR, &[url])
        .await
        .expect("Failed to fetch objects");
    assert!(current[0].data.contains("DTSTART:20210501T120000Z"));
}

#[tokio::test]
async fn client_delete_without_etag_is_unconditional() {
    let server = FakeServer::new();
    let client = client(&server);
    seed(
        &client,
        "a.ics",
        &event("a@example.com", "20210501T100000Z", "20210501T110000Z"),
    )
    .await;

    let object = CalendarObject::new(format!("{CALENDAR}a.ics"), None, "");
    let resp = client
        .delete_calendar_object(&object, &RequestHeaders::default())
        .await
        .expect("Failed to delete object");

    assert!(resp.ok);
    let delete = server.requests().pop().expect("Missing DELETE");
    assert!(delete.headers.get("If-Match").is_none());
}

#[tokio::test]
async fn client_merges_account_and_call_headers() {
    let server = FakeServer::new();
    let account = Account {
        headers: RequestHeaders::new()
            .authorization("Basic dXNlcjpwYXNz")
            .header("X-Client", "account"),
        ..account()
    };
    let client = CalDavClient::new(Arc::clone(&server), account);

    let headers = RequestHeaders::new()
        .header("x-client", "call")
        .header("Content-Type", "text/calendar");
    let resp = client
        .create_calendar_object(
            &Calendar::new(CALENDAR),
            "a.ics",
            &event("a@example.com", "20210501T100000Z", "20210501T110000Z"),
            &headers,
        )
        .await
        .expect("Failed to create object");
    assert!(resp.ok);

    client
        .fetch_calendars()
        .await
        .expect("Failed to fetch calendars");

    let requests = server.requests();
    let put = &requests[0];
    assert_eq!(
        put.headers.get("Authorization").as_deref(),
        Some("Basic dXNlcjpwYXNz")
    );
    assert_eq!(put.headers.get("X-Client").as_deref(), Some("call"));
    assert_eq!(put.headers.get("content-type").as_deref(), Some("text/calendar"));
    assert_eq!(put.headers.get("If-None-Match").as_deref(), Some("*"));

    let propfind = &requests[1];
    assert_eq!(
        propfind.headers.get("authorization").as_deref(),
        Some("Basic dXNlcjpwYXNz")
    );
    assert_eq!(propfind.headers.get("X-Client").as_deref(), Some("account"));
}

#[tokio::test]
async fn client_is_calendar_dirty_compares_ctag() {
    let server = FakeServer::new();
    let client = client(&server);

    let calendar = client
        .fetch_calendars()
        .await
        .expect("Failed to fetch calendars")
        .pop()
        .expect("Missing calendar");
    assert!(!client.is_calendar_dirty(&calendar).await.expect("PROPFIND failed"));

    seed(
        &client,
        "a.ics",
        &event("a@example.com", "20210501T100000Z", "20210501T110000Z"),
    )
    .await;
    assert!(client.is_calendar_dirty(&calendar).await.expect("PROPFIND failed"));

    let request = server.requests().pop().expect("Missing PROPFIND");
    assert_eq!(request.headers.get("Depth").as_deref(), Some("0"));
}

#[tokio::test]
async fn client_make_calendar() {
    let server = FakeServer::new();
    let client = client(&server);

    let resp = client
        .make_calendar(
            "https://dav.example.com/dav/calendars/user/work/",
            &MkCalendarRequest::new().display_name("Work"),
        )
        .await
        .expect("Failed to make calendar");

    assert!(resp.ok);
    let request = server.requests().pop().expect("Missing MKCALENDAR");
    assert_eq!(request.method.as_str(), "MKCALENDAR");
    let body = request.body.expect("Missing MKCALENDAR body");
    assert!(body.contains("<D:displayname>Work</D:displayname>"));
}

#[tokio::test]
async fn client_query_failure_status_is_an_error() {
    let client = CalDavClient::new(
        StaticTransport(DavResponse::new(403, "Forbidden")),
        account(),
    );

    let err = client
        .fetch_calendar_objects(&Calendar::new(CALENDAR), &FetchObjectsOptions::new())
        .await
        .expect_err("Fetching should fail");

    match err {
        CalDavError::UnexpectedStatus { status, url } => {
            assert_eq!(status, 403);
            assert_eq!(url, CALENDAR);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn client_malformed_body_is_an_error() {
    let client = CalDavClient::new(
        StaticTransport(DavResponse::new(207, "<html><body>oops</body>")),
        account(),
    );

    let err = client
        .fetch_calendars()
        .await
        .expect_err("Fetching should fail");

    assert!(matches!(err, CalDavError::MalformedResponse(_)));
}

#[tokio::test]
async fn client_write_failure_status_is_a_value() {
    let client = CalDavClient::new(
        StaticTransport(DavResponse::new(507, "Insufficient Storage")),
        account(),
    );

    let resp = client
        .create_calendar_object(
            &Calendar::new(CALENDAR),
            "a.ics",
            "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n",
            &RequestHeaders::default(),
        )
        .await
        .expect("Transport should not fail");

    assert!(!resp.ok);
    assert_eq!(resp.status, 507);
    assert_eq!(resp.body, "Insufficient Storage");
}

#[tokio::test]
async fn client_transport_error_propagates() {
    let client = CalDavClient::new(FailingTransport, account());

    let err = client
        .fetch_calendars()
        .await
        .expect_err("Fetching should fail");
    assert!(matches!(err, CalDavError::Http(_)));

    let err = client
        .delete_calendar_object(
            &CalendarObject::new(format!("{CALENDAR}a.ics"), None, ""),
            &RequestHeaders::default(),
        )
        .await
        .expect_err("Deleting should fail");
    assert!(matches!(err, CalDavError::Http(_)));
}

#[tokio::test]
async fn client_concurrent_fetches_share_transport() {
    let server = FakeServer::new();
    let client = client(&server);
    seed(
        &client,
        "a.ics",
        &event("a@example.com", "20210501T100000Z", "20210501T110000Z"),
    )
    .await;

    let other = client.clone();
    let calendar = Calendar::new(CALENDAR);
    let options = FetchObjectsOptions::new();
    let (left, right) = tokio::join!(
        client.fetch_calendar_objects(&calendar, &options),
        other.fetch_calendar_objects(&calendar, &options),
    );

    assert_eq!(left.expect("Failed to fetch objects").len(), 1);
    assert_eq!(right.expect("Failed to fetch objects").len(), 1);
    assert_eq!(server.requests().len(), 3);
}
