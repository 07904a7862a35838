// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `CalDAV` client protocol layer (RFC 4791): request building, multistatus
//! parsing and result mapping over a pluggable transport.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool
)]

mod client;
mod config;
mod error;
mod http;
mod request;
mod response;
mod time_range;
mod transport;
mod types;
mod xml;

pub use crate::client::{CalDavClient, FetchObjectsOptions};
pub use crate::config::{
    Account, AccountType, AuthMethod, CALENDAR_CONTENT_TYPE, Depth, RequestHeaders,
    TransportConfig, XML_CONTENT_TYPE,
};
pub use crate::error::CalDavError;
pub use crate::http::HttpTransport;
pub use crate::request::{
    CalendarMultiGetRequest, CalendarQueryRequest, MkCalendarRequest, PropFindRequest,
    delete_request, put_request,
};
pub use crate::response::{Multistatus, MultistatusEntry, PropStat, resolve_href};
pub use crate::time_range::TimeRange;
pub use crate::transport::{DavRequest, DavResponse, Transport};
pub use crate::types::{Calendar, CalendarObject, ETag, Href};
pub use crate::xml::{Namespace, Property, XmlElement};
