// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport backed by `reqwest`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};

use crate::config::{AuthMethod, TransportConfig};
use crate::error::CalDavError;
use crate::transport::{DavRequest, DavResponse, Transport};

/// Default [`Transport`] over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Creates a new HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(config: TransportConfig) -> Result<Self, CalDavError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client, config })
    }

    /// Builds a request with authentication and request headers.
    fn build_request(&self, request: DavRequest) -> RequestBuilder {
        let mut req = self.client.request(request.method, &request.url);

        let explicit_auth = request.headers.get("Authorization").is_some();
        match &self.config.auth {
            _ if explicit_auth => {}
            AuthMethod::Basic { username, password } => {
                req = req.basic_auth(username, Some(password));
            }
            AuthMethod::Bearer { token } => {
                req = req.bearer_auth(token);
            }
            AuthMethod::None => {}
        }

        for (name, value) in request.headers.to_pairs() {
            req = req.header(name, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        req
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: DavRequest) -> Result<DavResponse, CalDavError> {
        let method = request.method.clone();
        let url = request.url.clone();
        let resp = self.build_request(request).send().await?;

        let status = resp.status();
        let headers: BTreeMap<String, String> = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = resp.text().await?;

        if !status.is_success() {
            tracing::warn!(%method, %url, status = status.as_u16(), "request failed");
        }

        Ok(DavResponse {
            status: status.as_u16(),
            headers,
            ok: status.is_success(),
            body,
        })
    }
}
