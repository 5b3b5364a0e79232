//! A [`PodClient`] speaking HTTP to a real pod.

#![warn(
    missing_debug_implementations,
    future_incompatible,
    let_underscore,
    rust_2021_compatibility,
    nonstandard_style
)]
#![deny(unreachable_pub)]

pub mod config;

use config::HttpConfig;
use podgate_core::{
    agent::WebId,
    client::{PodClient, PodResponse, TransportError, TransportErrorKind},
    link::Link,
};
use reqwest::{
    header::{HeaderMap, ACCEPT, CONTENT_TYPE, LINK},
    Method, RequestBuilder,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Longest timeout a client may be configured with.
pub const MAX_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("Timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds, got {0}")]
    InvalidTimeout(u64),

    #[error("Could not build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Sends pod requests with [`reqwest`], authenticated as one WebID.
#[derive(Debug, Clone)]
pub struct HttpPodClient {
    web_id: WebId,
    bearer_token: Option<String>,
    client: reqwest::Client,
}

impl HttpPodClient {
    pub fn new(config: HttpConfig) -> Result<Self, HttpClientError> {
        if config.timeout_secs == 0 || config.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(HttpClientError::InvalidTimeout(config.timeout_secs));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent)
            .build()?;

        Ok(HttpPodClient {
            web_id: config.web_id,
            bearer_token: config.bearer_token,
            client,
        })
    }

    fn request(&self, method: Method, url: &Url) -> RequestBuilder {
        let builder = self.client.request(method, url.clone());
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<PodResponse, TransportError> {
        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let links = response_links(response.headers(), &final_url);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(transport_error)?;

        debug!(status, links = links.len(), %final_url, "response received");

        let mut pod_response = PodResponse::new(status).with_links(links);
        pod_response.content_type = content_type;
        pod_response.body = body;
        Ok(pod_response)
    }
}

impl PodClient for HttpPodClient {
    fn web_id(&self) -> &WebId {
        &self.web_id
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn head(&self, url: &Url) -> Result<PodResponse, TransportError> {
        self.send(self.request(Method::HEAD, url)).await
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn get(&self, url: &Url, accept: &str) -> Result<PodResponse, TransportError> {
        let builder = self.request(Method::GET, url).header(ACCEPT, accept);
        self.send(builder).await
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn put(
        &self,
        url: &Url,
        content_type: &str,
        body: String,
    ) -> Result<PodResponse, TransportError> {
        let builder = self
            .request(Method::PUT, url)
            .header(CONTENT_TYPE, content_type)
            .body(body);
        self.send(builder).await
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn patch(
        &self,
        url: &Url,
        content_type: &str,
        body: String,
    ) -> Result<PodResponse, TransportError> {
        let builder = self
            .request(Method::PATCH, url)
            .header(CONTENT_TYPE, content_type)
            .body(body);
        self.send(builder).await
    }
}

/// Every `Link` header on a response, resolved against `base`.
///
/// `base` must be the URL the response came from, which differs from the
/// request URL once a redirect has been followed.
pub fn response_links(headers: &HeaderMap, base: &Url) -> Vec<Link> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Link::parse_header(v, base))
        .collect()
}

fn transport_error(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, err)
}
