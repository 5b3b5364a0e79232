//! The seam between the engine and the remote store.

use crate::{agent::WebId, link::Link};
use std::fmt;
use thiserror::Error;
use url::Url;

/// A response from the remote store.
///
/// Non-success statuses are ordinary responses, not errors; the caller
/// decides what a `404` or `409` means in context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodResponse {
    pub status: u16,
    pub links: Vec<Link>,
    pub content_type: Option<String>,
    pub body: String,
}

impl PodResponse {
    pub fn new(status: u16) -> Self {
        PodResponse {
            status,
            links: Vec::new(),
            content_type: None,
            body: String::new(),
        }
    }

    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = links;
        self
    }

    pub fn with_body<S: Into<String>>(mut self, content_type: &str, body: S) -> Self {
        self.content_type = Some(content_type.to_string());
        self.body = body.into();
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// The request never produced a response, because the connection failed or
/// timed out.
#[derive(Debug, Error)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Other,
}

impl TransportError {
    pub fn new<E>(kind: TransportErrorKind, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        TransportError {
            kind,
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TransportErrorKind::Connect => "connection failed",
            TransportErrorKind::Timeout => "request timed out",
            TransportErrorKind::Other => "transport error",
        };
        match &self.source {
            Some(source) => write!(f, "{kind}: {source}"),
            None => f.write_str(kind),
        }
    }
}

/// HTTP-style access to a pod on behalf of an authenticated user.
///
/// Implementations own authentication, retries and timeouts.
///
/// <div class="warning">
///
/// Note that we assume single-threaded async.
///
/// </div>
#[allow(async_fn_in_trait)]
pub trait PodClient {
    /// The WebID of the user this client acts for.
    fn web_id(&self) -> &WebId;

    async fn head(&self, url: &Url) -> Result<PodResponse, TransportError>;

    async fn get(&self, url: &Url, accept: &str) -> Result<PodResponse, TransportError>;

    /// Create-or-replace.
    async fn put(
        &self,
        url: &Url,
        content_type: &str,
        body: String,
    ) -> Result<PodResponse, TransportError>;

    async fn patch(
        &self,
        url: &Url,
        content_type: &str,
        body: String,
    ) -> Result<PodResponse, TransportError>;
}

impl<C: PodClient> PodClient for &C {
    fn web_id(&self) -> &WebId {
        (**self).web_id()
    }

    async fn head(&self, url: &Url) -> Result<PodResponse, TransportError> {
        (**self).head(url).await
    }

    async fn get(&self, url: &Url, accept: &str) -> Result<PodResponse, TransportError> {
        (**self).get(url, accept).await
    }

    async fn put(
        &self,
        url: &Url,
        content_type: &str,
        body: String,
    ) -> Result<PodResponse, TransportError> {
        (**self).put(url, content_type, body).await
    }

    async fn patch(
        &self,
        url: &Url,
        content_type: &str,
        body: String,
    ) -> Result<PodResponse, TransportError> {
        (**self).patch(url, content_type, body).await
    }
}
