//! An in-memory pod for tests.
//!
//! Behaves like a small Solid server for the requests the engine makes:
//! containers list their children with `ldp:contains`, every resource
//! advertises its access control document with `rel="acl"`, and SPARQL
//! patches are applied with the strict delete semantics real stores use
//! (deleting a triple that is not there fails with `409`).

use crate::{
    agent::WebId,
    client::{PodClient, PodResponse, TransportError, TransportErrorKind},
    graph::{sparql::UpdatePatch, turtle, Graph, Term, Triple},
    link::Link,
    resource_info::parent_container,
    vocab::{acp, ldp, media_type, rdf},
};
use dupe::Dupe;
use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap, HashSet},
    rc::Rc,
};
use url::Url;

/// Which access control protocol the pod speaks.
#[derive(Debug, Clone, Copy, Dupe, PartialEq, Eq)]
pub enum Protocol {
    AuthorizationList,
    AccessControlResource,
}

#[derive(Debug, Clone, Copy, Dupe, PartialEq, Eq, Hash)]
pub enum Method {
    Head,
    Get,
    Put,
    Patch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MemoryPod {
    web_id: WebId,
    inner: Rc<RefCell<Inner>>,
}

#[derive(Debug)]
struct Inner {
    protocol: Protocol,
    resources: BTreeMap<String, Option<String>>,
    access_documents: BTreeMap<String, String>,
    requests: Vec<RecordedRequest>,
    injected: HashMap<(Method, String), u16>,
    unreachable: HashSet<String>,
    advertise_acl: bool,
}

impl MemoryPod {
    /// An empty pod owned by `owner`, with a root container at `root`.
    pub fn new(protocol: Protocol, owner: &str, root: &str) -> Self {
        let pod = MemoryPod {
            web_id: WebId::new(owner),
            inner: Rc::new(RefCell::new(Inner {
                protocol,
                resources: BTreeMap::new(),
                access_documents: BTreeMap::new(),
                requests: Vec::new(),
                injected: HashMap::new(),
                unreachable: HashSet::new(),
                advertise_acl: true,
            })),
        };
        pod.add_container(root);
        pod
    }

    pub fn protocol(&self) -> Protocol {
        self.inner.borrow().protocol
    }

    /// Adds a container. In ACP mode an empty ACR is created alongside it.
    pub fn add_container(&self, url: &str) {
        self.add_resource(url, None);
    }

    pub fn add_file(&self, url: &str, body: &str) {
        self.add_resource(url, Some(body.to_string()));
    }

    fn add_resource(&self, url: &str, body: Option<String>) {
        let mut inner = self.inner.borrow_mut();
        inner.resources.insert(url.to_string(), body);
        if inner.protocol == Protocol::AccessControlResource {
            let acr = access_document_url(Protocol::AccessControlResource, url);
            let body = format!(
                "<{acr}> <{}> <{}>;\n    <{}> <{url}>.\n",
                rdf::TYPE,
                acp::ACCESS_CONTROL_RESOURCE,
                acp::RESOURCE
            );
            inner.access_documents.entry(acr).or_insert(body);
        }
    }

    /// Stores an access control document (`.acl` or ACR) verbatim.
    pub fn set_access_document(&self, url: &str, body: &str) {
        self.inner
            .borrow_mut()
            .access_documents
            .insert(url.to_string(), body.to_string());
    }

    pub fn access_document(&self, url: &str) -> Option<String> {
        self.inner.borrow().access_documents.get(url).cloned()
    }

    /// Makes every `method` request to `url` answer with `status`.
    pub fn inject_status(&self, method: Method, url: &str, status: u16) {
        self.inner
            .borrow_mut()
            .injected
            .insert((method, url.to_string()), status);
    }

    /// Makes every request to `url` fail at the transport level.
    pub fn make_unreachable(&self, url: &str) {
        self.inner.borrow_mut().unreachable.insert(url.to_string());
    }

    /// Stops advertising `rel="acl"` links.
    pub fn hide_acl_links(&self) {
        self.inner.borrow_mut().advertise_acl = false;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.borrow().requests.clone()
    }

    pub fn requests_with(&self, method: Method) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.inner.borrow_mut().requests.clear();
    }

    fn begin(
        &self,
        method: Method,
        url: &Url,
        body: Option<&str>,
    ) -> Result<Option<PodResponse>, TransportError> {
        let mut inner = self.inner.borrow_mut();
        inner.requests.push(RecordedRequest {
            method,
            url: url.to_string(),
            body: body.map(str::to_string),
        });

        if inner.unreachable.contains(url.as_str()) {
            return Err(TransportError::new(
                TransportErrorKind::Connect,
                format!("{url} is unreachable"),
            ));
        }

        Ok(inner
            .injected
            .get(&(method, url.to_string()))
            .map(|status| PodResponse::new(*status)))
    }

    fn links_for(&self, url: &Url) -> Vec<Link> {
        let inner = self.inner.borrow();
        let mut links = Vec::new();
        if inner.resources.contains_key(url.as_str()) {
            if inner.advertise_acl {
                links.push(Link::new(
                    access_document_url(inner.protocol, url.as_str()),
                    "acl",
                ));
            }
            let kind = if url.as_str().ends_with('/') {
                "http://www.w3.org/ns/ldp#BasicContainer"
            } else {
                "http://www.w3.org/ns/ldp#Resource"
            };
            links.push(Link::new(kind, "type"));
        } else if inner.protocol == Protocol::AccessControlResource
            && url.as_str().ends_with(".acr")
        {
            links.push(Link::new(acp::ACCESS_CONTROL_RESOURCE, "type"));
        }
        links
    }

    fn listing(&self, container: &Url) -> String {
        let inner = self.inner.borrow();
        let mut graph = Graph::new();
        for child in inner.resources.keys() {
            let Ok(child_url) = Url::parse(child) else {
                continue;
            };
            if parent_container(&child_url).as_ref() == Some(container) {
                graph.insert(Triple::new(
                    Term::iri(container.as_str()),
                    ldp::CONTAINS,
                    Term::iri(child),
                ));
            }
        }
        turtle::serialize(&graph)
    }

    fn apply_patch(&self, url: &Url, body: &str) -> u16 {
        let Ok(patch) = UpdatePatch::parse(body) else {
            return 400;
        };

        let mut inner = self.inner.borrow_mut();
        let mut graph = match inner.access_documents.get(url.as_str()) {
            Some(existing) => match turtle::parse(existing, Some(url)) {
                Ok(graph) => graph,
                Err(_) => return 500,
            },
            None => Graph::new(),
        };

        if patch.delete.iter().any(|t| !graph.contains(t)) {
            return 409;
        }
        for triple in &patch.delete {
            graph.remove(triple);
        }
        graph.extend(patch.insert);

        inner
            .access_documents
            .insert(url.to_string(), turtle::serialize(&graph));
        200
    }
}

fn access_document_url(protocol: Protocol, url: &str) -> String {
    match protocol {
        Protocol::AuthorizationList => format!("{url}.acl"),
        Protocol::AccessControlResource => format!("{url}.acr"),
    }
}

impl PodClient for MemoryPod {
    fn web_id(&self) -> &WebId {
        &self.web_id
    }

    async fn head(&self, url: &Url) -> Result<PodResponse, TransportError> {
        if let Some(injected) = self.begin(Method::Head, url, None)? {
            return Ok(injected);
        }

        let exists = {
            let inner = self.inner.borrow();
            inner.resources.contains_key(url.as_str())
                || inner.access_documents.contains_key(url.as_str())
        };
        let status = if exists { 200 } else { 404 };
        Ok(PodResponse::new(status).with_links(self.links_for(url)))
    }

    async fn get(&self, url: &Url, _accept: &str) -> Result<PodResponse, TransportError> {
        if let Some(injected) = self.begin(Method::Get, url, None)? {
            return Ok(injected);
        }

        let resource = self.inner.borrow().resources.get(url.as_str()).cloned();
        let response = match resource {
            Some(None) => PodResponse::new(200).with_body(media_type::TURTLE, self.listing(url)),
            Some(Some(body)) => PodResponse::new(200).with_body(media_type::TURTLE, body),
            None => match self.access_document(url.as_str()) {
                Some(body) => PodResponse::new(200).with_body(media_type::TURTLE, body),
                None => PodResponse::new(404),
            },
        };
        Ok(response.with_links(self.links_for(url)))
    }

    async fn put(
        &self,
        url: &Url,
        content_type: &str,
        body: String,
    ) -> Result<PodResponse, TransportError> {
        if let Some(injected) = self.begin(Method::Put, url, Some(&body))? {
            return Ok(injected);
        }
        if content_type != media_type::TURTLE {
            return Ok(PodResponse::new(415));
        }

        let existed = self.access_document(url.as_str()).is_some();
        self.set_access_document(url.as_str(), &body);
        Ok(PodResponse::new(if existed { 205 } else { 201 }))
    }

    async fn patch(
        &self,
        url: &Url,
        content_type: &str,
        body: String,
    ) -> Result<PodResponse, TransportError> {
        if let Some(injected) = self.begin(Method::Patch, url, Some(&body))? {
            return Ok(injected);
        }
        if content_type != media_type::SPARQL_UPDATE {
            return Ok(PodResponse::new(415));
        }
        Ok(PodResponse::new(self.apply_patch(url, &body)))
    }
}
