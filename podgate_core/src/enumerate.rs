//! Listing a container's children together with who can access them.

use crate::{
    backend::{AccessBackend, AgentAccessMap},
    client::PodClient,
    error::BackendError,
    graph::{turtle, Term},
    selector,
    vocab::{ldp, media_type},
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{instrument, warn};
use url::Url;

/// Children never shown in listings.
pub const RESERVED_CHILDREN: [&str; 2] = ["inbox/", "access-history/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    File,
    Container,
}

/// Who can see a resource, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    /// Only one agent (normally the owner).
    Private,

    /// More than one agent, but not the public.
    Shared,

    /// The public has some access.
    Public,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::Private => write!(f, "private"),
            AccessLevel::Shared => write!(f, "shared"),
            AccessLevel::Public => write!(f, "public"),
        }
    }
}

/// Classifies an access map. The public takes precedence over everything.
pub fn classify(access: &AgentAccessMap) -> AccessLevel {
    let mut agents = 0;
    for (agent, flags) in access {
        if !flags.any() {
            continue;
        }
        if agent.is_public() {
            return AccessLevel::Public;
        }
        agents += 1;
    }

    if agents > 1 {
        AccessLevel::Shared
    } else {
        AccessLevel::Private
    }
}

/// Why one entry of a listing has no access level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ItemError {
    pub message: String,
    pub status: Option<u16>,
    pub not_found: bool,
}

impl From<&BackendError> for ItemError {
    fn from(err: &BackendError) -> Self {
        ItemError {
            message: err.to_string(),
            status: err.status(),
            not_found: err.is_not_found(),
        }
    }
}

/// One child of a listed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub url: Url,

    /// Name relative to the listed container, e.g. `photos/` or `notes.ttl`.
    pub path: String,

    pub kind: ResourceKind,

    /// Derived on every listing, never stored.
    pub access: Result<AccessLevel, ItemError>,
}

/// Lists the direct children of `root` and classifies each one's access.
///
/// The per-child access queries run concurrently on the current task.
/// Dropping the returned future cancels all of them. A failing child is
/// reported in its own [`ResourceDescriptor::access`]; only failing to read
/// `root` itself or to detect its protocol fails the whole call.
#[instrument(skip_all, fields(root = %root))]
pub async fn list_resources<C: PodClient>(
    client: &C,
    root: &Url,
) -> Result<Vec<ResourceDescriptor>, BackendError> {
    let children = list_children(client, root).await?;
    let backend = selector::select(client, root).await?;

    let queries = children
        .iter()
        .map(|(url, _)| backend.get_agent_access_all(client, url));
    let results = join_all(queries).await;

    Ok(children
        .into_iter()
        .zip(results)
        .map(|((url, path), result)| {
            let access = match result {
                Ok(access) => Ok(classify(&access)),
                Err(err) => {
                    warn!(resource = %url, error = %err, "could not read access");
                    Err(ItemError::from(&err))
                }
            };
            let kind = if path.ends_with('/') {
                ResourceKind::Container
            } else {
                ResourceKind::File
            };
            ResourceDescriptor {
                url,
                path,
                kind,
                access,
            }
        })
        .collect())
}

/// Direct, non-reserved children of `root` in listing order.
pub async fn list_children<C: PodClient>(
    client: &C,
    root: &Url,
) -> Result<Vec<(Url, String)>, BackendError> {
    let response = client.get(root, media_type::TURTLE).await?;
    if response.is_not_found() {
        return Err(BackendError::DocumentNotFound(root.to_string()));
    }
    if !response.is_success() {
        return Err(BackendError::RemoteReadFailed {
            url: root.to_string(),
            status: response.status,
        });
    }

    let graph = turtle::parse(&response.body, Some(root)).map_err(|source| {
        BackendError::MalformedDocument {
            url: root.to_string(),
            source,
        }
    })?;

    let root_term = Term::iri(root.as_str());
    let mut children = Vec::new();
    for child in graph.objects(&root_term, ldp::CONTAINS) {
        let Some(iri) = child.as_iri() else {
            continue;
        };
        let Some(name) = iri.as_str().strip_prefix(root.as_str()) else {
            continue;
        };
        if !is_listable(name) {
            continue;
        }
        let Ok(url) = Url::parse(iri.as_str()) else {
            continue;
        };
        if !children.iter().any(|(u, _)| u == &url) {
            children.push((url, name.to_string()));
        }
    }
    Ok(children)
}

fn is_listable(name: &str) -> bool {
    if name.is_empty() || RESERVED_CHILDREN.contains(&name) {
        return false;
    }
    let direct = name.strip_suffix('/').unwrap_or(name);
    !direct.is_empty() && !direct.contains('/')
}
