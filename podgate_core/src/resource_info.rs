//! Metadata a pod advertises about a resource.

use crate::{
    client::PodClient,
    error::BackendError,
    link::{find_rel, Link},
    vocab::acp,
};
use url::Url;

/// The result of a `HEAD` on a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    pub url: Url,
    pub status: u16,
    pub links: Vec<Link>,
}

impl ResourceInfo {
    #[tracing::instrument(skip_all, fields(url = %url))]
    pub async fn fetch<C: PodClient>(client: &C, url: &Url) -> Result<Self, BackendError> {
        let response = client.head(url).await?;
        Ok(ResourceInfo {
            url: url.clone(),
            status: response.status,
            links: response.links,
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The access control document advertised with `rel="acl"`.
    ///
    /// On WAC servers this is the `.acl` document, on ACP servers the ACR.
    pub fn linked_acl(&self) -> Option<Url> {
        find_rel(&self.links, "acl").and_then(|l| Url::parse(&l.target).ok())
    }

    /// Whether this resource declares itself an ACP access control resource.
    pub fn is_access_control_resource(&self) -> bool {
        self.links
            .iter()
            .any(|l| l.rel == "type" && l.target == acp::ACCESS_CONTROL_RESOURCE)
    }
}

/// The URL of `resource`'s access control document: the advertised one, or
/// the `.acl` naming convention.
pub(crate) fn acl_url_or_convention(info: &ResourceInfo) -> Result<Url, BackendError> {
    if let Some(url) = info.linked_acl() {
        return Ok(url);
    }

    let convention = format!("{}.acl", info.url.as_str());
    Url::parse(&convention).map_err(|e| {
        BackendError::detection(&info.url, format!("cannot derive ACL location: {e}"))
    })
}

/// The parent container of `url`, or `None` at the root.
pub fn parent_container(url: &Url) -> Option<Url> {
    let path = url.path();
    if path == "/" || path.is_empty() {
        return None;
    }

    let trimmed = path.strip_suffix('/').unwrap_or(path);
    let cut = trimmed.rfind('/')?;
    let mut parent = url.clone();
    parent.set_path(&trimmed[..=cut]);
    parent.set_query(None);
    parent.set_fragment(None);
    Some(parent)
}
