//! Picks the backend matching a container's access control protocol.

use crate::{
    backend::{
        access_control_resource::AccessControlResource, authorization_list::AuthorizationList,
        Backend,
    },
    client::PodClient,
    error::BackendError,
    resource_info::ResourceInfo,
};
use tracing::{debug, instrument};
use url::Url;

/// Probes `container` and returns the backend for the protocol it speaks.
///
/// Fails closed: if the probe is inconclusive the error is returned rather
/// than guessing, since writing a document of the wrong protocol would
/// corrupt the store's access rules. Nothing is cached between calls.
#[instrument(skip_all, fields(container = %container))]
pub async fn select<C: PodClient>(client: &C, container: &Url) -> Result<Backend, BackendError> {
    let info = probe(client, container).await?;
    if !info.is_success() {
        return Err(BackendError::detection(
            container,
            format!("probe returned status {}", info.status),
        ));
    }

    let acl_url = info
        .linked_acl()
        .ok_or_else(|| BackendError::detection(container, "no rel=\"acl\" link advertised"))?;

    let acl_info = probe(client, &acl_url).await?;
    let backend = if acl_info.is_access_control_resource() {
        Backend::from(AccessControlResource)
    } else if acl_info.is_success() || acl_info.status == 404 {
        Backend::from(AuthorizationList)
    } else {
        return Err(BackendError::detection(
            &acl_url,
            format!("probe returned status {}", acl_info.status),
        ));
    };

    debug!(%backend, "selected backend");
    Ok(backend)
}

async fn probe<C: PodClient>(client: &C, url: &Url) -> Result<ResourceInfo, BackendError> {
    ResourceInfo::fetch(client, url).await.map_err(|e| match e {
        BackendError::Transport(source) => BackendError::ProtocolDetectionFailed {
            url: url.to_string(),
            reason: "probe request failed".to_string(),
            source: Some(source),
        },
        other => other,
    })
}
