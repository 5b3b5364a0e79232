//! The entry point used by applications.

use crate::{
    agent::WebId,
    backend::{AccessBackend, AgentAccessMap, Backend},
    client::PodClient,
    enumerate::{self, ResourceDescriptor},
    error::BackendError,
    permission::PermissionSet,
    selector,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

/// Replace one agent's permissions on a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAccessUpdate {
    pub container: Url,
    pub agent: WebId,
    pub permissions: PermissionSet,
}

/// Replace the public's permissions on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAccessUpdate {
    pub resource: Url,
    pub permissions: PermissionSet,
}

/// Access control operations on a pod, dispatching to whichever protocol
/// each target speaks.
///
/// Every call probes its target again; nothing is cached. Concurrent updates
/// of the same container are not serialized, and the last one to be written
/// wins for the whole container.
#[derive(Debug, Clone)]
pub struct PodAccess<C: PodClient> {
    client: C,
}

impl<C: PodClient> PodAccess<C> {
    pub fn new(client: C) -> Self {
        PodAccess { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// The backend for `url`'s protocol.
    pub async fn backend_for(&self, url: &Url) -> Result<Backend, BackendError> {
        selector::select(&self.client, url).await
    }

    #[instrument(skip_all, fields(container = %update.container, agent = %update.agent))]
    pub async fn update_agent_access(&self, update: &AgentAccessUpdate) -> Result<(), BackendError> {
        let backend = self.backend_for(&update.container).await?;
        backend
            .update_agent_access(
                &self.client,
                &update.container,
                &update.agent,
                &update.permissions,
            )
            .await
    }

    #[instrument(skip_all, fields(resource = %update.resource))]
    pub async fn set_public_access(&self, update: &PublicAccessUpdate) -> Result<(), BackendError> {
        let backend = self.backend_for(&update.resource).await?;
        backend
            .set_public_access(&self.client, &update.resource, &update.permissions)
            .await
    }

    pub async fn get_agent_access_all(
        &self,
        resource: &Url,
    ) -> Result<AgentAccessMap, BackendError> {
        let backend = self.backend_for(resource).await?;
        backend.get_agent_access_all(&self.client, resource).await
    }

    pub async fn list_resources(&self, root: &Url) -> Result<Vec<ResourceDescriptor>, BackendError> {
        enumerate::list_resources(&self.client, root).await
    }
}
