//! Protocol backends.
//!
//! Both backends are stateless zero-sized values. Pick one with
//! [`select`][crate::selector::select] rather than constructing it directly,
//! since using the wrong protocol against a store would write documents of
//! the wrong shape.
//!
//! <div class="warning">
//!
//! Updates are read-modify-write with no compare-and-swap: two concurrent
//! updates of the *same* container race, and the last one to land wins for
//! the whole container, not per agent.
//!
//! </div>

pub mod access_control_resource;
pub mod authorization_list;

use crate::{
    agent::WebId,
    client::PodClient,
    error::BackendError,
    permission::{AccessFlags, PermissionSet},
};
use access_control_resource::AccessControlResource;
use authorization_list::AuthorizationList;
use derive_more::From;
use dupe::Dupe;
use std::{collections::BTreeMap, fmt};
use url::Url;

/// Effective access per agent on one resource.
pub type AgentAccessMap = BTreeMap<WebId, AccessFlags>;

/// Operations every access control protocol supports.
#[allow(async_fn_in_trait)]
pub trait AccessBackend {
    /// Replace `agent`'s permissions on `container` (both direct and
    /// inherited). An empty set removes the agent's grants entirely.
    async fn update_agent_access<C: PodClient>(
        &self,
        client: &C,
        container: &Url,
        agent: &WebId,
        permissions: &PermissionSet,
    ) -> Result<(), BackendError>;

    /// Replace the public's permissions on `resource`.
    async fn set_public_access<C: PodClient>(
        &self,
        client: &C,
        resource: &Url,
        permissions: &PermissionSet,
    ) -> Result<(), BackendError> {
        self.update_agent_access(client, resource, &WebId::public(), permissions)
            .await
    }

    /// Every agent with any access to `resource`, keyed by WebID. The public
    /// appears under [`WebId::public`].
    async fn get_agent_access_all<C: PodClient>(
        &self,
        client: &C,
        resource: &Url,
    ) -> Result<AgentAccessMap, BackendError>;
}

/// The backend for one protocol.
#[derive(Debug, Clone, Copy, Dupe, PartialEq, Eq, From)]
pub enum Backend {
    AuthorizationList(AuthorizationList),
    AccessControlResource(AccessControlResource),
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::AuthorizationList(_) => write!(f, "authorization-list"),
            Backend::AccessControlResource(_) => write!(f, "access-control-resource"),
        }
    }
}

impl AccessBackend for Backend {
    async fn update_agent_access<C: PodClient>(
        &self,
        client: &C,
        container: &Url,
        agent: &WebId,
        permissions: &PermissionSet,
    ) -> Result<(), BackendError> {
        match self {
            Backend::AuthorizationList(b) => {
                b.update_agent_access(client, container, agent, permissions)
                    .await
            }
            Backend::AccessControlResource(b) => {
                b.update_agent_access(client, container, agent, permissions)
                    .await
            }
        }
    }

    async fn get_agent_access_all<C: PodClient>(
        &self,
        client: &C,
        resource: &Url,
    ) -> Result<AgentAccessMap, BackendError> {
        match self {
            Backend::AuthorizationList(b) => b.get_agent_access_all(client, resource).await,
            Backend::AccessControlResource(b) => b.get_agent_access_all(client, resource).await,
        }
    }
}
