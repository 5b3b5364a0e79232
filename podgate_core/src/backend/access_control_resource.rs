//! Access-Control-Resource (ACP) backend.
//!
//! Every resource has an access control resource (ACR). The engine manages a
//! fixed set of policies in it, one per wire flag, each matching a list of
//! agents:
//!
//! ```turtle
//! <acr> acp:accessControl <#defaultAccessControl>;
//!       acp:access <#defaultAcrAccessControl>.
//! <#defaultAccessControl> acp:apply <#defaultAccessControlAgentMatcherReadPolicy>.
//! <#defaultAccessControlAgentMatcherReadPolicy>
//!     acp:allow acl:Read;
//!     acp:anyOf <#defaultAccessControlAgentMatcherRead>.
//! <#defaultAccessControlAgentMatcherRead> acp:agent <https://bob.example/profile#me>.
//! ```
//!
//! Policies hung off `acp:access` govern the ACR itself: `acl:Read` there is
//! `controlRead`, `acl:Write` is `controlWrite`.

use super::{AccessBackend, AgentAccessMap};
use crate::{
    agent::WebId,
    client::PodClient,
    error::BackendError,
    graph::{sparql::UpdatePatch, turtle, Graph, Iri, Term, Triple},
    permission::{AccessFlags, PermissionSet},
    resource_info::ResourceInfo,
    vocab::{acl, acp, media_type, rdf},
};
use dupe::Dupe;
use tracing::{debug, instrument};
use url::Url;

/// The ACP backend.
#[derive(Debug, Clone, Copy, Dupe, Default, PartialEq, Eq)]
pub struct AccessControlResource;

const RESOURCE_ACCESS_CONTROL: &str = "defaultAccessControl";
const ACR_ACCESS_CONTROL: &str = "defaultAcrAccessControl";

/// The five wire flags, each backed by one managed policy.
#[derive(Debug, Clone, Copy, Dupe, PartialEq, Eq)]
enum ManagedFlag {
    Read,
    Write,
    Append,
    ControlRead,
    ControlWrite,
}

impl ManagedFlag {
    const ALL: [ManagedFlag; 5] = [
        ManagedFlag::Read,
        ManagedFlag::Write,
        ManagedFlag::Append,
        ManagedFlag::ControlRead,
        ManagedFlag::ControlWrite,
    ];

    fn is_set(&self, flags: &AccessFlags) -> bool {
        match self {
            ManagedFlag::Read => flags.read,
            ManagedFlag::Write => flags.write,
            ManagedFlag::Append => flags.append,
            ManagedFlag::ControlRead => flags.control_read,
            ManagedFlag::ControlWrite => flags.control_write,
        }
    }

    fn governs_acr(&self) -> bool {
        matches!(self, ManagedFlag::ControlRead | ManagedFlag::ControlWrite)
    }

    fn access_control(&self) -> &'static str {
        if self.governs_acr() {
            ACR_ACCESS_CONTROL
        } else {
            RESOURCE_ACCESS_CONTROL
        }
    }

    /// The predicate linking the ACR to this flag's access control.
    fn link_predicate(&self) -> &'static str {
        if self.governs_acr() {
            acp::ACCESS
        } else {
            acp::ACCESS_CONTROL_LINK
        }
    }

    fn allowed_mode(&self) -> &'static str {
        match self {
            ManagedFlag::Read | ManagedFlag::ControlRead => acl::READ,
            ManagedFlag::Write | ManagedFlag::ControlWrite => acl::WRITE,
            ManagedFlag::Append => acl::APPEND,
        }
    }

    fn mode_name(&self) -> &'static str {
        match self {
            ManagedFlag::Read | ManagedFlag::ControlRead => "Read",
            ManagedFlag::Write | ManagedFlag::ControlWrite => "Write",
            ManagedFlag::Append => "Append",
        }
    }
}

/// A parsed access control resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcrDocument {
    pub url: Url,
    pub graph: Graph,
}

impl AcrDocument {
    pub fn parse(url: &Url, body: &str) -> Result<Self, BackendError> {
        let graph = turtle::parse(body, Some(url)).map_err(|source| {
            BackendError::MalformedDocument {
                url: url.to_string(),
                source,
            }
        })?;
        Ok(AcrDocument {
            url: url.clone(),
            graph,
        })
    }

    fn subject(&self) -> Term {
        Term::from(Iri::from(&self.url))
    }

    fn local(&self, name: &str) -> Iri {
        local_iri(&self.url, name)
    }

    fn matcher(&self, flag: ManagedFlag) -> Iri {
        self.local(&format!(
            "{}AgentMatcher{}",
            flag.access_control(),
            flag.mode_name()
        ))
    }

    fn policy(&self, flag: ManagedFlag) -> Iri {
        self.local(&format!(
            "{}AgentMatcher{}Policy",
            flag.access_control(),
            flag.mode_name()
        ))
    }

    /// The policy and matcher triples needed before `flag` can list agents.
    fn skeleton(&self, flag: ManagedFlag) -> Vec<Triple> {
        let access_control = self.local(flag.access_control());
        let policy = self.policy(flag);
        let matcher = self.matcher(flag);
        vec![
            Triple::new(self.subject(), rdf::TYPE, Term::iri(acp::ACCESS_CONTROL_RESOURCE)),
            Triple::new(self.subject(), flag.link_predicate(), &access_control),
            Triple::new(&access_control, rdf::TYPE, Term::iri(acp::ACCESS_CONTROL)),
            Triple::new(&access_control, acp::APPLY, &policy),
            Triple::new(&policy, rdf::TYPE, Term::iri(acp::POLICY)),
            Triple::new(&policy, acp::ALLOW, Term::iri(flag.allowed_mode())),
            Triple::new(&policy, acp::ANY_OF, &matcher),
            Triple::new(&matcher, rdf::TYPE, Term::iri(acp::MATCHER)),
        ]
    }

    /// Computes the patch that sets `agent`'s managed flags to `flags`.
    ///
    /// Only the agent's own matcher entries are touched; the skeleton is
    /// re-inserted when a flag is turned on, which the store treats as a
    /// no-op for triples it already has.
    pub fn plan_set_agent_access(&self, agent: &WebId, flags: &AccessFlags) -> UpdatePatch {
        let agent_term = agent_term(agent);
        let mut patch = UpdatePatch::new();

        for flag in ManagedFlag::ALL {
            let membership = Triple::new(&self.matcher(flag), acp::AGENT, agent_term.clone());
            let present = self.graph.contains(&membership);
            let wanted = flag.is_set(flags);

            if wanted && !present {
                patch.insert_all(
                    self.skeleton(flag)
                        .into_iter()
                        .filter(|t| !self.graph.contains(t)),
                );
                patch.insert(membership);
            } else if !wanted && present {
                patch.delete(membership);
            }
        }

        patch
    }

    /// Effective flags per agent, following the links actually present in
    /// the document rather than assuming the managed names.
    pub fn agent_access(&self) -> AgentAccessMap {
        let mut access = AgentAccessMap::new();
        let subject = self.subject();

        for (link, governs_acr) in [(acp::ACCESS_CONTROL_LINK, false), (acp::ACCESS, true)] {
            for access_control in self.graph.objects(&subject, link) {
                for policy in self.graph.objects(access_control, acp::APPLY) {
                    let mut flags = AccessFlags::none();
                    for mode in self.graph.objects(policy, acp::ALLOW) {
                        match (mode.as_iri().map(|i| i.as_str()), governs_acr) {
                            (Some(acl::READ), false) => flags.read = true,
                            (Some(acl::WRITE), false) => flags.write = true,
                            (Some(acl::APPEND), false) => flags.append = true,
                            (Some(acl::READ), true) => flags.control_read = true,
                            (Some(acl::WRITE), true) => flags.control_write = true,
                            (other, _) => {
                                debug!(mode = ?other, "ignoring unknown policy mode")
                            }
                        }
                    }
                    if !flags.any() {
                        continue;
                    }

                    let matchers = self
                        .graph
                        .objects(policy, acp::ALL_OF)
                        .chain(self.graph.objects(policy, acp::ANY_OF));
                    for matcher in matchers {
                        for agent in self.graph.objects(matcher, acp::AGENT) {
                            let Some(iri) = agent.as_iri() else {
                                continue;
                            };
                            let agent = if iri.as_str() == acp::PUBLIC_AGENT {
                                WebId::public()
                            } else {
                                WebId::new(iri.as_str())
                            };
                            let entry = access.entry(agent).or_default();
                            *entry = entry.union(flags);
                        }
                    }
                }
            }
        }

        access
    }
}

fn local_iri(acr_url: &Url, name: &str) -> Iri {
    let mut base = acr_url.clone();
    base.set_fragment(Some(name));
    Iri::from(&base)
}

fn agent_term(agent: &WebId) -> Term {
    if agent.is_public() {
        Term::iri(acp::PUBLIC_AGENT)
    } else {
        Term::iri(agent.as_str())
    }
}

/// The patch linking `acr_url`'s member access control slot to the managed
/// access controls, so that resources created under the container inherit
/// them.
pub fn inheritance_patch(acr_url: &Url) -> UpdatePatch {
    let subject = Term::from(Iri::from(acr_url));
    let mut patch = UpdatePatch::new();
    for name in [RESOURCE_ACCESS_CONTROL, ACR_ACCESS_CONTROL] {
        patch.insert(Triple::new(
            subject.clone(),
            acp::MEMBER_ACCESS_CONTROL,
            &local_iri(acr_url, name),
        ));
    }
    patch
}

impl AccessControlResource {
    async fn acr_url<C: PodClient>(client: &C, resource: &Url) -> Result<Url, BackendError> {
        let info = ResourceInfo::fetch(client, resource).await?;
        info.linked_acl().ok_or_else(|| {
            BackendError::detection(resource, "no access control resource advertised")
        })
    }

    async fn fetch_document<C: PodClient>(
        client: &C,
        acr_url: &Url,
    ) -> Result<AcrDocument, BackendError> {
        let response = client.get(acr_url, media_type::TURTLE).await?;
        if response.is_not_found() {
            return Err(BackendError::DocumentNotFound(acr_url.to_string()));
        }
        if !response.is_success() {
            return Err(BackendError::RemoteReadFailed {
                url: acr_url.to_string(),
                status: response.status,
            });
        }
        AcrDocument::parse(acr_url, &response.body)
    }

    async fn submit<C: PodClient>(
        client: &C,
        acr_url: &Url,
        patch: &UpdatePatch,
    ) -> Result<(), BackendError> {
        let response = client
            .patch(acr_url, media_type::SPARQL_UPDATE, patch.to_sparql())
            .await?;
        if !response.is_success() {
            return Err(BackendError::RemoteWriteRejected {
                url: acr_url.to_string(),
                status: response.status,
            });
        }
        Ok(())
    }

    /// Sets `agent`'s flags on `resource`. Last write wins per agent.
    #[instrument(skip_all, fields(resource = %resource, agent = %agent))]
    pub async fn set_agent_access<C: PodClient>(
        &self,
        client: &C,
        resource: &Url,
        agent: &WebId,
        flags: &AccessFlags,
    ) -> Result<(), BackendError> {
        let acr_url = Self::acr_url(client, resource).await?;
        let document = Self::fetch_document(client, &acr_url).await?;
        let patch = document.plan_set_agent_access(agent, flags);

        if patch.is_empty() {
            debug!(acr = %acr_url, "agent access already as requested");
            return Ok(());
        }

        debug!(
            acr = %acr_url,
            deleted = patch.delete.len(),
            inserted = patch.insert.len(),
            "patching access control resource"
        );
        Self::submit(client, &acr_url, &patch).await
    }

    /// Links the container's member access control to the managed access
    /// controls. Safe to repeat: inserting triples the store already holds
    /// succeeds.
    #[instrument(skip_all, fields(container = %container))]
    pub async fn wire_inheritance<C: PodClient>(
        &self,
        client: &C,
        container: &Url,
    ) -> Result<(), BackendError> {
        let acr_url = Self::acr_url(client, container).await?;
        Self::submit(client, &acr_url, &inheritance_patch(&acr_url)).await
    }
}

impl AccessBackend for AccessControlResource {
    async fn update_agent_access<C: PodClient>(
        &self,
        client: &C,
        container: &Url,
        agent: &WebId,
        permissions: &PermissionSet,
    ) -> Result<(), BackendError> {
        let flags = AccessFlags::from(permissions);
        self.set_agent_access(client, container, agent, &flags)
            .await?;

        // TODO: hoist into container creation once callers expose that hook;
        // it costs a HEAD and a PATCH on every update.
        self.wire_inheritance(client, container).await
    }

    #[instrument(skip_all, fields(resource = %resource))]
    async fn get_agent_access_all<C: PodClient>(
        &self,
        client: &C,
        resource: &Url,
    ) -> Result<AgentAccessMap, BackendError> {
        let acr_url = Self::acr_url(client, resource).await?;
        let document = Self::fetch_document(client, &acr_url).await?;
        Ok(document.agent_access())
    }
}
