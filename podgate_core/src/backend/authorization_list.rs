//! Authorization-List (WAC) backend.
//!
//! A container's `.acl` document is a set of authorization blocks:
//!
//! ```turtle
//! <#grant-1f3a> a acl:Authorization;
//!     acl:agent <https://bob.example/profile#me>;
//!     acl:accessTo <./>;
//!     acl:mode acl:Read, acl:Write.
//! ```
//!
//! Updates never rewrite the whole document. The target agent's blocks are
//! deleted triple-for-triple and replaced with fresh ones in a single
//! `DELETE DATA` / `INSERT DATA` patch, so grants belonging to anyone else
//! are left exactly as they were.

use super::{AccessBackend, AgentAccessMap};
use crate::{
    agent::WebId,
    client::PodClient,
    error::BackendError,
    graph::{sparql::UpdatePatch, turtle, Graph, Iri, Term, Triple},
    permission::{AccessFlags, AccessScope, PermissionSet},
    resource_info::{acl_url_or_convention, parent_container, ResourceInfo},
    vocab::{acl, foaf, media_type, rdf},
};
use dupe::Dupe;
use rand::Rng;
use tracing::{debug, instrument};
use url::Url;

/// The WAC backend.
#[derive(Debug, Clone, Copy, Dupe, Default, PartialEq, Eq)]
pub struct AuthorizationList;

/// One `acl:Authorization` block as found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationBlock {
    pub id: Term,

    /// Agents named by `acl:agent`, plus [`WebId::public`] for
    /// `acl:agentClass foaf:Agent`.
    pub agents: Vec<WebId>,

    /// Number of principals other than plain agents (groups, other classes).
    pub other_principals: usize,

    pub access_to: Vec<Iri>,
    pub default_for: Vec<Iri>,
    pub permissions: PermissionSet,

    /// Every triple with this block as subject, exactly as parsed.
    pub triples: Vec<Triple>,
}

impl AuthorizationBlock {
    fn from_graph(graph: &Graph, id: &Term) -> Self {
        let mut agents = Vec::new();
        let mut other_principals = 0;

        for object in graph.objects(id, acl::AGENT) {
            match object.as_iri() {
                Some(iri) => agents.push(WebId::new(iri.as_str())),
                None => other_principals += 1,
            }
        }
        for object in graph.objects(id, acl::AGENT_CLASS) {
            if object.is_iri(foaf::AGENT) {
                agents.push(WebId::public());
            } else {
                other_principals += 1;
            }
        }
        other_principals += graph.objects(id, acl::AGENT_GROUP).count();

        let iris = |predicate: &str| {
            graph
                .objects(id, predicate)
                .filter_map(|o| o.as_iri().map(|i| i.dupe()))
                .collect::<Vec<Iri>>()
        };

        let modes: Vec<&str> = graph
            .objects(id, acl::MODE)
            .filter_map(|o| o.as_iri().map(|i| i.as_str()))
            .collect();

        AuthorizationBlock {
            id: id.clone(),
            agents,
            other_principals,
            access_to: iris(acl::ACCESS_TO),
            default_for: iris(acl::DEFAULT),
            permissions: PermissionSet::from_authorization_list_modes(modes),
            triples: graph.about(id).cloned().collect(),
        }
    }

    pub fn names(&self, agent: &WebId) -> bool {
        self.agents.contains(agent)
    }

    /// Whether anyone besides `agent` is granted access by this block.
    pub fn is_shared_beyond(&self, agent: &WebId) -> bool {
        self.other_principals > 0 || self.agents.iter().any(|a| a != agent)
    }

    pub fn applies_directly_to(&self, resource: &Url) -> bool {
        self.access_to.iter().any(|i| i.as_str() == resource.as_str())
    }

    pub fn applies_by_default_to(&self, container: &Url) -> bool {
        self.default_for
            .iter()
            .any(|i| i.as_str() == container.as_str())
    }

    pub fn scopes(&self) -> Vec<AccessScope> {
        let mut scopes = Vec::new();
        if !self.access_to.is_empty() {
            scopes.push(AccessScope::DirectAccess);
        }
        if !self.default_for.is_empty() {
            scopes.push(AccessScope::DefaultAccess);
        }
        scopes
    }
}

/// A parsed `.acl` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclDocument {
    pub url: Url,
    pub graph: Graph,
}

impl AclDocument {
    pub fn parse(url: &Url, body: &str) -> Result<Self, BackendError> {
        let graph = turtle::parse(body, Some(url)).map_err(|source| {
            BackendError::MalformedDocument {
                url: url.to_string(),
                source,
            }
        })?;
        Ok(AclDocument {
            url: url.clone(),
            graph,
        })
    }

    /// Every block declared `a acl:Authorization`.
    pub fn blocks(&self) -> Vec<AuthorizationBlock> {
        self.graph
            .instances_of(acl::AUTHORIZATION)
            .iter()
            .map(|id| AuthorizationBlock::from_graph(&self.graph, id))
            .collect()
    }

    /// Blocks naming `agent`, whether or not they carry a type declaration.
    pub fn blocks_for(&self, agent: &WebId) -> Vec<AuthorizationBlock> {
        let (predicate, object) = agent_triple_parts(agent);
        let mut ids: Vec<&Term> = Vec::new();
        for id in self.graph.subjects(predicate, &object) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids.into_iter()
            .map(|id| AuthorizationBlock::from_graph(&self.graph, id))
            .collect()
    }

    /// Computes the patch that replaces `agent`'s grants on `container` with
    /// `permissions`.
    ///
    /// Blocks naming only `agent` are deleted outright. Blocks shared with
    /// other principals only lose the triple naming `agent`. When
    /// `permissions` is non-empty, two fresh blocks are inserted, one per
    /// [`AccessScope`].
    pub fn plan_update<R: Rng>(
        &self,
        container: &Url,
        agent: &WebId,
        permissions: &PermissionSet,
        rng: &mut R,
    ) -> Result<UpdatePatch, BackendError> {
        let mut patch = UpdatePatch::new();

        let unaddressable = || BackendError::UnaddressableAuthorization {
            url: self.url.to_string(),
        };

        for block in self.blocks_for(agent) {
            if !matches!(block.id, Term::Iri(_)) {
                return Err(unaddressable());
            }

            if block.is_shared_beyond(agent) {
                let (predicate, object) = agent_triple_parts(agent);
                patch.delete(Triple::new(block.id.clone(), predicate, object));
            } else {
                // `DELETE DATA` cannot name blank nodes.
                if block
                    .triples
                    .iter()
                    .any(|t| matches!(t.object, Term::BlankNode(_)))
                {
                    return Err(unaddressable());
                }
                for triple in block.triples {
                    patch.delete(triple);
                }
            }
        }

        if !permissions.is_empty() {
            let mut taken: Vec<Iri> = Vec::new();
            for scope in AccessScope::BOTH {
                let id = self.fresh_block_id(rng, &taken);
                patch.insert_all(block_triples(&id, agent, &[scope], container, permissions));
                taken.push(id);
            }
        }

        Ok(patch)
    }

    fn fresh_block_id<R: Rng>(&self, rng: &mut R, taken: &[Iri]) -> Iri {
        let mut base = self.url.clone();
        base.set_fragment(None);
        loop {
            let candidate = Iri::new(format!("{}#grant-{:016x}", base, rng.gen::<u64>()));
            let term = Term::Iri(candidate.dupe());
            if !self.graph.has_subject(&term)
                && !self.graph.iter().any(|t| t.object == term)
                && !taken.contains(&candidate)
            {
                return candidate;
            }
        }
    }
}

/// The `(predicate, object)` naming `agent` inside a block.
fn agent_triple_parts(agent: &WebId) -> (&'static str, Term) {
    if agent.is_public() {
        (acl::AGENT_CLASS, Term::iri(foaf::AGENT))
    } else {
        (acl::AGENT, Term::iri(agent.as_str()))
    }
}

fn block_triples(
    id: &Iri,
    agent: &WebId,
    scopes: &[AccessScope],
    target: &Url,
    permissions: &PermissionSet,
) -> Vec<Triple> {
    let (agent_predicate, agent_object) = agent_triple_parts(agent);
    let mut triples = vec![
        Triple::new(id, rdf::TYPE, Term::iri(acl::AUTHORIZATION)),
        Triple::new(id, agent_predicate, agent_object),
    ];
    for scope in scopes {
        triples.push(Triple::new(
            id,
            scope.authorization_list_predicate(),
            Term::from(Iri::from(target)),
        ));
    }
    for mode in permissions.to_authorization_list_modes() {
        triples.push(Triple::new(id, acl::MODE, Term::iri(mode)));
    }
    triples
}

/// The document written when a container has no `.acl` yet.
///
/// The owner keeps full control of the container, so granting someone else
/// access can never lock the owner out.
pub fn initial_document<R: Rng>(
    acl_url: &Url,
    container: &Url,
    owner: &WebId,
    agent: &WebId,
    permissions: &PermissionSet,
    rng: &mut R,
) -> Graph {
    let empty = AclDocument {
        url: acl_url.clone(),
        graph: Graph::new(),
    };

    let mut base = acl_url.clone();
    base.set_fragment(None);
    let owner_id = Iri::new(format!("{base}#owner"));

    let mut graph: Graph = block_triples(
        &owner_id,
        owner,
        &AccessScope::BOTH,
        container,
        &PermissionSet::all(),
    )
    .into_iter()
    .collect();

    if agent != owner && !permissions.is_empty() {
        let mut taken = vec![owner_id];
        for scope in AccessScope::BOTH {
            let id = empty.fresh_block_id(rng, &taken);
            graph.extend(block_triples(&id, agent, &[scope], container, permissions));
            taken.push(id);
        }
    }

    graph
}

impl AuthorizationList {
    async fn fetch_document<C: PodClient>(
        client: &C,
        acl_url: &Url,
    ) -> Result<Option<AclDocument>, BackendError> {
        let response = client.get(acl_url, media_type::TURTLE).await?;
        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(BackendError::RemoteReadFailed {
                url: acl_url.to_string(),
                status: response.status,
            });
        }
        AclDocument::parse(acl_url, &response.body).map(Some)
    }
}

impl AccessBackend for AuthorizationList {
    #[instrument(skip_all, fields(container = %container, agent = %agent, permissions = %permissions))]
    async fn update_agent_access<C: PodClient>(
        &self,
        client: &C,
        container: &Url,
        agent: &WebId,
        permissions: &PermissionSet,
    ) -> Result<(), BackendError> {
        let info = ResourceInfo::fetch(client, container).await?;
        let acl_url = acl_url_or_convention(&info)?;

        let Some(document) = Self::fetch_document(client, &acl_url).await? else {
            let graph = {
                let mut rng = rand::thread_rng();
                initial_document(
                    &acl_url,
                    container,
                    client.web_id(),
                    agent,
                    permissions,
                    &mut rng,
                )
            };
            debug!(acl = %acl_url, triples = graph.len(), "creating access control document");

            let response = client
                .put(&acl_url, media_type::TURTLE, turtle::serialize(&graph))
                .await?;
            if !response.is_success() {
                return Err(BackendError::RemoteWriteRejected {
                    url: acl_url.to_string(),
                    status: response.status,
                });
            }
            return Ok(());
        };

        let patch = {
            let mut rng = rand::thread_rng();
            document.plan_update(container, agent, permissions, &mut rng)?
        };

        if patch.is_empty() {
            debug!(acl = %acl_url, "nothing to change");
            return Ok(());
        }

        debug!(
            acl = %acl_url,
            deleted = patch.delete.len(),
            inserted = patch.insert.len(),
            "patching access control document"
        );

        let response = client
            .patch(&acl_url, media_type::SPARQL_UPDATE, patch.to_sparql())
            .await?;
        if !response.is_success() {
            return Err(BackendError::RemoteWriteRejected {
                url: acl_url.to_string(),
                status: response.status,
            });
        }

        Ok(())
    }

    /// Reads the effective ACL: the resource's own document, or else the
    /// nearest ancestor's, whose `acl:default` blocks are inherited.
    #[instrument(skip_all, fields(resource = %resource))]
    async fn get_agent_access_all<C: PodClient>(
        &self,
        client: &C,
        resource: &Url,
    ) -> Result<AgentAccessMap, BackendError> {
        let mut current = resource.clone();
        let mut inherited = false;

        loop {
            let info = ResourceInfo::fetch(client, &current).await?;
            let acl_url = acl_url_or_convention(&info)?;

            match Self::fetch_document(client, &acl_url).await? {
                Some(document) => {
                    let applicable = document.blocks().into_iter().filter(|block| {
                        if inherited {
                            block.applies_by_default_to(&current)
                        } else {
                            block.applies_directly_to(resource)
                        }
                    });
                    return Ok(collect_access(applicable));
                }
                None => {
                    debug!(acl = %acl_url, "no access control document, checking parent");
                    match parent_container(&current) {
                        Some(parent) => {
                            current = parent;
                            inherited = true;
                        }
                        None => return Ok(AgentAccessMap::new()),
                    }
                }
            }
        }
    }
}

fn collect_access<I: IntoIterator<Item = AuthorizationBlock>>(blocks: I) -> AgentAccessMap {
    let mut access = AgentAccessMap::new();
    for block in blocks {
        let flags = AccessFlags::from(&block.permissions);
        if !flags.any() {
            continue;
        }
        for agent in block.agents {
            let entry = access.entry(agent).or_default();
            *entry = entry.union(flags);
        }
    }
    access
}

/// Permissions `agent` holds on `container` through blocks of `scope`.
pub fn granted<'a, I>(blocks: I, agent: &WebId, scope: AccessScope) -> PermissionSet
where
    I: IntoIterator<Item = &'a AuthorizationBlock>,
{
    blocks
        .into_iter()
        .filter(|b| b.names(agent) && b.scopes().contains(&scope))
        .flat_map(|b| b.permissions.iter())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Permission;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};

    const ALICE: &str = "https://alice.example/profile/card#me";
    const BOB: &str = "https://bob.example/profile/card#me";
    const CAROL: &str = "https://carol.example/profile/card#me";

    fn container() -> Url {
        Url::parse("https://pod.example/shared/").unwrap()
    }

    fn acl_url() -> Url {
        Url::parse("https://pod.example/shared/.acl").unwrap()
    }

    fn doc(body: &str) -> AclDocument {
        AclDocument::parse(&acl_url(), body).unwrap()
    }

    const TWO_AGENTS: &str = r#"
        @prefix acl: <http://www.w3.org/ns/auth/acl#>.

        <#owner> a acl:Authorization;
            acl:agent <https://alice.example/profile/card#me>;
            acl:accessTo <./>; acl:default <./>;
            acl:mode acl:Read, acl:Write, acl:Control.

        <#bob-direct> a acl:Authorization;
            acl:agent <https://bob.example/profile/card#me>;
            acl:accessTo <./>;
            acl:mode acl:Read.

        <#bob-default> a acl:Authorization;
            acl:agent <https://bob.example/profile/card#me>;
            acl:default <./>;
            acl:mode acl:Read.
    "#;

    #[test]
    fn test_blocks_are_parsed() {
        let document = doc(TWO_AGENTS);
        let blocks = document.blocks();
        assert_eq!(blocks.len(), 3);

        let bob = WebId::new(BOB);
        let bobs = document.blocks_for(&bob);
        assert_eq!(bobs.len(), 2);
        assert_eq!(
            granted(&bobs, &bob, AccessScope::DirectAccess),
            PermissionSet::from([Permission::Read])
        );
        assert!(bobs.iter().all(|b| !b.is_shared_beyond(&bob)));
        assert_eq!(bobs[0].triples.len(), 4);
    }

    #[test]
    fn test_plan_deletes_exact_triples_and_inserts_two_fresh_blocks() {
        let document = doc(TWO_AGENTS);
        let bob = WebId::new(BOB);
        let mut rng = StdRng::seed_from_u64(7);

        let patch = document
            .plan_update(
                &container(),
                &bob,
                &PermissionSet::from([Permission::Write, Permission::Control]),
                &mut rng,
            )
            .unwrap();

        let old: Vec<Triple> = document
            .blocks_for(&bob)
            .into_iter()
            .flat_map(|b| b.triples)
            .collect();
        assert_eq!(patch.delete, old);

        let inserted = Graph::from_iter(patch.insert.clone());
        let new_ids = inserted.instances_of(acl::AUTHORIZATION);
        assert_eq!(new_ids.len(), 2);
        for id in &new_ids {
            assert!(!document.graph.has_subject(id));
            let modes: Vec<&Term> = inserted.objects(id, acl::MODE).collect();
            assert_eq!(modes.len(), 2);
        }
        assert!(patch.delete.iter().all(|t| !t.subject.is_iri(
            "https://pod.example/shared/.acl#owner"
        )));
    }

    #[test]
    fn test_plan_revoke_has_no_insert() {
        let document = doc(TWO_AGENTS);
        let mut rng = StdRng::seed_from_u64(1);
        let patch = document
            .plan_update(&container(), &WebId::new(BOB), &PermissionSet::new(), &mut rng)
            .unwrap();
        assert_eq!(patch.delete.len(), 8);
        assert!(patch.insert.is_empty());
    }

    #[test]
    fn test_plan_noop_for_unknown_agent_revoke() {
        let document = doc(TWO_AGENTS);
        let mut rng = StdRng::seed_from_u64(1);
        let patch = document
            .plan_update(&container(), &WebId::new(CAROL), &PermissionSet::new(), &mut rng)
            .unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_shared_block_only_loses_the_agent() {
        let document = doc(
            r#"
            @prefix acl: <http://www.w3.org/ns/auth/acl#>.
            <#team> a acl:Authorization;
                acl:agent <https://bob.example/profile/card#me>, <https://carol.example/profile/card#me>;
                acl:accessTo <./>;
                acl:mode acl:Read.
        "#,
        );
        let mut rng = StdRng::seed_from_u64(3);
        let patch = document
            .plan_update(&container(), &WebId::new(BOB), &PermissionSet::new(), &mut rng)
            .unwrap();

        assert_eq!(
            patch.delete,
            vec![Triple::new(
                Term::iri("https://pod.example/shared/.acl#team"),
                acl::AGENT,
                Term::iri(BOB)
            )]
        );
    }

    #[test]
    fn test_public_uses_agent_class() {
        let document = doc(
            r#"
            @prefix acl: <http://www.w3.org/ns/auth/acl#>.
            @prefix foaf: <http://xmlns.com/foaf/0.1/>.
            <#public> a acl:Authorization; acl:agentClass foaf:Agent; acl:accessTo <./>; acl:mode acl:Read.
        "#,
        );
        let blocks = document.blocks_for(&WebId::public());
        assert_eq!(blocks.len(), 1);

        let mut rng = StdRng::seed_from_u64(3);
        let patch = document
            .plan_update(
                &container(),
                &WebId::public(),
                &PermissionSet::from([Permission::Read, Permission::Append]),
                &mut rng,
            )
            .unwrap();
        assert_eq!(patch.delete.len(), 4);
        assert!(patch
            .insert
            .iter()
            .any(|t| t.predicate.as_str() == acl::AGENT_CLASS && t.object.is_iri(foaf::AGENT)));
    }

    #[test]
    fn test_blank_node_block_is_unaddressable() {
        let document = doc(
            r#"
            @prefix acl: <http://www.w3.org/ns/auth/acl#>.
            [] a acl:Authorization; acl:agent <https://bob.example/profile/card#me>; acl:accessTo <./>; acl:mode acl:Read.
        "#,
        );
        let mut rng = StdRng::seed_from_u64(3);
        let err = document
            .plan_update(&container(), &WebId::new(BOB), &PermissionSet::new(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, BackendError::UnaddressableAuthorization { .. }));
    }

    #[test]
    fn test_blank_node_object_is_unaddressable() {
        let document = doc(
            r#"
            @prefix acl: <http://www.w3.org/ns/auth/acl#>.
            <#bob> a acl:Authorization;
                acl:agent <https://bob.example/profile/card#me>;
                acl:origin [ a acl:Origin ];
                acl:accessTo <./>; acl:mode acl:Read.
        "#,
        );
        let mut rng = StdRng::seed_from_u64(3);
        let err = document
            .plan_update(&container(), &WebId::new(BOB), &PermissionSet::new(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, BackendError::UnaddressableAuthorization { .. }));
    }

    #[test]
    fn test_blank_node_object_in_shared_block_is_left_alone() {
        let document = doc(
            r#"
            @prefix acl: <http://www.w3.org/ns/auth/acl#>.
            <#team> a acl:Authorization;
                acl:agent <https://bob.example/profile/card#me>, <https://carol.example/profile/card#me>;
                acl:origin [ a acl:Origin ];
                acl:accessTo <./>; acl:mode acl:Read.
        "#,
        );
        let mut rng = StdRng::seed_from_u64(3);
        let patch = document
            .plan_update(&container(), &WebId::new(BOB), &PermissionSet::new(), &mut rng)
            .unwrap();
        assert_eq!(patch.delete.len(), 1);
        assert!(patch.delete[0].object.is_iri(BOB));
    }

    #[test]
    fn test_anonymous_and_labelled_blocks_stay_apart() {
        let document = doc(
            r#"
            @prefix acl: <http://www.w3.org/ns/auth/acl#>.
            [] a acl:Authorization; acl:agent <https://bob.example/profile/card#me>;
                acl:accessTo <./>; acl:mode acl:Read.
            _:anon1 a acl:Authorization; acl:agent <https://carol.example/profile/card#me>;
                acl:accessTo <./>; acl:mode acl:Control.
        "#,
        );
        let blocks = document.blocks();
        assert_eq!(blocks.len(), 2);

        let access = collect_access(blocks);
        assert_eq!(
            access.get(&WebId::new(BOB)),
            Some(&AccessFlags::from(&PermissionSet::from([Permission::Read])))
        );
        assert_eq!(
            access.get(&WebId::new(CAROL)),
            Some(&AccessFlags::from(&PermissionSet::from([Permission::Control])))
        );
    }

    #[test]
    fn test_initial_document() {
        let mut rng = StdRng::seed_from_u64(11);
        let graph = initial_document(
            &acl_url(),
            &container(),
            &WebId::new(ALICE),
            &WebId::new(BOB),
            &PermissionSet::from([Permission::Read, Permission::Write]),
            &mut rng,
        );
        let document = AclDocument {
            url: acl_url(),
            graph,
        };

        assert_eq!(document.blocks().len(), 3);
        let alice = document.blocks_for(&WebId::new(ALICE));
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].permissions, PermissionSet::all());
        assert_eq!(alice[0].scopes().len(), 2);

        let bob = document.blocks_for(&WebId::new(BOB));
        assert_eq!(bob.len(), 2);
        for block in &bob {
            assert_eq!(block.scopes().len(), 1);
            assert_eq!(
                block.permissions,
                PermissionSet::from([Permission::Read, Permission::Write])
            );
        }
    }

    #[test]
    fn test_initial_document_for_owner_only() {
        let mut rng = StdRng::seed_from_u64(11);
        let graph = initial_document(
            &acl_url(),
            &container(),
            &WebId::new(ALICE),
            &WebId::new(ALICE),
            &PermissionSet::from([Permission::Read]),
            &mut rng,
        );
        let document = AclDocument {
            url: acl_url(),
            graph,
        };
        assert_eq!(document.blocks().len(), 1);
    }

    #[test]
    fn test_collect_access_unions_blocks() {
        let document = doc(TWO_AGENTS);
        let access = collect_access(document.blocks());
        assert_eq!(access.len(), 2);

        let alice = access[&WebId::new(ALICE)];
        assert!(alice.read && alice.write && alice.control_read && alice.control_write);
        assert!(!alice.append);
        assert_eq!(access[&WebId::new(BOB)].permissions(), PermissionSet::from([Permission::Read]));
    }
}
