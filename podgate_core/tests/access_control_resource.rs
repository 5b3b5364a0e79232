use podgate_core::{
    agent::WebId,
    backend::{
        access_control_resource::{AccessControlResource, AcrDocument},
        AccessBackend,
    },
    error::BackendError,
    graph::{Term, Triple},
    memory::{Method, MemoryPod, Protocol},
    permission::{AccessFlags, Permission, PermissionSet},
    pod_access::{AgentAccessUpdate, PodAccess, PublicAccessUpdate},
    vocab::acp,
};
use pretty_assertions::assert_eq;
use testresult::TestResult;
use url::Url;

const ALICE: &str = "https://alice.example/profile/card#me";
const BOB: &str = "https://bob.example/profile/card#me";
const CAROL: &str = "https://carol.example/profile/card#me";

const ROOT: &str = "https://pod.example/";
const SHARED: &str = "https://pod.example/shared/";
const SHARED_ACR: &str = "https://pod.example/shared/.acr";

fn setup() -> MemoryPod {
    test_utils::init_logging();
    test_utils::add_nickname(BOB, "bob");
    test_utils::add_nickname(CAROL, "carol");

    let pod = MemoryPod::new(Protocol::AccessControlResource, ALICE, ROOT);
    pod.add_container(SHARED);
    pod
}

fn url(s: &str) -> Url {
    Url::parse(s).expect("test URL")
}

fn document(pod: &MemoryPod) -> AcrDocument {
    let body = pod.access_document(SHARED_ACR).expect("ACR exists");
    AcrDocument::parse(&url(SHARED_ACR), &body).expect("ACR parses")
}

fn update(agent: &str, permissions: &[Permission]) -> AgentAccessUpdate {
    AgentAccessUpdate {
        container: url(SHARED),
        agent: WebId::new(agent),
        permissions: permissions.iter().copied().collect(),
    }
}

#[tokio::test]
async fn test_control_grants_both_halves() -> TestResult {
    let pod = setup();
    let access = PodAccess::new(pod.clone());

    access
        .update_agent_access(&update(BOB, &[Permission::Read, Permission::Control]))
        .await?;

    let bob = access.get_agent_access_all(&url(SHARED)).await?[&WebId::new(BOB)];
    assert_eq!(
        bob,
        AccessFlags {
            read: true,
            write: false,
            append: false,
            control_read: true,
            control_write: true,
        }
    );
    assert_eq!(
        bob.permissions(),
        PermissionSet::from([Permission::Read, Permission::Control])
    );
    Ok(())
}

#[tokio::test]
async fn test_dropping_control_clears_both_halves() -> TestResult {
    let pod = setup();
    let access = PodAccess::new(pod.clone());

    access
        .update_agent_access(&update(BOB, &[Permission::Read, Permission::Control]))
        .await?;
    access
        .update_agent_access(&update(BOB, &[Permission::Read]))
        .await?;

    let bob = document(&pod).agent_access()[&WebId::new(BOB)];
    assert!(bob.read);
    assert!(!bob.control_read);
    assert!(!bob.control_write);
    Ok(())
}

#[tokio::test]
async fn test_update_wires_member_access_control() -> TestResult {
    let pod = setup();

    PodAccess::new(pod.clone())
        .update_agent_access(&update(BOB, &[Permission::Read]))
        .await?;

    let graph = document(&pod).graph;
    for name in ["defaultAccessControl", "defaultAcrAccessControl"] {
        assert!(graph.contains(&Triple::new(
            Term::iri(SHARED_ACR),
            acp::MEMBER_ACCESS_CONTROL,
            Term::iri(format!("{SHARED_ACR}#{name}")),
        )));
    }

    // One patch for the agent, one for the wiring.
    assert_eq!(pod.requests_with(Method::Patch).len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_repeated_update_still_wires() -> TestResult {
    let pod = setup();
    let access = PodAccess::new(pod.clone());

    access
        .update_agent_access(&update(BOB, &[Permission::Write]))
        .await?;
    pod.clear_requests();
    access
        .update_agent_access(&update(BOB, &[Permission::Write]))
        .await?;

    let patches = pod.requests_with(Method::Patch);
    assert_eq!(patches.len(), 1);
    assert!(patches[0]
        .body
        .as_deref()
        .is_some_and(|b| b.contains(acp::MEMBER_ACCESS_CONTROL)));
    Ok(())
}

#[tokio::test]
async fn test_other_agents_keep_their_access() -> TestResult {
    let pod = setup();
    let access = PodAccess::new(pod.clone());

    access
        .update_agent_access(&update(CAROL, &[Permission::Append]))
        .await?;
    access
        .update_agent_access(&update(BOB, &[Permission::Read, Permission::Write]))
        .await?;
    access.update_agent_access(&update(BOB, &[])).await?;

    let all = access.get_agent_access_all(&url(SHARED)).await?;
    assert!(!all.contains_key(&WebId::new(BOB)));
    assert_eq!(
        all[&WebId::new(CAROL)].permissions(),
        PermissionSet::from([Permission::Append])
    );
    Ok(())
}

#[tokio::test]
async fn test_public_access_uses_public_agent() -> TestResult {
    let pod = setup();
    let access = PodAccess::new(pod.clone());

    access
        .set_public_access(&PublicAccessUpdate {
            resource: url(SHARED),
            permissions: PermissionSet::from([Permission::Read]),
        })
        .await?;

    let graph = document(&pod).graph;
    assert!(graph.iter().any(|t| t.object.is_iri(acp::PUBLIC_AGENT)));

    let all = access.get_agent_access_all(&url(SHARED)).await?;
    assert!(all[&WebId::public()].read);
    Ok(())
}

#[tokio::test]
async fn test_missing_acr_is_not_found() -> TestResult {
    let pod = setup();
    pod.inject_status(Method::Get, SHARED_ACR, 404);

    let err = AccessControlResource
        .get_agent_access_all(&pod, &url(SHARED))
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::DocumentNotFound(_)));
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn test_rejected_patch_keeps_status() -> TestResult {
    let pod = setup();
    pod.inject_status(Method::Patch, SHARED_ACR, 403);

    let err = PodAccess::new(pod.clone())
        .update_agent_access(&update(BOB, &[Permission::Read]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BackendError::RemoteWriteRejected { status: 403, .. }
    ));
    Ok(())
}

#[tokio::test]
async fn test_foreign_policies_are_read() -> TestResult {
    let pod = setup();
    pod.set_access_document(
        SHARED_ACR,
        r#"
        @prefix acp: <http://www.w3.org/ns/solid/acp#>.
        @prefix acl: <http://www.w3.org/ns/auth/acl#>.

        <> a acp:AccessControlResource;
            acp:accessControl <#ownerControl>.
        <#ownerControl> acp:apply <#ownerPolicy>.
        <#ownerPolicy> acp:allow acl:Read, acl:Write;
            acp:allOf <#ownerMatcher>.
        <#ownerMatcher> acp:agent <https://alice.example/profile/card#me>.
        "#,
    );

    let all = AccessControlResource
        .get_agent_access_all(&pod, &url(SHARED))
        .await?;
    assert_eq!(
        all[&WebId::new(ALICE)].permissions(),
        PermissionSet::from([Permission::Read, Permission::Write])
    );
    Ok(())
}
