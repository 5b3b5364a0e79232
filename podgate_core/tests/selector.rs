use podgate_core::{
    backend::Backend,
    client::TransportErrorKind,
    error::BackendError,
    memory::{Method, MemoryPod, Protocol},
    selector,
};
use testresult::TestResult;
use url::Url;

const ALICE: &str = "https://alice.example/profile/card#me";
const ROOT: &str = "https://pod.example/";
const SHARED: &str = "https://pod.example/shared/";

fn pod(protocol: Protocol) -> MemoryPod {
    test_utils::init_logging();
    let pod = MemoryPod::new(protocol, ALICE, ROOT);
    pod.add_container(SHARED);
    pod
}

fn shared() -> Url {
    Url::parse(SHARED).expect("test URL")
}

#[tokio::test]
async fn test_authorization_list_detected() -> TestResult {
    let pod = pod(Protocol::AuthorizationList);
    let backend = selector::select(&pod, &shared()).await?;
    assert!(matches!(backend, Backend::AuthorizationList(_)));
    assert_eq!(backend.to_string(), "authorization-list");
    Ok(())
}

#[tokio::test]
async fn test_authorization_list_detected_with_existing_acl() -> TestResult {
    let pod = pod(Protocol::AuthorizationList);
    pod.set_access_document("https://pod.example/shared/.acl", "");
    let backend = selector::select(&pod, &shared()).await?;
    assert!(matches!(backend, Backend::AuthorizationList(_)));
    Ok(())
}

#[tokio::test]
async fn test_access_control_resource_detected() -> TestResult {
    let pod = pod(Protocol::AccessControlResource);
    let backend = selector::select(&pod, &shared()).await?;
    assert!(matches!(backend, Backend::AccessControlResource(_)));
    Ok(())
}

#[tokio::test]
async fn test_every_call_probes_again() -> TestResult {
    let pod = pod(Protocol::AuthorizationList);
    selector::select(&pod, &shared()).await?;
    selector::select(&pod, &shared()).await?;
    assert_eq!(pod.requests_with(Method::Head).len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_missing_acl_link_fails_closed() -> TestResult {
    let pod = pod(Protocol::AuthorizationList);
    pod.hide_acl_links();

    let err = selector::select(&pod, &shared()).await.unwrap_err();
    assert!(matches!(
        err,
        BackendError::ProtocolDetectionFailed { source: None, .. }
    ));
    Ok(())
}

#[tokio::test]
async fn test_missing_container_fails_closed() -> TestResult {
    let pod = pod(Protocol::AuthorizationList);
    let missing = Url::parse("https://pod.example/nowhere/")?;

    let err = selector::select(&pod, &missing).await.unwrap_err();
    assert!(matches!(err, BackendError::ProtocolDetectionFailed { .. }));
    Ok(())
}

#[tokio::test]
async fn test_server_error_on_acl_fails_closed() -> TestResult {
    let pod = pod(Protocol::AuthorizationList);
    pod.inject_status(Method::Head, "https://pod.example/shared/.acl", 500);

    let err = selector::select(&pod, &shared()).await.unwrap_err();
    assert!(matches!(err, BackendError::ProtocolDetectionFailed { .. }));
    assert!(!err.is_retryable_by_rerun());
    Ok(())
}

#[tokio::test]
async fn test_transport_failure_fails_closed() -> TestResult {
    let pod = pod(Protocol::AccessControlResource);
    pod.make_unreachable(SHARED);

    let err = selector::select(&pod, &shared()).await.unwrap_err();
    let BackendError::ProtocolDetectionFailed {
        source: Some(source),
        ..
    } = &err
    else {
        panic!("expected a detection failure with a transport source, got {err:?}");
    };
    assert_eq!(source.kind(), TransportErrorKind::Connect);
    assert!(err.is_retryable_by_rerun());
    Ok(())
}
