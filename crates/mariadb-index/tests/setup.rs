//! Startup index setup against an in-memory registrar

use std::sync::Mutex;

use async_trait::async_trait;
use mariadb_common::field_paths::{
    MARIADB_FIELD_PATHS, MARIADB_MY_CNF_CONFIG_MAP, MARIADB_TLS_SERVER_CERT_SECRET,
    MAXSCALE_METRICS_PASSWORD_SECRET,
};
use mariadb_common::{Error, Result, WATCH_LABEL};
use mariadb_index::{index_mariadb, index_maxscale, WatchRegistrar, WatchRequest, WatchedKind};

/// Keeps every request and rejects the one for `fail_on`
#[derive(Default)]
struct RecordingRegistrar {
    fail_on: Option<&'static str>,
    requests: Mutex<Vec<WatchRequest>>,
}

impl RecordingRegistrar {
    fn new() -> Self {
        Self::default()
    }

    fn failing_on(token: &'static str) -> Self {
        Self {
            fail_on: Some(token),
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<WatchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WatchRegistrar for RecordingRegistrar {
    async fn register(&self, request: &WatchRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_on == Some(request.token.as_str()) {
            return Err(request.error("forbidden"));
        }
        Ok(())
    }
}

#[tokio::test]
async fn mariadb_binds_every_token_in_fixed_order() {
    let registrar = RecordingRegistrar::new();
    let binder = index_mariadb(&registrar).await.unwrap();

    let requests = registrar.requests();
    let tokens: Vec<&str> = requests.iter().map(|r| r.token.as_str()).collect();
    assert_eq!(tokens, MARIADB_FIELD_PATHS.to_vec());
    assert_eq!(binder.bindings().len(), MARIADB_FIELD_PATHS.len());

    assert_eq!(requests[0].watched, WatchedKind::ConfigMap);
    assert_eq!(requests[0].token, MARIADB_MY_CNF_CONFIG_MAP);
    assert!(requests[1..].iter().all(|r| r.watched == WatchedKind::Secret));
    assert!(requests.iter().all(|r| r.predicate.selector() == WATCH_LABEL));
}

#[tokio::test]
async fn mariadb_setup_is_all_or_nothing() {
    let registrar = RecordingRegistrar::failing_on(MARIADB_TLS_SERVER_CERT_SECRET);

    let err = index_mariadb(&registrar).await.err().unwrap();
    match &err {
        Error::WatchRegistration { token, .. } => {
            assert_eq!(token, MARIADB_TLS_SERVER_CERT_SECRET)
        }
        other => panic!("expected WatchRegistration, got {other:?}"),
    }

    // Registration stopped at the failing token; nothing after it was tried.
    let tokens: Vec<String> = registrar.requests().into_iter().map(|r| r.token).collect();
    let failing = MARIADB_FIELD_PATHS
        .iter()
        .position(|t| *t == MARIADB_TLS_SERVER_CERT_SECRET)
        .unwrap();
    assert_eq!(tokens, MARIADB_FIELD_PATHS[..=failing].to_vec());
}

#[tokio::test]
async fn maxscale_binds_its_metrics_secret() {
    let registrar = RecordingRegistrar::new();
    let binder = index_maxscale(&registrar).await.unwrap();

    let requests = registrar.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].token, MAXSCALE_METRICS_PASSWORD_SECRET);
    assert_eq!(requests[0].owner_kind, "MaxScale");
    assert_eq!(binder.bindings()[0].watched, WatchedKind::Secret);
}
