//! End-to-end RPC scenarios over an in-process connection pair.
//!
//! A real dispatcher serves one end of a channel transport; a real
//! client drives the other, exactly as a wrapper drives its manager
//! connection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use cumulus::client::QueryClient;
use cumulus::dispatch::CommandDispatcher;
use cumulus::error::ClusterError;
use cumulus::gateway::{ClusterGateway, NodeIdentity};
use cumulus::model::{ServiceGroup, ServiceInstance, ServiceStartConfiguration, ServiceState};
use cumulus::node::DispatchHandler;
use cumulus::orchestration::ServiceOrchestrator;
use cumulus::protocol::OperationRequest;
use cumulus::registry::{GroupRegistry, ServiceLookup, ServiceRegistry};
use cumulus::transport::ChannelConnection;

struct Cluster {
    groups: Arc<GroupRegistry>,
    services: Arc<ServiceRegistry>,
    dispatcher: Arc<CommandDispatcher>,
    client: QueryClient,
}

/// Wire a dispatcher to one end of a channel pair and a client to the
/// other.
async fn connect_wrapper() -> Cluster {
    let groups = Arc::new(GroupRegistry::new());
    let services = Arc::new(ServiceRegistry::new());
    let dispatcher = Arc::new(CommandDispatcher::new(groups.clone(), services.clone()));

    let (wrapper_end, manager_end) = ChannelConnection::pair();
    DispatchHandler::bind(dispatcher.clone(), manager_end)
        .await
        .unwrap();
    let client = QueryClient::start(wrapper_end, Duration::from_secs(5))
        .await
        .unwrap();

    Cluster {
        groups,
        services,
        dispatcher,
        client,
    }
}

/// Counts chained-lookup invocations against a backing registry.
struct CountingLookup {
    inner: Arc<ServiceRegistry>,
    calls: AtomicUsize,
}

impl CountingLookup {
    fn new(inner: Arc<ServiceRegistry>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }
}

impl ServiceLookup for CountingLookup {
    fn service_by_name(&self, name: &str) -> Option<ServiceInstance> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.service_by_name(name)
    }
}

fn orchestrator_for(cluster: &Cluster, lookup: Arc<dyn ServiceLookup>) -> ServiceOrchestrator {
    let gateway = Arc::new(ClusterGateway::for_wrapper(
        NodeIdentity::new("Wrapper-1"),
        cluster.client.clone(),
    ));
    ServiceOrchestrator::new(gateway, lookup)
}

#[tokio::test]
async fn test_create_service_group_round_trip() {
    let cluster = connect_wrapper().await;
    let lookup = CountingLookup::new(cluster.services.clone());
    let orchestrator = orchestrator_for(&cluster, lookup);

    let confirmed = orchestrator
        .create_service_group(ServiceGroup::new("Lobby", 1, 3))
        .await
        .unwrap();

    assert_eq!(confirmed.name, "Lobby");
    assert_eq!(confirmed.min_online_count, 1);
    assert_eq!(confirmed.max_online_count, 3);
    // Confirmed by the manager, with the server-side default filled in.
    assert_eq!(confirmed.template, "Lobby");
    assert_eq!(cluster.groups.group_by_name("Lobby"), Some(confirmed));
}

#[tokio::test]
async fn test_start_service_runs_chained_lookup_once_after_name() {
    let cluster = connect_wrapper().await;
    // The wrapper's view shares the manager registry here, standing in
    // for the separately-synchronized cache.
    let lookup = CountingLookup::new(cluster.services.clone());
    let orchestrator = orchestrator_for(&cluster, lookup.clone());

    orchestrator
        .create_service_group(ServiceGroup::new("Lobby", 1, 3))
        .await
        .unwrap();
    let instance = orchestrator
        .start_new_service(ServiceStartConfiguration::new("Lobby"))
        .await
        .unwrap();

    assert_eq!(instance.name, "Lobby-1");
    assert_eq!(instance.state, ServiceState::Scheduled);
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_start_rejects_and_skips_lookup() {
    let cluster = connect_wrapper().await;
    let lookup = CountingLookup::new(cluster.services.clone());
    let orchestrator = orchestrator_for(&cluster, lookup.clone());

    // No such group anywhere in the cluster.
    let outcome = orchestrator
        .start_new_service(ServiceStartConfiguration::new("Lobby"))
        .await;

    match outcome {
        Err(ClusterError::Remote { operation, .. }) => assert_eq!(operation, "start-service"),
        other => panic!("expected Remote rejection, got {other:?}"),
    }
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_starts_resolve_with_distinct_names() {
    let cluster = connect_wrapper().await;
    let lookup = CountingLookup::new(cluster.services.clone());
    let orchestrator = orchestrator_for(&cluster, lookup);

    for group in ["Lobby", "Proxy"] {
        orchestrator
            .create_service_group(ServiceGroup::new(group, 1, 8))
            .await
            .unwrap();
    }

    let promises: Vec<_> = ["Lobby", "Proxy", "Lobby", "Proxy", "Lobby"]
        .iter()
        .map(|group| orchestrator.start_new_service(ServiceStartConfiguration::new(*group)))
        .collect();

    let mut names = Vec::new();
    for promise in promises {
        names.push(promise.await.unwrap().name);
    }
    names.sort();
    assert_eq!(names, vec!["Lobby-1", "Lobby-2", "Lobby-3", "Proxy-1", "Proxy-2"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_out_of_order_completion_preserves_correlation() {
    let cluster = connect_wrapper().await;

    cluster.dispatcher.register(
        "slow-echo",
        Arc::new(|args: Value| {
            std::thread::sleep(Duration::from_millis(80));
            Ok(args)
        }),
    );
    cluster
        .dispatcher
        .register("fast-echo", Arc::new(|args: Value| Ok(args)));

    let slow: cumulus::Promise<Value> = cluster.client.send_query(
        OperationRequest::Invoke {
            name: "slow-echo".to_string(),
            args: json!("tortoise"),
        },
        "echo",
    );
    let fast: cumulus::Promise<Value> = cluster.client.send_query(
        OperationRequest::Invoke {
            name: "fast-echo".to_string(),
            args: json!("hare"),
        },
        "echo",
    );

    // The later query answers first; neither result crosses over.
    assert_eq!(fast.await, Ok(json!("hare")));
    assert_eq!(slow.await, Ok(json!("tortoise")));
}

#[tokio::test]
async fn test_unknown_invoke_rejects_with_remote_failure() {
    let cluster = connect_wrapper().await;

    let promise: cumulus::Promise<Value> = cluster.client.send_query(
        OperationRequest::Invoke {
            name: "not-registered".to_string(),
            args: Value::Null,
        },
        "echo",
    );

    match promise.await {
        Err(ClusterError::Remote { message, .. }) => {
            assert!(message.contains("not-registered"));
        }
        other => panic!("expected Remote rejection, got {other:?}"),
    }
}
