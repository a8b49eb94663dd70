//! Group and service lifecycle flows built on the gateway.
//!
//! These are the call sequences every node uses, manager and wrapper
//! alike; the gateway decides the execution site underneath.

use std::sync::Arc;

use crate::error::ClusterError;
use crate::gateway::ClusterGateway;
use crate::model::{ServiceGroup, ServiceInstance, ServiceStartConfiguration};
use crate::promise::Promise;
use crate::protocol::{result_tag, OperationRequest};
use crate::registry::ServiceLookup;

/// Entry points for group and service lifecycle operations.
pub struct ServiceOrchestrator {
    gateway: Arc<ClusterGateway>,
    /// This node's separately-synchronized view of running services,
    /// consulted by the chained lookup after a confirmed start.
    lookup: Arc<dyn ServiceLookup>,
}

impl ServiceOrchestrator {
    pub fn new(gateway: Arc<ClusterGateway>, lookup: Arc<dyn ServiceLookup>) -> Self {
        Self { gateway, lookup }
    }

    /// Create a service group in the manager's authoritative registry.
    ///
    /// Routed through dispatch even when called on the manager itself,
    /// keeping group state centralized; resolves with the confirmed
    /// descriptor, server-side defaults filled in.
    pub fn create_service_group(&self, group: ServiceGroup) -> Promise<ServiceGroup> {
        self.gateway.dispatch(
            OperationRequest::CreateServiceGroup(group),
            result_tag::SERVICE_GROUP,
        )
    }

    /// Start a new service of a group.
    ///
    /// The manager confirms with the generated unique name as soon as
    /// the instance is scheduled (not necessarily fully initialized);
    /// the returned promise then resolves by looking that name up in
    /// this node's service view. The lookup runs only after the name
    /// resolves and at most once; a failed start rejects the composed
    /// promise with the original failure and the lookup never runs.
    pub fn start_new_service(
        &self,
        config: ServiceStartConfiguration,
    ) -> Promise<ServiceInstance> {
        let lookup = Arc::clone(&self.lookup);
        self.gateway
            .dispatch::<String>(
                OperationRequest::StartService(config),
                result_tag::SERVICE_NAME,
            )
            .then_result(move |name| {
                lookup
                    .service_by_name(&name)
                    .ok_or(ClusterError::ServiceNotFound(name))
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::dispatch::CommandDispatcher;
    use crate::model::ServiceState;
    use crate::registry::{GroupRegistry, ServiceRegistry};

    /// Counts lookups so tests can assert the chained step runs at most
    /// once, and only after the name resolves.
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

    fn manager_setup() -> (ServiceOrchestrator, Arc<CountingLookup>) {
        let groups = Arc::new(GroupRegistry::new());
        let services = Arc::new(ServiceRegistry::new());
        let dispatcher = Arc::new(CommandDispatcher::new(groups, services.clone()));
        let gateway = Arc::new(ClusterGateway::for_manager(dispatcher));
        let lookup = CountingLookup::new(services);
        let orchestrator = ServiceOrchestrator::new(gateway, lookup.clone());
        (orchestrator, lookup)
    }

    #[test]
    fn test_create_service_group_resolves_with_confirmed_descriptor() {
        let (orchestrator, _) = manager_setup();
        let promise = orchestrator.create_service_group(ServiceGroup::new("Lobby", 1, 3));

        let confirmed = promise.try_outcome().unwrap().unwrap();
        assert_eq!(confirmed.name, "Lobby");
        assert_eq!(confirmed.template, "Lobby");
    }

    #[test]
    fn test_start_new_service_chains_lookup_after_name() {
        let (orchestrator, lookup) = manager_setup();
        orchestrator
            .create_service_group(ServiceGroup::new("Lobby", 1, 3))
            .try_outcome()
            .unwrap()
            .unwrap();

        let promise = orchestrator.start_new_service(ServiceStartConfiguration::new("Lobby"));

        let instance = promise.try_outcome().unwrap().unwrap();
        assert_eq!(instance.name, "Lobby-1");
        assert_eq!(instance.state, ServiceState::Scheduled);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_start_never_invokes_lookup() {
        let (orchestrator, lookup) = manager_setup();

        // No such group; the start itself fails.
        let promise = orchestrator.start_new_service(ServiceStartConfiguration::new("Lobby"));

        match promise.try_outcome() {
            Some(Err(ClusterError::Remote { operation, .. })) => {
                assert_eq!(operation, "start-service");
            }
            other => panic!("expected Remote rejection, got {other:?}"),
        }
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_synchronized_view_rejects_with_service_not_found() {
        let groups = Arc::new(GroupRegistry::new());
        let services = Arc::new(ServiceRegistry::new());
        let dispatcher = Arc::new(CommandDispatcher::new(groups, services));
        let gateway = Arc::new(ClusterGateway::for_manager(dispatcher));
        // A view that has not synchronized the new instance yet.
        let stale_view = CountingLookup::new(Arc::new(ServiceRegistry::new()));
        let orchestrator = ServiceOrchestrator::new(gateway, stale_view.clone());

        orchestrator
            .create_service_group(ServiceGroup::new("Lobby", 1, 3))
            .try_outcome()
            .unwrap()
            .unwrap();
        let promise = orchestrator.start_new_service(ServiceStartConfiguration::new("Lobby"));

        match promise.try_outcome() {
            Some(Err(ClusterError::ServiceNotFound(name))) => assert_eq!(name, "Lobby-1"),
            other => panic!("expected ServiceNotFound, got {other:?}"),
        }
        assert_eq!(stale_view.calls.load(Ordering::SeqCst), 1);
    }
}
