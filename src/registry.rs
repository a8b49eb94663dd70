//! Manager-authoritative in-memory registries.
//!
//! The dispatcher executes canonical operations against these; wrapper
//! nodes only ever see their contents through confirmed responses.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, info};
use uuid::Uuid;

use crate::model::{ServiceGroup, ServiceInstance, ServiceStartConfiguration, ServiceState};

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors from the authoritative registries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("service group '{0}' already exists")]
    GroupExists(String),

    #[error("service group '{0}' is unknown")]
    UnknownGroup(String),

    #[error("service '{0}' is unknown")]
    UnknownService(String),

    #[error("group '{group}' is at its maximum of {max} online services")]
    GroupFull { group: String, max: u32 },
}

/// Lookup seam consulted by chained orchestration steps.
///
/// Wrapper nodes consult their own separately-synchronized view; on the
/// manager this is the authoritative [`ServiceRegistry`] itself.
pub trait ServiceLookup: Send + Sync {
    /// Find a service by its unique name. Names compare
    /// case-insensitively.
    fn service_by_name(&self, name: &str) -> Option<ServiceInstance>;
}

/// Authoritative registry of service groups.
#[derive(Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, ServiceGroup>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group, filling server-side defaults, and return the
    /// confirmed descriptor. Duplicate names are refused.
    pub fn create(&self, mut group: ServiceGroup) -> Result<ServiceGroup> {
        if group.template.is_empty() {
            group.template = group.name.clone();
        }
        let mut groups = self.groups.write().expect("group registry poisoned");
        if groups.contains_key(&group.name) {
            return Err(RegistryError::GroupExists(group.name));
        }
        groups.insert(group.name.clone(), group.clone());
        info!(group = %group.name, template = %group.template, "service group created");
        Ok(group)
    }

    pub fn group_by_name(&self, name: &str) -> Option<ServiceGroup> {
        self.groups
            .read()
            .expect("group registry poisoned")
            .get(name)
            .cloned()
    }

    pub fn groups(&self) -> Vec<ServiceGroup> {
        self.groups
            .read()
            .expect("group registry poisoned")
            .values()
            .cloned()
            .collect()
    }
}

/// Authoritative registry of scheduled and running service instances.
///
/// Keys are lowercased names; instance numbers freed by removal are
/// handed out again.
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, ServiceInstance>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a new instance of the group, allocating the lowest free
    /// instance number. The returned descriptor is `Scheduled`; the
    /// hosting wrapper reports later transitions.
    pub fn schedule(
        &self,
        group: &ServiceGroup,
        config: &ServiceStartConfiguration,
    ) -> Result<ServiceInstance> {
        let mut services = self.services.write().expect("service registry poisoned");

        let active = services
            .values()
            .filter(|s| s.group_name == group.name && s.state != ServiceState::Stopped)
            .count() as u32;
        if active >= group.max_online_count {
            return Err(RegistryError::GroupFull {
                group: group.name.clone(),
                max: group.max_online_count,
            });
        }

        let number = (1u32..)
            .find(|n| !services.contains_key(&format!("{}-{}", group.name, n).to_lowercase()))
            .expect("instance numbers exhausted");
        let name = format!("{}-{}", group.name, number);
        let instance = ServiceInstance {
            id: Uuid::new_v4(),
            name: name.clone(),
            group_name: group.name.clone(),
            number,
            state: ServiceState::Scheduled,
            max_players: config.max_players.unwrap_or(group.max_players),
        };
        services.insert(name.to_lowercase(), instance.clone());
        debug!(service = %name, id = %instance.id, "service scheduled");
        Ok(instance)
    }

    /// Record a lifecycle transition reported by the hosting wrapper.
    pub fn update_state(&self, name: &str, state: ServiceState) -> Result<ServiceInstance> {
        let mut services = self.services.write().expect("service registry poisoned");
        let instance = services
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| RegistryError::UnknownService(name.to_string()))?;
        instance.state = state;
        debug!(service = %instance.name, state = ?state, "service state updated");
        Ok(instance.clone())
    }

    /// Remove an instance; its number becomes reusable.
    pub fn remove(&self, name: &str) -> Result<ServiceInstance> {
        self.services
            .write()
            .expect("service registry poisoned")
            .remove(&name.to_lowercase())
            .ok_or_else(|| RegistryError::UnknownService(name.to_string()))
    }

    pub fn services(&self) -> Vec<ServiceInstance> {
        self.services
            .read()
            .expect("service registry poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl ServiceLookup for ServiceRegistry {
    fn service_by_name(&self, name: &str) -> Option<ServiceInstance> {
        self.services
            .read()
            .expect("service registry poisoned")
            .get(&name.to_lowercase())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_group_fills_template_default() {
        let registry = GroupRegistry::new();
        let confirmed = registry.create(ServiceGroup::new("Lobby", 1, 3)).unwrap();
        assert_eq!(confirmed.template, "Lobby");
        assert_eq!(registry.group_by_name("Lobby"), Some(confirmed));
    }

    #[test]
    fn test_create_duplicate_group_is_refused() {
        let registry = GroupRegistry::new();
        registry.create(ServiceGroup::new("Lobby", 1, 3)).unwrap();
        assert_eq!(
            registry.create(ServiceGroup::new("Lobby", 2, 5)),
            Err(RegistryError::GroupExists("Lobby".to_string()))
        );
    }

    #[test]
    fn test_schedule_allocates_lowest_free_number() {
        let registry = ServiceRegistry::new();
        let group = ServiceGroup::new("Lobby", 1, 5);
        let config = ServiceStartConfiguration::new("Lobby");

        let first = registry.schedule(&group, &config).unwrap();
        let second = registry.schedule(&group, &config).unwrap();
        assert_eq!(first.name, "Lobby-1");
        assert_eq!(second.name, "Lobby-2");
        assert_eq!(first.state, ServiceState::Scheduled);

        // A removed instance frees its number for reuse.
        registry.remove("Lobby-1").unwrap();
        let third = registry.schedule(&group, &config).unwrap();
        assert_eq!(third.name, "Lobby-1");
        assert_ne!(third.id, first.id);
    }

    #[test]
    fn test_schedule_respects_group_maximum() {
        let registry = ServiceRegistry::new();
        let group = ServiceGroup::new("Lobby", 1, 1);
        let config = ServiceStartConfiguration::new("Lobby");

        registry.schedule(&group, &config).unwrap();
        assert_eq!(
            registry.schedule(&group, &config),
            Err(RegistryError::GroupFull {
                group: "Lobby".to_string(),
                max: 1,
            })
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = ServiceRegistry::new();
        let group = ServiceGroup::new("Lobby", 1, 3);
        registry
            .schedule(&group, &ServiceStartConfiguration::new("Lobby"))
            .unwrap();

        let found = registry.service_by_name("lobby-1").unwrap();
        assert_eq!(found.name, "Lobby-1");
        assert!(registry.service_by_name("Lobby-9").is_none());
    }

    #[test]
    fn test_update_state_tracks_lifecycle() {
        let registry = ServiceRegistry::new();
        let group = ServiceGroup::new("Lobby", 1, 3);
        registry
            .schedule(&group, &ServiceStartConfiguration::new("Lobby"))
            .unwrap();

        let running = registry.update_state("Lobby-1", ServiceState::Running).unwrap();
        assert_eq!(running.state, ServiceState::Running);
        assert_eq!(
            registry.update_state("Lobby-9", ServiceState::Running),
            Err(RegistryError::UnknownService("Lobby-9".to_string()))
        );
    }

    #[test]
    fn test_max_players_override() {
        let registry = ServiceRegistry::new();
        let group = ServiceGroup::new("Lobby", 1, 3);
        let mut config = ServiceStartConfiguration::new("Lobby");
        config.max_players = Some(16);

        let instance = registry.schedule(&group, &config).unwrap();
        assert_eq!(instance.max_players, 16);
    }
}
