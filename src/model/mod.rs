//! Descriptors for service groups and running service instances.
//!
//! These are value objects round-tripped through queries and responses;
//! the RPC core does not interpret them beyond serialization.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default player capacity for groups that do not set one.
pub const DEFAULT_MAX_PLAYERS: u32 = 100;

fn default_max_players() -> u32 {
    DEFAULT_MAX_PLAYERS
}

/// A named, template-backed configuration from which service instances
/// are started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceGroup {
    /// Unique group name, e.g. "Lobby".
    pub name: String,
    /// Template the instances are provisioned from. Left empty by the
    /// caller, the manager fills in the group name on creation.
    #[serde(default)]
    pub template: String,
    /// Minimum number of instances the manager keeps online.
    pub min_online_count: u32,
    /// Maximum number of instances the manager will schedule.
    pub max_online_count: u32,
    /// Player capacity per instance.
    #[serde(default = "default_max_players")]
    pub max_players: u32,
}

impl ServiceGroup {
    /// Create a group descriptor with defaultable fields unset.
    pub fn new(name: impl Into<String>, min_online_count: u32, max_online_count: u32) -> Self {
        Self {
            name: name.into(),
            template: String::new(),
            min_online_count,
            max_online_count,
            max_players: DEFAULT_MAX_PLAYERS,
        }
    }
}

/// Parameters for starting a single new instance of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStartConfiguration {
    /// Group the instance belongs to.
    pub group_name: String,
    /// Template override; defaults to the group's template.
    #[serde(default)]
    pub template: Option<String>,
    /// Player capacity override; defaults to the group's capacity.
    #[serde(default)]
    pub max_players: Option<u32>,
}

impl ServiceStartConfiguration {
    /// Start configuration with group defaults.
    pub fn new(group_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            template: None,
            max_players: None,
        }
    }
}

/// Lifecycle state of a service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// Accepted by the manager, not yet running on a wrapper.
    Scheduled,
    /// Running on its wrapper.
    Running,
    /// Shut down; the instance number may be reused.
    Stopped,
}

/// A concrete instance belonging to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Stable unique id, assigned when the instance is scheduled.
    pub id: Uuid,
    /// Generated unique name, e.g. "Lobby-1".
    pub name: String,
    /// Owning group.
    pub group_name: String,
    /// Per-group instance number the name is derived from.
    pub number: u32,
    /// Current lifecycle state.
    pub state: ServiceState,
    /// Player capacity of this instance.
    pub max_players: u32,
}
