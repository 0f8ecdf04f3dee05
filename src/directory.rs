use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::{self, AppConfig};
use crate::services::{EventLedger, GroupRegistry, MembershipCoordinator, UserDirectory};
use crate::store::{self, DocumentStore, StoreError};
use crate::telemetry;

/// All directory services sharing one store handle and one clock
#[derive(Clone)]
pub struct Directory {
    pub users: UserDirectory,
    pub groups: GroupRegistry,
    pub events: EventLedger,
    pub membership: MembershipCoordinator,
}

impl Directory {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, config: &AppConfig) -> Self {
        let users = UserDirectory::new(
            store.clone(),
            config.store.users_path.clone(),
            config.directory.clone(),
        );
        let groups = GroupRegistry::new(store, config.store.groups_path.clone(), clock);

        Self {
            events: EventLedger::new(groups.clone(), users.clone()),
            membership: MembershipCoordinator::new(groups.clone(), users.clone()),
            users,
            groups,
        }
    }

    /// Connect the configured backend and use the system clock
    pub fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let store = store::connect(&config.store)?;
        tracing::info!("Directory ready in {:?} mode", config.environment);
        Ok(Self::new(store, Arc::new(SystemClock), config))
    }

    /// Build from the process-wide configuration, installing logging first
    pub fn from_env() -> Result<Self, StoreError> {
        let config = config::config();
        telemetry::init(&config.logging.filter);
        Self::from_config(config)
    }
}
