pub mod event_ledger;
pub mod group_registry;
pub mod membership;
pub mod user_directory;

pub use event_ledger::EventLedger;
pub use group_registry::GroupRegistry;
pub use membership::{CascadeReport, GroupRoster, MembershipCoordinator};
pub use user_directory::UserDirectory;
