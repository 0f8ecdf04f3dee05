pub mod auth;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod telemetry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use directory::Directory;
pub use error::{DirectoryError, DirectoryResult};
pub use models::{Category, Event, Group, ProfileUpdate, Role, User, UserEvent};
pub use services::{CascadeReport, EventLedger, GroupRegistry, GroupRoster, MembershipCoordinator, UserDirectory};
pub use store::{DocumentStore, MemoryStore, RestStore, StoreError};
