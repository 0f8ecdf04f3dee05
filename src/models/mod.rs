pub mod category;
pub mod event;
pub mod group;
pub mod user;

pub use category::Category;
pub use event::{Event, UserEvent};
pub use group::{Group, Role};
pub use user::{ProfileUpdate, User};
