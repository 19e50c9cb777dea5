//! Bookswap core types and utilities

pub mod error;
pub mod events;
pub mod store;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use events::{AuthEvent, AuthEventBus};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use types::{Permission, Role, Session, UserInfo};
