//! Bookswap HTTP client
//!
//! Authenticated access layer for the Bookswap REST backend. The backend owns
//! all business logic; this crate owns the session lifecycle: bearer token
//! attachment, single-flight token refresh, transparent retry of
//! unauthorized requests, and proactive background refresh.

pub mod client;
pub mod config;
pub mod error;
pub mod refresher;
pub mod session;
pub mod types;

pub use client::{ApiClient, ApiClientBuilder};
pub use config::RefreshConfig;
pub use error::ClientError;
pub use refresher::RefreshScheduler;
pub use session::{AuthSession, AuthSessionBuilder};
