//! Auth lifecycle event broadcasting.
//!
//! Components that need to react to session changes (navigation shells,
//! background refreshers, cache layers) subscribe to an [`AuthEventBus`]
//! instead of polling the session store.

use crate::types::UserInfo;
use tokio::sync::broadcast;

/// Default buffered capacity for event subscribers
const DEFAULT_CAPACITY: usize = 16;

/// Events emitted when the authentication state changes
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// A login completed and a session was persisted
    LoggedIn { user: Option<UserInfo> },
    /// The session was ended locally
    LoggedOut,
    /// A token refresh completed and the session was rotated
    TokenRefreshed,
    /// The session is unrecoverable; subscribers should return to login
    SessionExpired { reason: String },
    /// Cached user info was updated from the backend
    UserUpdated { user: UserInfo },
}

/// Publish-subscribe channel for [`AuthEvent`]s.
///
/// Cloning the bus shares the underlying channel; late subscribers only see
/// events emitted after they subscribe.
#[derive(Debug, Clone)]
pub struct AuthEventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEventBus {
    /// Create a bus with the default subscriber capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with an explicit per-subscriber buffer capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to future auth events
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all current subscribers.
    ///
    /// Emitting without subscribers is not an error.
    pub fn emit(&self, event: AuthEvent) {
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!(?event, "auth event emitted with no subscribers");
        }
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = AuthEventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(AuthEvent::LoggedOut);
        assert_eq!(rx.recv().await.unwrap(), AuthEvent::LoggedOut);
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_silent() {
        let bus = AuthEventBus::new();
        bus.emit(AuthEvent::TokenRefreshed);
    }

    #[tokio::test]
    async fn late_subscribers_miss_earlier_events() {
        let bus = AuthEventBus::new();
        bus.emit(AuthEvent::LoggedOut);

        let mut rx = bus.subscribe();
        bus.emit(AuthEvent::TokenRefreshed);
        assert_eq!(rx.recv().await.unwrap(), AuthEvent::TokenRefreshed);
    }
}
