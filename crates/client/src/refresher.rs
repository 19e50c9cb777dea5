//! Proactive background token refresh.
//!
//! [`RefreshScheduler`] keeps a session fresh without waiting for a request
//! to fail: a background task periodically checks a next-refresh deadline and
//! refreshes once it passes. [`RefreshScheduler::wake`] forces an immediate
//! check, covering process suspends where timers did not run. The task stops
//! itself when the session ends.

use crate::session::AuthSession;
use bookswap_core::AuthEvent;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Handle to the background refresh task
pub struct RefreshScheduler {
    handle: JoinHandle<()>,
    shutdown: CancellationToken,
    wake: Arc<Notify>,
}

impl RefreshScheduler {
    /// Spawn the scheduler for a session.
    ///
    /// Tick interval and expiring-soon margin come from the session's
    /// [`crate::config::RefreshConfig`].
    pub fn spawn(session: AuthSession) -> Self {
        let shutdown = CancellationToken::new();
        let wake = Arc::new(Notify::new());
        // Subscribe before spawning so a logout emitted right after this
        // call cannot slip past the task.
        let events = session.events().subscribe();
        let handle = tokio::spawn(run(session, events, shutdown.clone(), Arc::clone(&wake)));
        Self {
            handle,
            shutdown,
            wake,
        }
    }

    /// Force an immediate deadline check.
    ///
    /// Call when the application regains the foreground after a suspend.
    /// Wakes before the scheduled time are no-ops; repeated wakes past it
    /// coalesce into a single refresh.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Request the scheduler to stop
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Whether the background task has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the background task to exit
    pub async fn join(self) {
        if let Err(err) = self.handle.await {
            tracing::warn!(error = %err, "refresh scheduler task panicked");
        }
    }
}

async fn run(
    session: AuthSession,
    mut events: tokio::sync::broadcast::Receiver<AuthEvent>,
    shutdown: CancellationToken,
    wake: Arc<Notify>,
) {
    let tick = session.config().tick_interval;
    let margin = session.config().expiry_margin;
    let mut next_due = initial_deadline(&session, tick, margin).await;

    tracing::debug!(?tick, "refresh scheduler started");

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep_until(next_due) => {}
            () = wake.notified() => {}
            event = events.recv() => {
                match event {
                    Ok(AuthEvent::LoggedOut | AuthEvent::SessionExpired { .. }) => {
                        tracing::debug!("session ended, stopping scheduled refresh");
                        break;
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
                continue;
            }
        }

        if Instant::now() < next_due {
            // Woken before the scheduled time; nothing due yet
            continue;
        }

        match session.is_authenticated().await {
            Ok(true) => match session.refresh().await {
                Ok(Some(_)) => tracing::debug!("scheduled refresh completed"),
                Ok(None) => tracing::debug!("scheduled refresh found no usable session"),
                Err(err) => tracing::warn!(error = %err, "scheduled refresh failed"),
            },
            Ok(false) => tracing::trace!("no session, skipping scheduled refresh"),
            Err(err) => tracing::warn!(error = %err, "could not read session state"),
        }

        // Reschedule unconditionally so failures don't stall future attempts
        next_due = Instant::now() + tick;
    }

    tracing::debug!("refresh scheduler stopped");
}

/// First deadline: the periodic tick, or sooner when the stored token is
/// already within the expiring-soon margin.
async fn initial_deadline(session: &AuthSession, tick: Duration, margin: Duration) -> Instant {
    let periodic = Instant::now() + tick;
    match session.current_session().await {
        Ok(Some(current)) => {
            let margin_ms = margin.as_millis() as i64;
            let due_in_ms = current.expires_at - margin_ms - Utc::now().timestamp_millis();
            if due_in_ms <= 0 {
                Instant::now()
            } else {
                periodic.min(Instant::now() + Duration::from_millis(due_in_ms as u64))
            }
        }
        _ => periodic,
    }
}
