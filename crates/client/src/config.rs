//! Refresh timing configuration

use std::time::Duration;

/// Minimum allowed interval between scheduled refresh checks
pub const MIN_TICK_INTERVAL: Duration = Duration::from_secs(120);

/// Timing knobs for token refresh behavior.
///
/// The defaults match production deployments; none of the values are
/// load-bearing and all can be tuned per environment.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Window after a completed refresh attempt during which further refresh
    /// calls are served from the stored token instead of the network
    pub cooldown: Duration,
    /// Interval between scheduled background refresh checks
    pub tick_interval: Duration,
    /// How close to expiry a token is considered "expiring soon"; the
    /// scheduler refreshes no later than expiry minus this margin
    pub expiry_margin: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(30),
            tick_interval: Duration::from_secs(240),
            expiry_margin: Duration::from_secs(120),
        }
    }
}

impl RefreshConfig {
    /// Override the scheduler tick interval, clamped to [`MIN_TICK_INTERVAL`]
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(MIN_TICK_INTERVAL);
        self
    }

    /// Override the refresh cooldown window
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Override the expiring-soon margin
    #[must_use]
    pub fn with_expiry_margin(mut self, margin: Duration) -> Self {
        self.expiry_margin = margin;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RefreshConfig::default();
        assert_eq!(config.cooldown, Duration::from_secs(30));
        assert_eq!(config.tick_interval, Duration::from_secs(240));
        assert_eq!(config.expiry_margin, Duration::from_secs(120));
    }

    #[test]
    fn tick_interval_is_clamped() {
        let config = RefreshConfig::default().with_tick_interval(Duration::from_secs(10));
        assert_eq!(config.tick_interval, MIN_TICK_INTERVAL);

        let config = RefreshConfig::default().with_tick_interval(Duration::from_secs(600));
        assert_eq!(config.tick_interval, Duration::from_secs(600));
    }
}
