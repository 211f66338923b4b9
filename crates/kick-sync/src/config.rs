//! Configuration for the synchronization engine.

use std::time::Duration;

/// Fixed user-agent sent with every API request. Kept static rather than
/// derived from the runtime environment so request fingerprints stay stable.
pub(crate) const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

/// Retry behavior for outbound requests.
///
/// Delays grow as `base_delay * 2^attempt` with no jitter, so a failing call
/// with the defaults waits 1s then 2s between its three attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub retries: u32,
    /// Base delay between attempts.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Compute the delay after a failed attempt (0-indexed).
    ///
    /// 2^attempt is computed with a checked shift so attempts >= 32 saturate
    /// instead of overflowing.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(Duration::MAX)
    }
}

/// Bounded cookie polling after a detected login.
#[derive(Debug, Clone)]
pub struct LoginPollConfig {
    /// Number of cookie checks before giving up.
    pub max_attempts: u32,
    /// Spacing between checks.
    pub interval: Duration,
}

impl Default for LoginPollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_millis(2000),
        }
    }
}

/// Engine configuration: endpoints, cookie location, and timing.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Endpoint returning the authenticated user's identity.
    pub identity_url: String,
    /// Endpoint returning the user's followed livestreams.
    pub follows_url: String,
    /// URL the login page is opened at.
    pub login_url: String,
    /// Cookie domain the session token is read from.
    pub cookie_domain: String,
    /// Name of the session cookie.
    pub cookie_name: String,
    /// Periodic background refresh interval.
    pub sync_interval: Duration,
    /// Retry behavior for both API calls.
    pub retry: RetryPolicy,
    /// Post-login cookie polling.
    pub login_poll: LoginPollConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            identity_url: "https://kick.com/api/v1/user".to_string(),
            follows_url: "https://kick.com/api/v1/user/livestreams".to_string(),
            login_url: "https://kick.com/login".to_string(),
            cookie_domain: "kick.com".to_string(),
            cookie_name: "session_token".to_string(),
            sync_interval: Duration::from_secs(5 * 60),
            retry: RetryPolicy::default(),
            login_poll: LoginPollConfig::default(),
        }
    }
}
