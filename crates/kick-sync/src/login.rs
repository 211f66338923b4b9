//! Bounded cookie polling after a detected login.
//!
//! Navigation to the post-login page only suggests a login completed; the
//! session cookie can lag behind it. The poller re-checks the jar a bounded
//! number of times, bypassing the acquirer's change comparison, and is a
//! singleton: starting a new poll cancels the one in flight.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::session::{CookieJar, decode_cookie};
use crate::store::StateStore;
use crate::sync::StatusSynchronizer;

/// Terminal result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Cookie appeared; token stored and a sync was triggered.
    Found,
    /// All attempts passed without a cookie; a login-failed error was
    /// published.
    Exhausted,
    /// A newer poll superseded this one.
    Cancelled,
}

/// Watches for the session cookie to appear after an external login signal.
pub struct LoginPoller {
    jar: Arc<dyn CookieJar>,
    store: Arc<StateStore>,
    synchronizer: Arc<StatusSynchronizer>,
    config: SyncConfig,
    active: Mutex<Option<CancellationToken>>,
}

impl LoginPoller {
    pub fn new(
        jar: Arc<dyn CookieJar>,
        store: Arc<StateStore>,
        synchronizer: Arc<StatusSynchronizer>,
        config: SyncConfig,
    ) -> Self {
        Self {
            jar,
            store,
            synchronizer,
            config,
            active: Mutex::new(None),
        }
    }

    /// Start polling, cancelling any poll already in flight so exactly one
    /// logical poller exists at a time.
    pub fn start(self: &Arc<Self>) -> JoinHandle<LoginOutcome> {
        let cancel = CancellationToken::new();
        if let Some(previous) = self.active.lock().replace(cancel.clone()) {
            debug!("superseding active login poll");
            previous.cancel();
        }
        let poller = Arc::clone(self);
        tokio::spawn(async move { poller.run(cancel).await })
    }

    async fn run(&self, cancel: CancellationToken) -> LoginOutcome {
        let poll = self.config.login_poll.clone();
        for attempt in 1..=poll.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(attempt, "login poll cancelled");
                    return LoginOutcome::Cancelled;
                }
                _ = tokio::time::sleep(poll.interval) => {}
            }

            match self
                .jar
                .get(&self.config.cookie_domain, &self.config.cookie_name)
                .await
            {
                Ok(Some(raw)) => {
                    info!(attempt, "session cookie appeared after login");
                    self.store.set_token(&decode_cookie(&raw));
                    self.synchronizer.sync().await;
                    return LoginOutcome::Found;
                }
                Ok(None) => {
                    debug!(attempt, max = poll.max_attempts, "session cookie not yet set");
                }
                Err(err) => {
                    // A jar read failure consumes the attempt like an absent
                    // cookie.
                    warn!(attempt, error = %err, "cookie read failed during login poll");
                }
            }
        }

        warn!(
            attempts = poll.max_attempts,
            "login poll exhausted without a session cookie"
        );
        self.store.set_error(&SyncError::LoginTimeout.to_string());
        LoginOutcome::Exhausted
    }
}
