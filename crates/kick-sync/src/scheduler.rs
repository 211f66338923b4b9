//! Time- and event-driven orchestration.
//!
//! The scheduler owns the acquire-then-sync cadence: a periodic tick (which
//! also serves as the install-time trigger via the interval's immediate
//! first fire), plus commands from the presentation layer and the
//! login-detected navigation signal.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::fetch::{HttpTransport, RetryingFetcher};
use crate::login::LoginPoller;
use crate::session::{CookieJar, SessionAcquirer};
use crate::store::StateStore;
use crate::sync::StatusSynchronizer;

/// Commands accepted from the presentation layer, plus the navigation
/// watcher's login-detected signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open the login page and start watching for the session cookie.
    InitiateLogin,
    /// Force an acquire-then-sync cycle regardless of whether the cookie
    /// changed.
    FetchSessionToken,
    /// Atomic state reset; never triggers a network call.
    Logout,
    /// Navigation to the post-login page was detected; start the poller.
    LoginDetected,
}

/// External effect seam for opening the platform login page.
#[async_trait]
pub trait LoginNavigator: Send + Sync {
    async fn open_login_page(&self, url: &str) -> Result<(), SyncError>;
}

/// Command queue depth; senders are few and commands are tiny.
const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Handle returned alongside a built scheduler.
pub struct SchedulerHandle {
    /// Send commands to the running scheduler.
    pub commands: mpsc::Sender<Command>,
    /// The shared store the presentation layer reads and subscribes to.
    pub store: Arc<StateStore>,
    /// Cancel to stop the run loop.
    pub cancel: CancellationToken,
}

/// Periodic and event-driven driver of the synchronization engine.
pub struct Scheduler {
    acquirer: SessionAcquirer,
    synchronizer: Arc<StatusSynchronizer>,
    poller: Arc<LoginPoller>,
    store: Arc<StateStore>,
    navigator: Arc<dyn LoginNavigator>,
    config: SyncConfig,
    commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Wire the full engine around the injected seams: cookie jar, HTTP
    /// transport, and login navigator.
    pub fn new(
        jar: Arc<dyn CookieJar>,
        transport: Arc<dyn HttpTransport>,
        navigator: Arc<dyn LoginNavigator>,
        config: SyncConfig,
    ) -> (Self, SchedulerHandle) {
        let store = Arc::new(StateStore::new());
        let fetcher = RetryingFetcher::new(transport, store.clone(), config.retry.clone());
        let synchronizer = Arc::new(StatusSynchronizer::new(
            fetcher,
            store.clone(),
            config.clone(),
        ));
        let acquirer = SessionAcquirer::new(jar.clone(), store.clone(), config.clone());
        let poller = Arc::new(LoginPoller::new(
            jar,
            store.clone(),
            synchronizer.clone(),
            config.clone(),
        ));

        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let handle = SchedulerHandle {
            commands: tx,
            store: store.clone(),
            cancel: cancel.clone(),
        };

        let scheduler = Self {
            acquirer,
            synchronizer,
            poller,
            store,
            navigator,
            config,
            commands: rx,
            cancel,
        };
        (scheduler, handle)
    }

    /// Run until cancelled. The interval's first tick fires immediately and
    /// doubles as the install trigger.
    pub async fn run(mut self) {
        info!(
            interval_secs = self.config.sync_interval.as_secs(),
            "sync scheduler started"
        );
        let mut ticker = tokio::time::interval(self.config.sync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("sync scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    debug!("periodic refresh tick");
                    self.acquire_then_sync().await;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => {
                        info!("command channel closed, sync scheduler stopping");
                        break;
                    }
                },
            }
        }
    }

    /// Acquire the cookie, then sync whenever a credential is present —
    /// independent of whether it changed, to catch provider-side live-status
    /// changes under a stable token.
    async fn acquire_then_sync(&self) {
        match self.acquirer.acquire().await {
            Ok(result) => {
                debug!(changed = result.changed, "session acquisition finished");
                if self.store.token().is_some() {
                    self.synchronizer.sync().await;
                }
            }
            Err(err) => warn!(error = %err, "session acquisition failed"),
        }
    }

    async fn handle(&self, command: Command) {
        debug!(?command, "handling command");
        match command {
            Command::InitiateLogin => {
                if let Err(err) = self.navigator.open_login_page(&self.config.login_url).await {
                    warn!(error = %err, "failed to open login page");
                }
                // Watch for the cookie the login flow is about to set.
                let _ = self.poller.start();
            }
            Command::FetchSessionToken => self.acquire_then_sync().await,
            Command::Logout => self.store.logout(),
            Command::LoginDetected => {
                let _ = self.poller.start();
            }
        }
    }
}
