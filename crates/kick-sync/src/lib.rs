//! Background synchronization engine for Kick.com followed channels.
//!
//! The engine acquires a session credential from the browser cookie jar,
//! polls the Kick API for identity and follow/live status with retrying
//! fetches, and publishes the result to a process-scoped [`StateStore`]
//! that a presentation layer reads and subscribes to.
//!
//! # Architecture
//!
//! - [`StateStore`]: credential and snapshot holder with change events
//! - [`RetryingFetcher`]: backoff-retried JSON GET with 401 invalidation
//! - [`SessionAcquirer`]: cookie read, decode, change detection
//! - [`LoginPoller`]: singleton bounded cookie watcher after login
//! - [`StatusSynchronizer`]: identity-then-channels sync cycle
//! - [`Scheduler`]: periodic timer plus presentation-layer commands
//!
//! The host environment is injected through three seams: [`CookieJar`],
//! [`HttpTransport`], and [`LoginNavigator`].

pub mod config;
pub mod error;
pub mod fetch;
pub mod login;
pub mod models;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod sync;

pub use config::{LoginPollConfig, RetryPolicy, SyncConfig};
pub use error::SyncError;
pub use fetch::{HttpResponse, HttpTransport, ReqwestTransport, RetryingFetcher};
pub use login::{LoginOutcome, LoginPoller};
pub use models::{FollowedChannel, Identity, SyncState};
pub use scheduler::{Command, LoginNavigator, Scheduler, SchedulerHandle};
pub use session::{Acquisition, CookieJar, SessionAcquirer};
pub use store::{StateStore, StoreEvent};
pub use sync::StatusSynchronizer;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for embedders without their own subscriber.
///
/// Respects `RUST_LOG`; call at most once per process.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kick_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
