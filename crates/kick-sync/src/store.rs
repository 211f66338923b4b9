//! Process-scoped state store.
//!
//! Holds the same four keys the extension kept in browser storage — bearer
//! token, user identity, followed channels, last error — behind a single
//! mutex so each operation is atomic, plus a payload-free broadcast channel
//! the presentation layer subscribes to. Receivers re-read state on every
//! event rather than consuming payloads.
//!
//! Publication is last-write-wins; a monotonically increasing generation
//! counter is bumped by every mutation so overlapping sync cycles can be
//! ordered deterministically in tests.

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{FollowedChannel, Identity, SyncState};

/// Events broadcast when stored state changes. Carry no payload; receivers
/// re-read the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// The credential was stored, cleared, or reset.
    TokenUpdated,
    /// The followed-channel list was replaced.
    ChannelsUpdated,
}

/// Default broadcast capacity for store events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct StoreInner {
    token: Option<String>,
    identity: Option<Identity>,
    channels: Vec<FollowedChannel>,
    error: Option<String>,
    generation: u64,
}

/// Process-scoped holder for credential and sync state.
#[derive(Debug)]
pub struct StateStore {
    inner: Mutex<StoreInner>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Create an empty store in the `Unauthenticated` state.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(StoreInner::default()),
            events,
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Current bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.inner.lock().token.clone()
    }

    /// Store a new credential.
    pub fn set_token(&self, token: &str) {
        {
            let mut inner = self.inner.lock();
            inner.token = Some(token.to_string());
            inner.generation += 1;
        }
        debug!("session token updated in store");
        self.emit(StoreEvent::TokenUpdated);
    }

    /// Drop the stored credential, keeping other state untouched.
    ///
    /// Idempotent: repeated 401s within one retry sequence may call this
    /// several times; only the first call emits an event.
    pub fn clear_token(&self) {
        let was_present = {
            let mut inner = self.inner.lock();
            let was_present = inner.token.take().is_some();
            if was_present {
                inner.generation += 1;
            }
            was_present
        };
        if was_present {
            debug!("session token cleared from store");
            self.emit(StoreEvent::TokenUpdated);
        }
    }

    /// Clear the credential and record a user-visible message, moving the
    /// derived state to `Unauthenticated`.
    pub fn publish_unauthenticated(&self, message: &str) {
        {
            let mut inner = self.inner.lock();
            inner.token = None;
            inner.error = Some(message.to_string());
            inner.generation += 1;
        }
        self.emit(StoreEvent::TokenUpdated);
    }

    /// Stored identity, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.inner.lock().identity.clone()
    }

    /// Replace the stored identity. Published as soon as the identity fetch
    /// succeeds, before the channel fetch runs.
    pub fn set_identity(&self, identity: Identity) {
        let mut inner = self.inner.lock();
        inner.identity = Some(identity);
        inner.generation += 1;
    }

    /// Last published channel list (provider order).
    pub fn channels(&self) -> Vec<FollowedChannel> {
        self.inner.lock().channels.clone()
    }

    /// Replace the channel list and clear any recorded error.
    pub fn publish_channels(&self, channels: Vec<FollowedChannel>) {
        {
            let mut inner = self.inner.lock();
            inner.channels = channels;
            inner.error = None;
            inner.generation += 1;
        }
        self.emit(StoreEvent::ChannelsUpdated);
    }

    /// Last recorded user-visible error message, if any.
    pub fn error(&self) -> Option<String> {
        self.inner.lock().error.clone()
    }

    /// Record a user-visible error message.
    pub fn set_error(&self, message: &str) {
        let mut inner = self.inner.lock();
        inner.error = Some(message.to_string());
        inner.generation += 1;
    }

    /// Monotonic publication counter; bumped by every mutation.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Atomic reset of credential, identity, channels, and error together.
    /// No partial clears: a concurrent read sees either all of the old state
    /// or none of it.
    pub fn logout(&self) {
        {
            let mut inner = self.inner.lock();
            inner.token = None;
            inner.identity = None;
            inner.channels.clear();
            inner.error = None;
            inner.generation += 1;
        }
        debug!("store reset on logout");
        self.emit(StoreEvent::TokenUpdated);
    }

    /// Derive the published snapshot from the stored keys.
    ///
    /// Precedence: absent token wins, then a recorded error, then identity.
    /// Identity and error can coexist in the store (channel-fetch failure
    /// keeps the identity), but the derived union has exactly one live value.
    pub fn state(&self) -> SyncState {
        let inner = self.inner.lock();
        if inner.token.is_none() {
            return SyncState::Unauthenticated;
        }
        if let Some(error) = &inner.error {
            return SyncState::Error(error.clone());
        }
        match &inner.identity {
            Some(identity) => SyncState::Ready {
                identity: identity.clone(),
                channels: inner.channels.clone(),
            },
            None => SyncState::Unauthenticated,
        }
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is fine; the presentation layer may not be attached.
        let _ = self.events.send(event);
    }
}
