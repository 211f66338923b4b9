//! Identity and follow-list synchronization.
//!
//! One sync cycle is two dependent fetches: the authenticated user first,
//! then the followed livestreams. The identity fetch failing aborts the
//! cycle; the channel fetch failing is best-effort and never erases an
//! identity fetched in the same cycle.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_UA, SyncConfig};
use crate::error::SyncError;
use crate::fetch::RetryingFetcher;
use crate::models::{FollowedChannel, Identity, LivestreamEntry, SyncState, UserResponse};
use crate::store::StateStore;

/// Stored when the identity fetch fails.
pub(crate) const USER_FETCH_ERROR: &str = "failed to fetch user data";
/// Stored when the follow-list fetch fails.
pub(crate) const CHANNELS_FETCH_ERROR: &str = "failed to fetch followed channels";

/// Orchestrates one identity-then-channels cycle against the store.
pub struct StatusSynchronizer {
    fetcher: RetryingFetcher,
    store: Arc<StateStore>,
    config: SyncConfig,
}

impl StatusSynchronizer {
    pub fn new(fetcher: RetryingFetcher, store: Arc<StateStore>, config: SyncConfig) -> Self {
        Self {
            fetcher,
            store,
            config,
        }
    }

    /// Run one sync cycle and return the published snapshot.
    ///
    /// Without a stored credential this short-circuits with no network
    /// calls. The identity fetch strictly precedes the channel fetch; the
    /// two steps share one fixed header set.
    pub async fn sync(&self) -> SyncState {
        let Some(token) = self.store.token() else {
            debug!("sync skipped, no credential stored");
            self.store.set_error(&SyncError::NoCredential.to_string());
            return self.store.state();
        };

        let headers = match auth_headers(&token) {
            Ok(headers) => headers,
            Err(err) => {
                warn!(error = %err, "credential unusable as bearer header");
                self.store.set_error(USER_FETCH_ERROR);
                return self.store.state();
            }
        };

        // Step 1: identity. Failure is terminal for the cycle; a partial
        // Ready state is never published.
        let identity = match self.fetch_identity(&headers).await {
            Ok(identity) => identity,
            Err(err) => {
                warn!(error = %err, "identity fetch failed");
                self.store.set_error(USER_FETCH_ERROR);
                return self.store.state();
            }
        };
        debug!(user_id = identity.user_id, username = %identity.username, "identity fetched");
        self.store.set_identity(identity);

        // Step 2: followed channels. Failure keeps the identity published
        // above and leaves the previous channel list in place.
        match self.fetch_channels(&headers).await {
            Ok(channels) => {
                info!(count = channels.len(), "followed channels updated");
                self.store.publish_channels(channels);
            }
            Err(err) => {
                warn!(error = %err, "channel fetch failed, keeping previous list");
                self.store.set_error(CHANNELS_FETCH_ERROR);
            }
        }

        self.store.state()
    }

    async fn fetch_identity(&self, headers: &HeaderMap) -> Result<Identity, SyncError> {
        let value = self
            .fetcher
            .fetch_json(&self.config.identity_url, headers)
            .await?;
        let user: UserResponse = serde_json::from_value(value)?;
        Ok(Identity::from(user))
    }

    async fn fetch_channels(&self, headers: &HeaderMap) -> Result<Vec<FollowedChannel>, SyncError> {
        let value = self
            .fetcher
            .fetch_json(&self.config.follows_url, headers)
            .await?;
        let entries: Vec<LivestreamEntry> = serde_json::from_value(value)?;
        Ok(entries.into_iter().map(FollowedChannel::from).collect())
    }
}

/// Fixed header set for both API calls: bearer token plus the static
/// user-agent constant.
fn auth_headers(token: &str) -> Result<HeaderMap, SyncError> {
    let mut headers = HeaderMap::new();
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| SyncError::Cookie(e.to_string()))?;
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_UA));
    Ok(headers)
}
