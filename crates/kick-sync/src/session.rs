//! Session credential acquisition from the browser cookie jar.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::store::StateStore;

/// Message stored when no session cookie is present.
pub(crate) const LOGIN_PROMPT: &str = "please log in";

/// Async view of the browser cookie jar. The extension host's callback API
/// is represented as an awaitable read returning the raw (still URL-encoded)
/// cookie value, or `None` when the cookie is absent.
#[async_trait]
pub trait CookieJar: Send + Sync {
    async fn get(&self, domain: &str, name: &str) -> Result<Option<String>, SyncError>;
}

/// Outcome of one acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquisition {
    /// True when the decoded cookie differs from the stored credential
    /// (including the first-ever observation).
    pub changed: bool,
}

/// Reads the platform session cookie and keeps the store's credential in
/// step with it.
pub struct SessionAcquirer {
    jar: Arc<dyn CookieJar>,
    store: Arc<StateStore>,
    config: SyncConfig,
}

impl SessionAcquirer {
    pub fn new(jar: Arc<dyn CookieJar>, store: Arc<StateStore>, config: SyncConfig) -> Self {
        Self {
            jar,
            store,
            config,
        }
    }

    /// Read, decode, and store the session cookie. Invoked on install, on
    /// every timer tick, and after a detected post-login navigation.
    ///
    /// The change comparison only avoids redundant downstream fetches;
    /// callers may force a sync after a login flow regardless of `changed`.
    pub async fn acquire(&self) -> Result<Acquisition, SyncError> {
        let raw = self
            .jar
            .get(&self.config.cookie_domain, &self.config.cookie_name)
            .await?;

        let Some(raw) = raw else {
            debug!("session cookie absent");
            self.store.publish_unauthenticated(LOGIN_PROMPT);
            return Ok(Acquisition { changed: false });
        };

        let decoded = decode_cookie(&raw);
        if self.store.token().as_deref() == Some(decoded.as_str()) {
            debug!("session cookie unchanged");
            return Ok(Acquisition { changed: false });
        }

        info!("session token acquired from cookie");
        self.store.set_token(&decoded);
        Ok(Acquisition { changed: true })
    }
}

/// URL-decode a cookie value, falling back to the raw value when the
/// encoding is malformed.
pub(crate) fn decode_cookie(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}
