//! Published data model and the Kick API wire shapes it is projected from.

use serde::{Deserialize, Serialize};

/// The authenticated user, replaced wholesale on each successful sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "userId")]
    pub user_id: u64,
    pub username: String,
}

/// One followed channel in provider response order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowedChannel {
    pub slug: String,
    pub username: String,
    #[serde(rename = "isLive")]
    pub is_live: bool,
    #[serde(rename = "sessionTitle")]
    pub session_title: Option<String>,
    #[serde(rename = "profilePic")]
    pub profile_pic: Option<String>,
}

/// The published synchronization snapshot. Exactly one value is live at a
/// time; publication is last-write-wins and never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// No credential is stored; the presentation layer should offer login.
    Unauthenticated,
    /// The last cycle failed; short human-readable reason.
    Error(String),
    /// Identity and followed channels from the most recent successful fetches.
    Ready {
        identity: Identity,
        channels: Vec<FollowedChannel>,
    },
}

impl SyncState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Wire shape of `GET /api/v1/user`.
#[derive(Debug, Deserialize)]
pub struct UserResponse {
    pub id: u64,
    pub username: String,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
        }
    }
}

/// Wire shape of one entry in `GET /api/v1/user/livestreams`.
///
/// Only the fields the projection needs are modeled; the rest of the payload
/// is an opaque external contract honored best-effort.
#[derive(Debug, Deserialize)]
pub struct LivestreamEntry {
    pub channel: WireChannel,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub session_title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireChannel {
    pub slug: String,
    pub user: WireUser,
}

#[derive(Debug, Deserialize)]
pub struct WireUser {
    pub username: String,
    #[serde(default)]
    pub profilepic: Option<String>,
}

impl From<LivestreamEntry> for FollowedChannel {
    fn from(entry: LivestreamEntry) -> Self {
        Self {
            slug: entry.channel.slug,
            username: entry.channel.user.username,
            is_live: entry.is_live,
            session_title: entry.session_title,
            profile_pic: entry.channel.user.profilepic,
        }
    }
}
