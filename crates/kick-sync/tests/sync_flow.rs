//! End-to-end scenarios wiring the real components against scripted
//! cookie-jar and transport fakes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;

use kick_sync::{
    Command, CookieJar, HttpResponse, HttpTransport, LoginNavigator, LoginOutcome, LoginPollConfig,
    LoginPoller, RetryPolicy, RetryingFetcher, Scheduler, SessionAcquirer, StateStore, StoreEvent,
    StatusSynchronizer, SyncConfig, SyncError, SyncState,
};

const IDENTITY_URL: &str = "https://kick.com/api/v1/user";
const FOLLOWS_URL: &str = "https://kick.com/api/v1/user/livestreams";

/// Cookie jar whose value tests swap between reads.
struct TestJar {
    value: Mutex<Option<String>>,
    reads: AtomicU32,
}

impl TestJar {
    fn new(value: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(value.map(str::to_string)),
            reads: AtomicU32::new(0),
        })
    }

    fn set(&self, value: Option<&str>) {
        *self.value.lock() = value.map(str::to_string);
    }
}

#[async_trait]
impl CookieJar for TestJar {
    async fn get(&self, domain: &str, name: &str) -> Result<Option<String>, SyncError> {
        assert_eq!(domain, "kick.com");
        assert_eq!(name, "session_token");
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.value.lock().clone())
    }
}

/// Transport serving fixed bodies per URL, verifying the auth header set.
struct TestTransport {
    bodies: Mutex<HashMap<String, (u16, String)>>,
    expected_token: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl TestTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bodies: Mutex::new(HashMap::new()),
            expected_token: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn serve(&self, url: &str, status: u16, body: &str) {
        self.bodies
            .lock()
            .insert(url.to_string(), (status, body.to_string()));
    }

    fn expect_token(&self, token: &str) {
        *self.expected_token.lock() = Some(token.to_string());
    }

    fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl HttpTransport for TestTransport {
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse, SyncError> {
        self.calls.lock().push(url.to_string());

        if let Some(token) = self.expected_token.lock().as_deref() {
            let auth = headers
                .get(reqwest::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            assert_eq!(auth, format!("Bearer {token}"));
            let ua = headers
                .get(reqwest::header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            assert!(ua.starts_with("Mozilla/5.0"), "static user-agent missing");
        }

        match self.bodies.lock().get(url) {
            Some((status, body)) => Ok(HttpResponse {
                status: *status,
                body: body.as_bytes().to_vec(),
            }),
            None => Err(SyncError::Network("unreachable".to_string())),
        }
    }
}

struct NoopNavigator;

#[async_trait]
impl LoginNavigator for NoopNavigator {
    async fn open_login_page(&self, _url: &str) -> Result<(), SyncError> {
        Ok(())
    }
}

fn fast_config() -> SyncConfig {
    SyncConfig {
        sync_interval: Duration::from_secs(3600),
        retry: RetryPolicy {
            retries: 3,
            base_delay: Duration::from_millis(1),
        },
        login_poll: LoginPollConfig {
            max_attempts: 5,
            interval: Duration::from_millis(2),
        },
        ..SyncConfig::default()
    }
}

fn wire(
    jar: Arc<TestJar>,
    transport: Arc<TestTransport>,
) -> (Arc<StateStore>, SessionAcquirer, Arc<StatusSynchronizer>) {
    let config = fast_config();
    let store = Arc::new(StateStore::new());
    let fetcher = RetryingFetcher::new(transport, store.clone(), config.retry.clone());
    let synchronizer = Arc::new(StatusSynchronizer::new(
        fetcher,
        store.clone(),
        config.clone(),
    ));
    let acquirer = SessionAcquirer::new(jar, store.clone(), config);
    (store, acquirer, synchronizer)
}

fn serve_bob_with_one_live_channel(transport: &TestTransport) {
    transport.serve(IDENTITY_URL, 200, r#"{"id":1,"username":"bob"}"#);
    transport.serve(
        FOLLOWS_URL,
        200,
        r#"[{"channel":{"slug":"x","user":{"username":"xara","profilepic":"https://cdn/x.png"}},"is_live":true,"session_title":"live now"}]"#,
    );
}

#[tokio::test]
async fn absent_cookie_then_login_reaches_ready() {
    let jar = TestJar::new(None);
    let transport = TestTransport::new();
    let (store, acquirer, synchronizer) = wire(jar.clone(), transport.clone());

    // No cookie: unauthenticated with a login prompt, no network traffic.
    let result = acquirer.acquire().await.unwrap();
    assert!(!result.changed);
    assert_eq!(store.state(), SyncState::Unauthenticated);
    assert_eq!(store.error().as_deref(), Some("please log in"));
    assert_eq!(transport.calls_to(IDENTITY_URL), 0);

    // Cookie appears; acquisition stores it and the sync publishes Ready.
    jar.set(Some("abc"));
    serve_bob_with_one_live_channel(&transport);
    transport.expect_token("abc");

    let result = acquirer.acquire().await.unwrap();
    assert!(result.changed);
    assert_eq!(store.token().as_deref(), Some("abc"));

    let state = synchronizer.sync().await;
    let SyncState::Ready { identity, channels } = state else {
        panic!("expected Ready, got {state:?}");
    };
    assert_eq!(identity.user_id, 1);
    assert_eq!(identity.username, "bob");
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].slug, "x");
    assert_eq!(channels[0].username, "xara");
    assert!(channels[0].is_live);
    assert_eq!(channels[0].session_title.as_deref(), Some("live now"));
    assert_eq!(channels[0].profile_pic.as_deref(), Some("https://cdn/x.png"));
}

#[tokio::test]
async fn store_events_fire_for_token_and_channels() {
    let jar = TestJar::new(Some("abc"));
    let transport = TestTransport::new();
    serve_bob_with_one_live_channel(&transport);
    let (store, acquirer, synchronizer) = wire(jar, transport);
    let mut events = store.subscribe();

    acquirer.acquire().await.unwrap();
    synchronizer.sync().await;

    assert_eq!(events.try_recv().unwrap(), StoreEvent::TokenUpdated);
    assert_eq!(events.try_recv().unwrap(), StoreEvent::ChannelsUpdated);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn identity_survives_channel_outage_across_cycles() {
    let jar = TestJar::new(Some("abc"));
    let transport = TestTransport::new();
    serve_bob_with_one_live_channel(&transport);
    let (store, acquirer, synchronizer) = wire(jar, transport.clone());

    acquirer.acquire().await.unwrap();
    assert!(synchronizer.sync().await.is_ready());
    let channels_before = store.channels();

    // Channels endpoint starts failing; identity still resolves.
    transport.serve(FOLLOWS_URL, 503, "");
    let state = synchronizer.sync().await;

    assert_eq!(
        state,
        SyncState::Error("failed to fetch followed channels".to_string())
    );
    assert_eq!(store.identity().unwrap().username, "bob");
    assert_eq!(store.channels(), channels_before);
    // Each failed cycle retried the follows endpoint three times.
    assert_eq!(transport.calls_to(FOLLOWS_URL), 1 + 3);
}

#[tokio::test]
async fn expired_token_forces_reauthentication() {
    let jar = TestJar::new(Some("abc"));
    let transport = TestTransport::new();
    transport.serve(IDENTITY_URL, 401, "");
    let (store, acquirer, synchronizer) = wire(jar, transport.clone());

    acquirer.acquire().await.unwrap();
    let state = synchronizer.sync().await;

    assert_eq!(state, SyncState::Unauthenticated);
    assert!(store.token().is_none());
    assert_eq!(transport.calls_to(FOLLOWS_URL), 0);
}

#[tokio::test]
async fn login_poller_finds_cookie_on_fifth_attempt() {
    let jar = TestJar::new(None);
    let transport = TestTransport::new();
    serve_bob_with_one_live_channel(&transport);
    let mut config = fast_config();
    // Wide spacing so the cookie swap below lands between checks.
    config.login_poll.interval = Duration::from_millis(20);
    let store = Arc::new(StateStore::new());
    let fetcher = RetryingFetcher::new(transport.clone(), store.clone(), config.retry.clone());
    let synchronizer = Arc::new(StatusSynchronizer::new(
        fetcher,
        store.clone(),
        config.clone(),
    ));
    let poller = Arc::new(LoginPoller::new(
        jar.clone(),
        store.clone(),
        synchronizer,
        config,
    ));

    let handle = poller.start();
    // Cookie appears after the fourth check.
    while jar.reads.load(Ordering::Relaxed) < 4 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    jar.set(Some("late"));

    assert_eq!(handle.await.unwrap(), LoginOutcome::Found);
    assert_eq!(store.token().as_deref(), Some("late"));
    assert!(store.state().is_ready());
    assert_ne!(
        store.error().as_deref(),
        Some("login failed or session not set")
    );
}

#[tokio::test]
async fn login_poller_times_out_after_five_attempts() {
    let jar = TestJar::new(None);
    let transport = TestTransport::new();
    let config = fast_config();
    let store = Arc::new(StateStore::new());
    let fetcher = RetryingFetcher::new(transport, store.clone(), config.retry.clone());
    let synchronizer = Arc::new(StatusSynchronizer::new(
        fetcher,
        store.clone(),
        config.clone(),
    ));
    let poller = Arc::new(LoginPoller::new(
        jar.clone(),
        store.clone(),
        synchronizer,
        config,
    ));

    assert_eq!(poller.start().await.unwrap(), LoginOutcome::Exhausted);
    assert_eq!(
        store.error().as_deref(),
        Some("login failed or session not set")
    );
    assert_eq!(jar.reads.load(Ordering::Relaxed), 5);
}

#[tokio::test]
async fn scheduler_end_to_end_with_commands() {
    let jar = TestJar::new(Some("abc"));
    let transport = TestTransport::new();
    serve_bob_with_one_live_channel(&transport);
    let (scheduler, handle) = Scheduler::new(
        jar.clone(),
        transport.clone(),
        Arc::new(NoopNavigator),
        fast_config(),
    );
    let task = tokio::spawn(scheduler.run());

    // Install trigger publishes Ready.
    let mut ready = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(2)).await;
        if handle.store.state().is_ready() {
            ready = true;
            break;
        }
    }
    assert!(ready, "install trigger never published Ready");

    // Logout resets everything atomically and stays off the network.
    let calls_before = transport.calls_to(IDENTITY_URL);
    handle.commands.send(Command::Logout).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.store.state(), SyncState::Unauthenticated);
    assert!(handle.store.channels().is_empty());
    assert_eq!(transport.calls_to(IDENTITY_URL), calls_before);

    // A forced fetch brings the state back.
    handle.commands.send(Command::FetchSessionToken).await.unwrap();
    let mut ready = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(2)).await;
        if handle.store.state().is_ready() {
            ready = true;
            break;
        }
    }
    assert!(ready, "forced fetch never published Ready");

    handle.cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn overlapping_publishes_are_last_write_wins() {
    let jar = TestJar::new(Some("abc"));
    let transport = TestTransport::new();
    serve_bob_with_one_live_channel(&transport);
    let (store, acquirer, synchronizer) = wire(jar, transport.clone());
    acquirer.acquire().await.unwrap();

    let g0 = store.generation();
    synchronizer.sync().await;
    let g1 = store.generation();
    // A later cycle observes a different channel list and overwrites.
    transport.serve(FOLLOWS_URL, 200, "[]");
    synchronizer.sync().await;
    let g2 = store.generation();

    assert!(g0 < g1 && g1 < g2);
    assert!(store.channels().is_empty());
}
