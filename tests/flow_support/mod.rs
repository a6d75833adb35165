#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use loginflow::auth::{
    BrowserLauncher, Credential, DiscoveryDocument, LoginFlow, LoginTransport, PollRequest,
    PollResponse, SecretString,
};
use loginflow::config::FlowConfig;
use loginflow::error::FlowError;
use reqwest::Url;

pub const DISCOVERY: &str = r#"{
    "poll": {"token": "tok1", "endpoint": "https://s/poll"},
    "login": "https://s/login?tok1"
}"#;

/// One scripted poll reply, optionally after a delay.
pub struct Reply {
    pub delay: Duration,
    pub result: Result<PollResponse, FlowError>,
}

impl Reply {
    pub fn pending() -> Self {
        Self::now(Ok(PollResponse::Pending))
    }

    pub fn granted(login: &str, password: &str, server: &str) -> Self {
        Self::now(Ok(PollResponse::Granted(credential(login, password, server))))
    }

    pub fn error(error: FlowError) -> Self {
        Self::now(Err(error))
    }

    pub fn now(result: Result<PollResponse, FlowError>) -> Self {
        Self {
            delay: Duration::ZERO,
            result,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// In-memory transport that replays a script. Once the script runs out
/// every poll is pending.
pub struct ScriptedTransport {
    discovery: Mutex<Option<Result<DiscoveryDocument, FlowError>>>,
    discovery_delay: Duration,
    replies: Mutex<VecDeque<Reply>>,
    discover_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    tokens: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(discovery: Result<DiscoveryDocument, FlowError>) -> Self {
        Self {
            discovery: Mutex::new(Some(discovery)),
            discovery_delay: Duration::ZERO,
            replies: Mutex::new(VecDeque::new()),
            discover_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn discovering(body: &str) -> Self {
        Self::new(DiscoveryDocument::from_json(body))
    }

    pub fn with_replies(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.replies
            .lock()
            .expect("replies lock poisoned")
            .extend(replies);
        self
    }

    /// Answer discovery only after `delay`.
    pub fn with_discovery_delay(mut self, delay: Duration) -> Self {
        self.discovery_delay = delay;
        self
    }

    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens.lock().expect("tokens lock poisoned").clone()
    }
}

#[async_trait]
impl LoginTransport for ScriptedTransport {
    async fn discover(&self, _base_url: &Url) -> Result<DiscoveryDocument, FlowError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        if !self.discovery_delay.is_zero() {
            tokio::time::sleep(self.discovery_delay).await;
        }
        self.discovery
            .lock()
            .expect("discovery lock poisoned")
            .take()
            .unwrap_or_else(|| Err(FlowError::InvalidState("discovered twice".to_string())))
    }

    async fn poll(&self, request: &PollRequest) -> Result<PollResponse, FlowError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .lock()
            .expect("tokens lock poisoned")
            .push(request.token.expose_secret().to_string());
        let reply = self.replies.lock().expect("replies lock poisoned").pop_front();
        match reply {
            Some(reply) => {
                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }
                reply.result
            }
            None => Ok(PollResponse::Pending),
        }
    }
}

/// Browser launcher that records the URL or fails.
#[derive(Default)]
pub struct FakeBrowser {
    pub fail: bool,
    pub opened: Mutex<Vec<String>>,
}

impl BrowserLauncher for FakeBrowser {
    fn open(&self, url: &Url) -> Result<(), FlowError> {
        if self.fail {
            return Err(FlowError::Unsupported);
        }
        self.opened
            .lock()
            .expect("opened lock poisoned")
            .push(url.to_string());
        Ok(())
    }
}

pub fn credential(login: &str, password: &str, server: &str) -> Credential {
    Credential::new(
        login,
        SecretString::new(password),
        Url::parse(server).expect("server url"),
    )
}

/// 1s interval, 500ms request timeout, 30s deadline.
pub fn config(server: &str) -> FlowConfig {
    FlowConfig::builder()
        .server_url(Url::parse(server).expect("server url"))
        .poll_interval(Duration::from_secs(1))
        .request_timeout(Duration::from_millis(500))
        .deadline(Duration::from_secs(30))
        .build()
}

pub fn flow(
    server: &str,
    transport: ScriptedTransport,
) -> (LoginFlow, loginflow::auth::FlowResult, Arc<ScriptedTransport>) {
    flow_with_config(config(server), transport)
}

pub fn flow_with_config(
    config: FlowConfig,
    transport: ScriptedTransport,
) -> (LoginFlow, loginflow::auth::FlowResult, Arc<ScriptedTransport>) {
    let transport = Arc::new(transport);
    let (flow, result) = LoginFlow::with_transport(config, transport.clone());
    (flow, result, transport)
}
