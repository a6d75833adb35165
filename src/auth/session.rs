//! Login flow session: discovery, background polling and exactly-once
//! delivery of the outcome.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::Url;
use tokio::sync::{oneshot, watch, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::browser::BrowserLauncher;
use super::outcome::{FlowOutcome, FlowResult, FlowState, FlowStatus};
use super::poll::PollLoop;
use super::transport::{HttpTransport, LoginTransport};
use crate::config::FlowConfig;
use crate::error::FlowError;

/// One browser-delegated login attempt.
///
/// `start` fetches the discovery document and spawns the poll loop; the
/// outcome arrives on the [`FlowResult`] returned by the constructor. All
/// methods take `&self`, so the flow can be shared (e.g. behind an `Arc`)
/// between the task awaiting the result and whatever calls
/// [`cancel`](Self::cancel). Dropping the flow cancels it.
///
/// # Example
/// ```no_run
/// use loginflow::auth::{LoginFlow, SystemBrowser};
/// use loginflow::config::FlowConfig;
///
/// # async fn example() -> loginflow::error::Result<()> {
/// let config = FlowConfig::new("https://cloud.example.com".parse().unwrap());
/// let (flow, result) = LoginFlow::new(config)?;
/// flow.start().await?;
/// flow.open_browser(&SystemBrowser)?;
/// let outcome = result.wait().await;
/// println!("{}", outcome.status_message());
/// # Ok(())
/// # }
/// ```
pub struct LoginFlow {
    shared: Arc<FlowShared>,
    transport: Arc<dyn LoginTransport>,
    config: FlowConfig,
}

impl LoginFlow {
    /// Create a flow talking HTTP to `config.server_url`.
    pub fn new(config: FlowConfig) -> Result<(Self, FlowResult), FlowError> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a flow over a custom transport. The config is not validated.
    pub fn with_transport(
        config: FlowConfig,
        transport: Arc<dyn LoginTransport>,
    ) -> (Self, FlowResult) {
        let (sink, result) = FlowResult::channel();
        let flow = Self {
            shared: Arc::new(FlowShared::new(sink)),
            transport,
            config,
        };
        (flow, result)
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn state(&self) -> FlowState {
        self.shared.core().state
    }

    /// Watch state changes and poll progress.
    pub fn subscribe(&self) -> watch::Receiver<FlowStatus> {
        self.shared.status.subscribe()
    }

    /// Login URL for the user's browser; `None` until discovery succeeded.
    pub fn authorization_link(&self) -> Option<Url> {
        self.shared.core().login_url.clone()
    }

    /// Fetch the discovery document and start polling in the background.
    ///
    /// Returns the login URL. A discovery failure is returned here and also
    /// delivered as [`FlowOutcome::Error`]. Calling `start` twice is a
    /// contract violation and fails with [`FlowError::InvalidState`] without
    /// touching the outcome.
    pub async fn start(&self) -> Result<Url, FlowError> {
        let started = Instant::now();
        self.shared
            .advance(FlowState::Created, FlowState::Discovering)?;
        tracing::info!(
            flow_id = %self.shared.id,
            server = self.config.server_url.host_str().unwrap_or_default(),
            "starting browser login flow"
        );

        let discovered = tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => return Err(FlowError::Cancelled),
            discovered = self.transport.discover(&self.config.server_url) => discovered,
        };
        let document = match discovered.and_then(|document| {
            if self.config.requires_https() {
                document.ensure_https()?;
            }
            Ok(document)
        }) {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(flow_id = %self.shared.id, error = %err, "login discovery failed");
                self.shared.finish(FlowOutcome::Error(err.clone()));
                return Err(err);
            }
        };

        let login_url = document.login_url.clone();
        self.shared.reveal_link(login_url.clone())?;
        tracing::info!(
            flow_id = %self.shared.id,
            login_host = login_url.host_str().unwrap_or_default(),
            "waiting for browser login"
        );

        // Only a concurrent cancel can have moved the flow on since the link
        // was revealed.
        self.shared
            .advance(FlowState::AwaitingUser, FlowState::Polling)
            .map_err(|_| FlowError::Cancelled)?;
        let poll_loop = PollLoop {
            shared: Arc::clone(&self.shared),
            transport: Arc::clone(&self.transport),
            request: document.poll,
            interval: self.config.poll_interval,
            request_timeout: self.config.request_timeout,
            deadline: started + self.config.deadline,
            require_https: self.config.requires_https(),
        };
        tokio::spawn(poll_loop.run());
        Ok(login_url)
    }

    /// Abort the flow and deliver [`FlowOutcome::Cancelled`].
    ///
    /// Returns immediately, even if a poll request is in flight; its result
    /// is discarded. Returns `false` if the flow had already terminated.
    pub fn cancel(&self) -> bool {
        let cancelled = self.shared.finish(FlowOutcome::Cancelled);
        if cancelled {
            tracing::info!(flow_id = %self.shared.id, "login flow cancelled");
        }
        cancelled
    }

    /// Skip the rest of the current poll interval. Returns `false` when the
    /// flow is not polling.
    pub fn poll_now(&self) -> bool {
        if self.state() != FlowState::Polling {
            return false;
        }
        self.shared.poll_now.notify_one();
        true
    }

    /// Open the login link with `launcher`.
    ///
    /// If the browser cannot be opened the flow terminates with
    /// [`FlowOutcome::Unsupported`]; the link stays available through
    /// [`authorization_link`](Self::authorization_link) for manual copying.
    pub fn open_browser(&self, launcher: &dyn BrowserLauncher) -> Result<(), FlowError> {
        let (state, link) = {
            let core = self.shared.core();
            (core.state, core.login_url.clone())
        };
        if state.is_terminal() {
            return Err(FlowError::invalid_state("login flow already finished"));
        }
        let link = link.ok_or_else(|| {
            FlowError::invalid_state("login link is not available before discovery")
        })?;
        launcher.open(&link).map_err(|err| {
            tracing::warn!(flow_id = %self.shared.id, error = %err, "could not open browser");
            self.shared.finish(FlowOutcome::Unsupported);
            FlowError::Unsupported
        })
    }
}

impl Drop for LoginFlow {
    fn drop(&mut self) {
        self.shared.finish(FlowOutcome::Cancelled);
    }
}

/// State shared between a [`LoginFlow`] and its poll task.
pub(crate) struct FlowShared {
    pub(crate) id: Uuid,
    core: Mutex<FlowCore>,
    pub(crate) cancel: CancellationToken,
    pub(crate) poll_now: Notify,
    status: watch::Sender<FlowStatus>,
}

struct FlowCore {
    state: FlowState,
    sink: Option<oneshot::Sender<FlowOutcome>>,
    login_url: Option<Url>,
    polls_sent: u32,
}

impl FlowShared {
    fn new(sink: oneshot::Sender<FlowOutcome>) -> Self {
        let (status, _) = watch::channel(FlowStatus::default());
        Self {
            id: Uuid::new_v4(),
            core: Mutex::new(FlowCore {
                state: FlowState::Created,
                sink: Some(sink),
                login_url: None,
                polls_sent: 0,
            }),
            cancel: CancellationToken::new(),
            poll_now: Notify::new(),
            status,
        }
    }

    fn core(&self) -> MutexGuard<'_, FlowCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, core: &FlowCore) {
        self.status.send_replace(FlowStatus {
            state: core.state,
            polls_sent: core.polls_sent,
        });
    }

    fn advance(&self, from: FlowState, to: FlowState) -> Result<(), FlowError> {
        let mut core = self.core();
        if core.state != from {
            return Err(FlowError::invalid_state(format!(
                "cannot move login flow from {} to {to}",
                core.state
            )));
        }
        core.state = to;
        self.publish(&core);
        tracing::debug!(flow_id = %self.id, state = %to, "login flow state changed");
        Ok(())
    }

    fn reveal_link(&self, login_url: Url) -> Result<(), FlowError> {
        let mut core = self.core();
        if core.state != FlowState::Discovering {
            return Err(FlowError::Cancelled);
        }
        core.login_url = Some(login_url);
        core.state = FlowState::AwaitingUser;
        self.publish(&core);
        Ok(())
    }

    /// Count a poll tick, or `None` if the flow already terminated.
    pub(crate) fn record_poll(&self) -> Option<u32> {
        let mut core = self.core();
        if core.state.is_terminal() {
            return None;
        }
        core.polls_sent += 1;
        self.publish(&core);
        Some(core.polls_sent)
    }

    /// Terminate the flow with `outcome`. Only the first call delivers; later
    /// outcomes are dropped (wiping any credential they carry).
    pub(crate) fn finish(&self, outcome: FlowOutcome) -> bool {
        let sink = {
            let mut core = self.core();
            if core.state.is_terminal() {
                None
            } else {
                core.state = FlowState::Terminated;
                self.publish(&core);
                core.sink.take()
            }
        };
        self.cancel.cancel();
        match sink {
            Some(sink) => {
                let _ = sink.send(outcome);
                true
            }
            None => false,
        }
    }
}
