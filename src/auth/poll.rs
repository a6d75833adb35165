//! Background poll loop driving one login flow towards its outcome.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};

use super::discovery::PollRequest;
use super::outcome::FlowOutcome;
use super::session::FlowShared;
use super::transport::{LoginTransport, PollResponse};
use crate::error::FlowError;
use crate::util::timeout::with_timeout;

/// Polls the discovered endpoint until a terminal response, the deadline or
/// cancellation. Runs as a single task, so requests never overlap.
pub(crate) struct PollLoop {
    pub(crate) shared: Arc<FlowShared>,
    pub(crate) transport: Arc<dyn LoginTransport>,
    pub(crate) request: PollRequest,
    pub(crate) interval: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) deadline: Instant,
    pub(crate) require_https: bool,
}

impl PollLoop {
    pub(crate) async fn run(self) {
        let deadline = time::sleep_until(self.deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = self.shared.cancel.cancelled() => return,
                _ = &mut deadline => {
                    self.time_out();
                    return;
                }
                _ = self.shared.poll_now.notified() => {
                    tracing::debug!(flow_id = %self.shared.id, "immediate poll requested");
                }
                _ = time::sleep(self.interval) => {}
            }

            let Some(tick) = self.shared.record_poll() else {
                return;
            };
            let response = tokio::select! {
                biased;
                _ = self.shared.cancel.cancelled() => return,
                _ = &mut deadline => {
                    self.time_out();
                    return;
                }
                response = with_timeout(self.request_timeout, self.transport.poll(&self.request)) => response,
            };

            if self.handle(tick, response).is_break() {
                return;
            }
        }
    }

    fn handle(&self, tick: u32, response: Result<PollResponse, FlowError>) -> ControlFlow<()> {
        let flow_id = self.shared.id;
        match response {
            Ok(PollResponse::Pending) => {
                tracing::debug!(%flow_id, tick, "login not completed yet");
                ControlFlow::Continue(())
            }
            Ok(PollResponse::Granted(credential)) => {
                if self.require_https && credential.server_url().scheme() != "https" {
                    tracing::warn!(%flow_id, tick, "granted server URL is not HTTPS");
                    self.shared.finish(FlowOutcome::Error(FlowError::InsecureUrl(
                        "the returned server URL does not use HTTPS although the login URL does"
                            .to_string(),
                    )));
                } else {
                    tracing::info!(%flow_id, tick, "login flow completed");
                    self.shared.finish(FlowOutcome::Success(credential));
                }
                ControlFlow::Break(())
            }
            Err(err) if err.is_transient() => {
                tracing::warn!(%flow_id, tick, error = %err, "poll request failed, retrying");
                ControlFlow::Continue(())
            }
            Err(err) => {
                tracing::warn!(%flow_id, tick, error = %err, "login flow failed");
                self.shared.finish(FlowOutcome::Error(err));
                ControlFlow::Break(())
            }
        }
    }

    fn time_out(&self) {
        tracing::info!(flow_id = %self.shared.id, "login flow deadline elapsed");
        self.shared.finish(FlowOutcome::TimedOut);
    }
}
