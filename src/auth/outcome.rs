use serde::Serialize;
use strum::Display;
use tokio::sync::oneshot;

use super::credential::Credential;
use crate::error::FlowError;

/// Lifecycle of a login flow. A flow only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlowState {
    Created,
    Discovering,
    AwaitingUser,
    Polling,
    Terminated,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        self == Self::Terminated
    }
}

/// Progress snapshot published to [`LoginFlow::subscribe`](super::LoginFlow::subscribe) receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowStatus {
    pub state: FlowState,
    pub polls_sent: u32,
}

impl Default for FlowStatus {
    fn default() -> Self {
        Self {
            state: FlowState::Created,
            polls_sent: 0,
        }
    }
}

/// Terminal result of a login flow, delivered exactly once.
#[derive(Debug)]
pub enum FlowOutcome {
    Success(Credential),
    Unsupported,
    Error(FlowError),
    Cancelled,
    TimedOut,
}

impl FlowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Whether the presentation layer should offer to start over.
    pub fn can_restart(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut | Self::Error(_))
    }

    /// Text a login dialog shows for this outcome.
    pub fn status_message(&self) -> String {
        match self {
            Self::Success(_) => "Logged in.".to_string(),
            Self::Unsupported => {
                "Unable to open the browser, please copy the link to your browser.".to_string()
            }
            Self::Error(err) => err.to_string(),
            Self::Cancelled => "Login cancelled.".to_string(),
            Self::TimedOut => {
                "The login was not completed in time, please try again.".to_string()
            }
        }
    }

    pub fn into_credential(self) -> Option<Credential> {
        match self {
            Self::Success(credential) => Some(credential),
            _ => None,
        }
    }
}

/// Receiving half of the flow's result sink.
///
/// # Example
/// ```no_run
/// use loginflow::auth::{FlowOutcome, LoginFlow};
/// use loginflow::config::FlowConfig;
///
/// # async fn example() -> loginflow::error::Result<()> {
/// let config = FlowConfig::new("https://cloud.example.com".parse().unwrap());
/// let (flow, result) = LoginFlow::new(config)?;
/// let link = flow.start().await?;
/// println!("Open {link} to log in");
/// if let FlowOutcome::Success(credential) = result.wait().await {
///     println!("logged in as {}", credential.login_name());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FlowResult {
    rx: oneshot::Receiver<FlowOutcome>,
}

impl FlowResult {
    pub(crate) fn channel() -> (oneshot::Sender<FlowOutcome>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Wait for the outcome. Resolves to `Cancelled` if the flow went away
    /// without delivering one.
    pub async fn wait(self) -> FlowOutcome {
        self.rx.await.unwrap_or(FlowOutcome::Cancelled)
    }

    /// Take the outcome if it has already been delivered.
    pub fn try_take(&mut self) -> Option<FlowOutcome> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_ordered_forward() {
        assert!(FlowState::Created < FlowState::Discovering);
        assert!(FlowState::Discovering < FlowState::AwaitingUser);
        assert!(FlowState::AwaitingUser < FlowState::Polling);
        assert!(FlowState::Polling < FlowState::Terminated);
        assert!(FlowState::Terminated.is_terminal());
        assert_eq!(FlowState::AwaitingUser.to_string(), "awaiting_user");
    }

    #[test]
    fn timed_out_is_not_an_error_message() {
        let outcome = FlowOutcome::TimedOut;
        assert!(outcome.can_restart());
        assert!(outcome.status_message().contains("try again"));
        assert!(!FlowOutcome::Unsupported.can_restart());
    }

    #[test]
    fn error_message_comes_from_the_error() {
        let outcome = FlowOutcome::Error(FlowError::TokenExpired);
        assert_eq!(outcome.status_message(), FlowError::TokenExpired.to_string());
        assert!(outcome.into_credential().is_none());
    }

    #[tokio::test]
    async fn dropped_sender_resolves_to_cancelled() {
        let (tx, result) = FlowResult::channel();
        drop(tx);
        assert!(matches!(result.wait().await, FlowOutcome::Cancelled));
    }

    #[tokio::test]
    async fn try_take_returns_delivered_outcome() {
        let (tx, mut result) = FlowResult::channel();
        assert!(result.try_take().is_none());
        tx.send(FlowOutcome::TimedOut).unwrap();
        assert!(matches!(result.try_take(), Some(FlowOutcome::TimedOut)));
    }
}
