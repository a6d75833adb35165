//! Browser-delegated login flow: discovery, polling and credential handoff.

pub mod browser;
pub mod credential;
pub mod discovery;
pub mod outcome;
mod poll;
pub mod secret;
pub mod session;
pub mod transport;

pub use browser::{BrowserLauncher, SystemBrowser};
pub use credential::Credential;
pub use discovery::{DiscoveryDocument, PollRequest};
pub use outcome::{FlowOutcome, FlowResult, FlowState, FlowStatus};
pub use secret::SecretString;
pub use session::LoginFlow;
pub use transport::{HttpTransport, LoginTransport, PollResponse};
