//! Convenience re-exports.

pub use crate::auth::{
    BrowserLauncher, Credential, FlowOutcome, FlowResult, FlowState, FlowStatus, HttpTransport,
    LoginFlow, LoginTransport, PollResponse, SecretString, SystemBrowser,
};
pub use crate::config::FlowConfig;
pub use crate::error::{FlowError, Result};
