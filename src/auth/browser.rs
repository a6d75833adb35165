use reqwest::Url;

use crate::error::FlowError;

/// Opens the login link in the user's browser.
///
/// Implemented by the presentation layer or platform glue; the flow only
/// needs to know whether opening worked.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &Url) -> Result<(), FlowError>;
}

/// Launches the system default browser through the `open` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &Url) -> Result<(), FlowError> {
        open::that(url.as_str()).map_err(|err| {
            tracing::debug!(error = %err, "system browser launch failed");
            FlowError::Unsupported
        })
    }
}
