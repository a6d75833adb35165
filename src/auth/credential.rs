use std::fmt;

use reqwest::Url;
use serde::Deserialize;
use zeroize::Zeroize;

use super::secret::SecretString;
use crate::error::FlowError;

/// App-specific credentials granted at the end of a successful login.
///
/// A `Credential` is moved to exactly one consumer. Its login name and app
/// password are overwritten when it is dropped, so the consumer only has to
/// copy out what it persists.
pub struct Credential {
    login_name: String,
    app_password: SecretString,
    server_url: Url,
}

impl Credential {
    pub fn new(login_name: impl Into<String>, app_password: SecretString, server_url: Url) -> Self {
        Self {
            login_name: login_name.into(),
            app_password,
            server_url,
        }
    }

    pub fn login_name(&self) -> &str {
        &self.login_name
    }

    pub fn app_password(&self) -> &SecretString {
        &self.app_password
    }

    /// Server the credentials are valid for, as reported by the account service.
    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    /// Overwrite the sensitive fields in place.
    pub fn wipe(&mut self) {
        self.login_name.zeroize();
        self.app_password.wipe();
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("login_name", &"[REDACTED]")
            .field("app_password", &self.app_password)
            .field("server_url", &self.server_url.as_str())
            .finish()
    }
}

/// Successful poll response body.
#[derive(Deserialize)]
pub(crate) struct GrantPayload {
    server: String,
    #[serde(rename = "loginName")]
    login_name: String,
    #[serde(rename = "appPassword")]
    app_password: SecretString,
}

impl GrantPayload {
    pub(crate) fn into_credential(self) -> Result<Credential, FlowError> {
        if self.login_name.trim().is_empty() {
            return Err(FlowError::InvalidResponse(
                "Poll response missing loginName".to_string(),
            ));
        }
        if self.app_password.is_empty() {
            return Err(FlowError::InvalidResponse(
                "Poll response missing appPassword".to_string(),
            ));
        }
        let server_url = Url::parse(self.server.trim()).map_err(|err| {
            FlowError::InvalidResponse(format!("Poll response server URL invalid: {err}"))
        })?;
        Ok(Credential::new(self.login_name, self.app_password, server_url))
    }
}
