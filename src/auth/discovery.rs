use reqwest::Url;
use serde::Deserialize;

use super::secret::SecretString;
use crate::error::FlowError;

/// Login URL and poll coordinates returned by the discovery request.
///
/// Fetched once per login attempt and never modified afterwards.
#[derive(Debug, Clone)]
pub struct DiscoveryDocument {
    pub login_url: Url,
    pub poll: PollRequest,
}

/// Request re-sent unchanged on every poll tick.
#[derive(Debug, Clone)]
pub struct PollRequest {
    pub endpoint: Url,
    pub token: SecretString,
}

impl DiscoveryDocument {
    /// Parse a discovery response body.
    ///
    /// Expected shape: `{"poll": {"token": "...", "endpoint": "..."}, "login": "..."}`.
    pub fn from_json(body: &str) -> Result<Self, FlowError> {
        let wire: DiscoveryWire = serde_json::from_str(body).map_err(|err| {
            FlowError::InvalidResponse(format!("Could not parse the discovery document: {err}"))
        })?;
        if wire.poll.token.is_empty() {
            return Err(FlowError::InvalidResponse(
                "Discovery document missing poll token".to_string(),
            ));
        }
        let endpoint = parse_url("poll endpoint", &wire.poll.endpoint)?;
        let login_url = parse_url("login URL", &wire.login)?;
        Ok(Self {
            login_url,
            poll: PollRequest {
                endpoint,
                token: wire.poll.token,
            },
        })
    }

    /// Reject documents that would downgrade an `https` server to plain `http`.
    pub fn ensure_https(&self) -> Result<(), FlowError> {
        for (label, url) in [("login URL", &self.login_url), ("poll endpoint", &self.poll.endpoint)] {
            if url.scheme() != "https" {
                return Err(FlowError::InsecureUrl(format!(
                    "the {label} does not use HTTPS although the server URL does"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct DiscoveryWire {
    poll: PollWire,
    login: String,
}

#[derive(Deserialize)]
struct PollWire {
    token: SecretString,
    endpoint: String,
}

fn parse_url(label: &str, value: &str) -> Result<Url, FlowError> {
    let url = Url::parse(value.trim()).map_err(|err| {
        FlowError::InvalidResponse(format!("Discovery document {label} invalid: {err}"))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FlowError::InvalidResponse(format!(
            "Discovery document {label} has unsupported scheme {other}"
        ))),
    }
}
