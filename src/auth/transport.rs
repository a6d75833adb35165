//! HTTP exchange with the account server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::redirect::Policy;
use reqwest::{Response, StatusCode, Url};
use serde::Serialize;
use zeroize::Zeroizing;

use super::credential::{Credential, GrantPayload};
use super::discovery::{DiscoveryDocument, PollRequest};
use crate::config::FlowConfig;
use crate::error::FlowError;

const MAX_REDIRECTS: usize = 10;

/// Result of one poll request.
#[derive(Debug)]
pub enum PollResponse {
    /// The user has not finished logging in yet.
    Pending,
    /// Login finished; credentials granted.
    Granted(Credential),
}

/// Network seam between the login flow and the account server.
///
/// Implementations issue exactly one request per call and never retry; retry
/// policy belongs to the poll loop.
#[async_trait]
pub trait LoginTransport: Send + Sync {
    async fn discover(&self, base_url: &Url) -> Result<DiscoveryDocument, FlowError>;
    async fn poll(&self, request: &PollRequest) -> Result<PollResponse, FlowError>;
}

/// [`LoginTransport`] over `reqwest`.
///
/// # Example
/// ```no_run
/// use loginflow::auth::HttpTransport;
/// use loginflow::config::FlowConfig;
///
/// let config = FlowConfig::new("https://cloud.example.com".parse().unwrap());
/// let transport = HttpTransport::new(&config)?;
/// # Ok::<(), loginflow::error::FlowError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    discovery_path: String,
    request_timeout: Duration,
    discovery_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &FlowConfig) -> Result<Self, FlowError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .redirect(redirect_policy())
            .https_only(config.requires_https())
            .user_agent(config.user_agent());
        if let Some(path) = &config.ca_certificate {
            let pem = std::fs::read(path).map_err(|err| {
                FlowError::Configuration(format!(
                    "failed to read CA certificate {}: {err}",
                    path.display()
                ))
            })?;
            let certificate = reqwest::Certificate::from_pem(&pem).map_err(|err| {
                FlowError::Configuration(format!("invalid CA certificate: {err}"))
            })?;
            builder = builder.add_root_certificate(certificate);
        }
        if config.accept_invalid_certs {
            tracing::warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(Self {
            client: builder.build()?,
            discovery_path: config.discovery_path.clone(),
            request_timeout: config.request_timeout,
            discovery_timeout: config.discovery_timeout,
        })
    }

    pub fn discovery_url(&self, base_url: &Url) -> Result<Url, FlowError> {
        let joined = format!(
            "{}/{}",
            base_url.as_str().trim_end_matches('/'),
            self.discovery_path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|err| FlowError::Configuration(format!("invalid discovery URL: {err}")))
    }
}

#[async_trait]
impl LoginTransport for HttpTransport {
    async fn discover(&self, base_url: &Url) -> Result<DiscoveryDocument, FlowError> {
        let url = self.discovery_url(base_url)?;
        let resp = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .timeout(self.discovery_timeout)
            .send()
            .await
            .map_err(|err| request_error(err, self.discovery_timeout))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(server_error(status, resp).await);
        }
        let body = resp
            .text()
            .await
            .map_err(|err| request_error(err, self.discovery_timeout))?;
        DiscoveryDocument::from_json(&body)
    }

    async fn poll(&self, request: &PollRequest) -> Result<PollResponse, FlowError> {
        let resp = self
            .client
            .post(request.endpoint.clone())
            .header(ACCEPT, "application/json")
            .json(&PollBody {
                token: request.token.expose_secret(),
            })
            .send()
            .await
            .map_err(|err| request_error(err, self.request_timeout))?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(PollResponse::Pending),
            StatusCode::OK => {
                let body = Zeroizing::new(
                    resp.text()
                        .await
                        .map_err(|err| request_error(err, self.request_timeout))?,
                );
                let grant: GrantPayload = serde_json::from_str(&body).map_err(|err| {
                    FlowError::InvalidResponse(format!("Could not parse the poll response: {err}"))
                })?;
                Ok(PollResponse::Granted(grant.into_credential()?))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::GONE => {
                Err(FlowError::TokenExpired)
            }
            status => Err(server_error(status, resp).await),
        }
    }
}

/// Follow same-origin redirects only. A cross-origin `Location` is handed
/// back as the response itself so the poll token never leaves the endpoint's
/// origin.
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        let cross_origin = attempt
            .previous()
            .first()
            .is_some_and(|first| first.origin() != attempt.url().origin());
        if cross_origin {
            tracing::warn!(
                target_host = attempt.url().host_str().unwrap_or_default(),
                "refusing cross-origin redirect"
            );
            attempt.stop()
        } else if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else {
            attempt.follow()
        }
    })
}

#[derive(Serialize)]
struct PollBody<'a> {
    token: &'a str,
}

fn request_error(error: reqwest::Error, timeout: Duration) -> FlowError {
    if error.is_timeout() {
        FlowError::Timeout(timeout.as_millis() as u64)
    } else {
        FlowError::from(error)
    }
}

async fn server_error(status: StatusCode, resp: Response) -> FlowError {
    let body = resp.text().await.unwrap_or_default();
    let message = server_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    });
    FlowError::Server {
        status: status.as_u16(),
        message,
    }
}

/// Pull a readable message out of an error body (`ocs.meta.message`,
/// `message` or `error`).
pub(crate) fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let candidates = [
        value.pointer("/ocs/meta/message"),
        value.get("message"),
        value.get("error"),
    ];
    let message = candidates
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string);
    message
}
