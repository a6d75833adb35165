//! loginflow — browser-delegated login for desktop and CLI clients.
//!
//! The client asks the account server for a one-time login link and poll
//! token, the user logs in with their own browser, and the flow polls in the
//! background until the server hands out an app password. The outcome
//! (credentials, error, unsupported, cancelled or timed out) is delivered
//! exactly once.
//!
//! # Quick Start
//!
//! ```no_run
//! use loginflow::prelude::*;
//!
//! # async fn example() -> loginflow::error::Result<()> {
//! let config = FlowConfig::load(Some("https://cloud.example.com"))?;
//! let (flow, result) = LoginFlow::new(config)?;
//! let link = flow.start().await?;
//! println!("Log in at {link}");
//! match result.wait().await {
//!     FlowOutcome::Success(credential) => println!("Hello {}", credential.login_name()),
//!     other => println!("{}", other.status_message()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod prelude;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
