//! `loginflow login` handler.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{FlowOutcome, LoginFlow, SystemBrowser};
use crate::config::FlowConfig;
use crate::error::FlowError;

use super::LoginArgs;

/// Resolve the config for a login invocation (file < env < flags).
pub fn resolve_config(args: &LoginArgs) -> Result<FlowConfig, FlowError> {
    let mut config = match &args.config {
        Some(path) => FlowConfig::load_from(path, args.server.as_deref())?,
        None => FlowConfig::load(args.server.as_deref())?,
    };
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval = Duration::from_millis(ms);
        if config.request_timeout >= config.poll_interval {
            config.request_timeout = config.poll_interval * 4 / 5;
        }
    }
    if let Some(secs) = args.timeout_secs {
        config.deadline = Duration::from_secs(secs);
    }
    config.validate()?;
    Ok(config)
}

/// Handle `loginflow login`.
pub async fn handle_login(args: LoginArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&args)?;
    let (flow, result) = LoginFlow::new(config)?;
    let flow = Arc::new(flow);

    let link = flow.start().await?;
    println!("🔗 Open this link to log in: {link}");

    // A failed launch terminates the flow as Unsupported; the wait below reports it.
    if args.no_browser || flow.open_browser(&SystemBrowser).is_ok() {
        println!("⏳ Waiting for the login to complete (Ctrl-C to cancel)...");
    }

    let interrupt = {
        let flow = Arc::clone(&flow);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                flow.cancel();
            }
        })
    };

    let outcome = result.wait().await;
    interrupt.abort();

    match outcome {
        FlowOutcome::Success(credential) => {
            println!("✅ Logged in as {}", credential.login_name());
            println!("   Server: {}", credential.server_url());
            if args.show_password {
                println!("   App password: {}", credential.app_password().expose_secret());
            }
            Ok(())
        }
        FlowOutcome::Cancelled => {
            eprintln!("❌ Login cancelled");
            std::process::exit(130);
        }
        other => Err(other.status_message().into()),
    }
}
