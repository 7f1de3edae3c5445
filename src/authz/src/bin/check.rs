//! # Authorization check tool
//!
//! Loads a policy file, binds every policy to a caller-role service and
//! prints the decision for one caller.
//!
//! ## Usage
//!
//! ```text
//! authz-check [--config <policies.json>] <caller-id> <caller-roles> [<requirement>...]
//! ```
//!
//! `<caller-roles>` is a comma-separated list (use `""` for none). Each
//! requirement is a declaration such as `Admin` or `Editor:writer,reviewer`.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `AUTHZ_CONFIG` - Policy file path (overridden by `--config`)
//! - `AUTHZ_EVAL_TIMEOUT_MS` - Per-service deadline in milliseconds
//! - `RUST_LOG` - Log level (default: info)
//!
//! Exit status: 0 granted, 1 denied, 2 misconfiguration or service fault.

use anyhow::{bail, Context};
use component_authz::{guard, AuthorizationManager, Caller, PolicyFile};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_ENV: &str = "AUTHZ_CONFIG";

struct Invocation {
    config: String,
    caller: Caller,
    requirements: Vec<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Invocation> {
    let mut config = std::env::var(CONFIG_ENV).ok();
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config = Some(args.next().context("--config needs a path")?);
            }
            _ => positional.push(arg),
        }
    }

    let Some(config) = config else {
        bail!("no policy file given, pass --config or set {CONFIG_ENV}");
    };

    let mut positional = positional.into_iter();
    let caller_id = positional.next().context("missing <caller-id>")?;
    let roles = positional.next().unwrap_or_default();

    let caller = Caller::new(caller_id).with_roles(
        roles
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
    );

    Ok(Invocation {
        config,
        caller,
        requirements: positional.collect(),
    })
}

async fn run(invocation: Invocation) -> anyhow::Result<bool> {
    let mut file = PolicyFile::load(&invocation.config)
        .with_context(|| format!("loading policy file {}", invocation.config))?;
    file.manager = file.manager.with_env_overrides()?;

    info!("Configuration:");
    info!("  Policies: {}", file.policies.len());
    info!("  Evaluation timeout: {:?}", file.manager.evaluation_timeout);

    let manager = AuthorizationManager::builder().with_policy_file(file).build()?;
    let requirements = guard::declare(&invocation.requirements)?;

    Ok(manager.authorize(&invocation.caller, &requirements).await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting authz-check v{}", component_authz::VERSION);

    let invocation = match parse_args(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(2);
        }
    };

    match run(invocation).await {
        Ok(true) => {
            println!("granted");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("denied");
            ExitCode::from(1)
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}
