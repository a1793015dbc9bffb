//! `managerctl`: operator CLI for the cloud job manager.
//!
//! This binary is the composition root for the workspace. Responsibilities:
//!
//! 1. **Parse configuration**: merge flags, `MANAGER_*` environment variables,
//!    and an optional JSON config file into a [`config::ClientConfig`].
//! 2. **Wire observability**: configure `tracing-subscriber` (text or JSON on
//!    stderr) and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an OpenTelemetry
//!    OTLP exporter. All `tracing` spans and events emitted by the `manager`
//!    and `manager-http` crates flow through this layer.
//! 3. **Construct infrastructure**: build the `HttpTransport` and wrap it in a
//!    `ManagerClient` with the configured call options and retry policy.
//! 4. **Run one subcommand**: invoke the matching remote procedure and print
//!    its result as JSON on stdout. Any error exits with status 1.
//!
//! ```bash
//! managerctl --address 10.0.0.5 submit --data '{"engine": "mapreduce", "nodes": 4}'
//! MANAGER_SECRET=... managerctl --address 10.0.0.5 file-exists /output/run-7.txt
//! managerctl --config manager.json --retry --max-attempts 20 engines
//! ```

mod commands;
mod config;
mod observability;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use crate::commands::Command;
use crate::config::{ClientConfig, FileConfig, LogFormat, Overrides};

/// Operator client for the cloud job manager.
#[derive(Debug, Parser)]
#[command(name = "managerctl", version, about)]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true, env = "MANAGER_CONFIG")]
    config: Option<PathBuf>,

    /// Host name or IP address of the job manager.
    #[arg(long, global = true, env = "MANAGER_ADDRESS")]
    address: Option<String>,

    /// Shared secret the job manager expects on every call.
    #[arg(long, global = true, env = "MANAGER_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Per-attempt deadline in seconds (default: effectively unbounded).
    #[arg(long, global = true)]
    deadline_secs: Option<u64>,

    /// Retry connection refusals and unclassified faults.
    #[arg(long, global = true)]
    retry: bool,

    /// Give up after this many attempts (default: never).
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Pause between attempts, in milliseconds.
    #[arg(long, global = true)]
    backoff_ms: Option<u64>,

    /// Accept self-signed or otherwise invalid TLS certificates.
    #[arg(long, global = true)]
    insecure: bool,

    /// Log format on stderr.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let overrides = Overrides {
            address: self.address.clone(),
            secret: self.secret.clone(),
            deadline_secs: self.deadline_secs,
            retry_on_failure: self.retry,
            max_attempts: self.max_attempts,
            backoff_ms: self.backoff_ms,
            accept_invalid_certs: self.insecure,
            log_format: self.log_format,
        };
        Ok(ClientConfig::resolve(file, overrides)?)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.client_config()?;
    let telemetry = observability::init(config.log_format)?;

    let outcome = execute(&config, cli.command).await;
    telemetry.shutdown();
    let result = outcome?;

    let rendered = serde_json::to_string_pretty(&result).context("cannot render result")?;
    println!("{rendered}");
    Ok(())
}

async fn execute(config: &ClientConfig, command: Command) -> anyhow::Result<manager::CallResult> {
    let client = manager_http::connect(config.address.as_str(), config.secret.expose(), &config.http)?
        .with_call_options(config.call_options)
        .with_retry_policy(config.retry_policy);

    tracing::info!(
        endpoint = %client.connection().endpoint(),
        deadline = ?config.call_options.deadline,
        retry_on_failure = config.call_options.retry_on_failure,
        "calling job manager"
    );
    command.execute(&client).await
}
