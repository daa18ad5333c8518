//! `eh`: command-line entry point.
//!
//! Startup sequence:
//! 1. Parse arguments.
//! 2. Load and validate [`config::Config`] (file + `EH_*` environment).
//! 3. Initialise logging to stderr.
//! 4. Run the subcommand; on failure print the error chain and exit with the
//!    code of the error's kind.

mod cli;
mod commands;
mod config;
mod telemetry;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use eh_common::{ErrorKind, SecretsError};
use eh_secrets::{Engine, UrlTransport};

use cli::{Cli, Command};
use commands::Transform;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = match config::Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => return fail(&e, ErrorKind::Config.exit_code()),
    };

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    let level = if cli.verbose { "debug" } else { cfg.log_level.as_str() };
    if let Err(e) = telemetry::init(level, &cfg.log_format, cli.quiet) {
        return fail(&e, 1);
    }

    // -----------------------------------------------------------------------
    // 3. Command
    // -----------------------------------------------------------------------
    match run(cli, &cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e, exit_code(&e)),
    }
}

async fn run(cli: Cli, cfg: &config::Config) -> Result<()> {
    let transport = UrlTransport::new(cfg.http_timeout(), cfg.s3_endpoint.clone())
        .context("failed to initialise transport")?;
    let engine = Engine::new(transport, cfg.settings());

    match cli.command {
        Command::Encrypt(args) => commands::transform(&engine, Transform::Encrypt, &args).await,
        Command::Decrypt(args) => commands::transform(&engine, Transform::Decrypt, &args).await,
        Command::Read { location } => commands::read(&engine, location.as_deref()).await,
    }
}

/// Exit code of the first engine error in the chain; 1 for anything else.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|e| e.downcast_ref::<SecretsError>())
        .map_or(1, |e| e.kind().exit_code())
}

fn fail(err: &anyhow::Error, code: i32) -> ExitCode {
    eprintln!("error: {err:#}");
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
