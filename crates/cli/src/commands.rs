use std::path::Path;

use anyhow::{Context, Result};
use eh_common::SecretsError;
use eh_secrets::Engine;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::cli::TransformArgs;

#[derive(Debug, Clone, Copy)]
pub enum Transform {
    Encrypt,
    Decrypt,
}

pub async fn transform(engine: &Engine, op: Transform, args: &TransformArgs) -> Result<()> {
    let file = args.file.as_deref().filter(|path| *path != Path::new("-"));
    if args.in_place && file.is_none() {
        anyhow::bail!("--in-place needs a FILE, standard input cannot be rewritten");
    }

    let input = match file {
        Some(path) => tokio::fs::read(path)
            .await
            .map_err(|e| SecretsError::fetch(path.display().to_string(), e))?,
        None => read_stdin().await?,
    };

    let output = match op {
        Transform::Encrypt => engine.encrypt(&input).await?,
        Transform::Decrypt => engine.decrypt(&input).await?,
    };

    match file {
        Some(path) if args.in_place => {
            tokio::fs::write(path, &output)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            debug!(path = %path.display(), ?op, "rewrote file in place");
            Ok(())
        }
        _ => write_stdout(&output).await,
    }
}

pub async fn read(engine: &Engine, location: Option<&str>) -> Result<()> {
    let output = engine.read(location.unwrap_or("-")).await?;
    write_stdout(&output).await
}

async fn read_stdin() -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut buf)
        .await
        .map_err(|e| SecretsError::fetch("-", e))?;
    Ok(buf)
}

async fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(bytes)
        .await
        .context("failed to write to standard output")?;
    stdout.flush().await.context("failed to flush standard output")
}
