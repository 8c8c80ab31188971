//! Deployment via the Vercel CLI.

use serde_json::{json, Value};
use tokio::process::Command;
use tracing::info;

use crate::errors::{ConfigError, ToolError};

/// Run a production deployment with the `vercel` CLI.
///
/// Requires `VERCEL_TOKEN` and the CLI on PATH; both absences are
/// configuration errors, not retryable failures. A non-zero exit propagates
/// the CLI's stderr as the error message.
pub async fn vercel_deploy() -> Result<Value, ToolError> {
    let token = std::env::var("VERCEL_TOKEN")
        .ok()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ConfigError("VERCEL_TOKEN is required for deploy.vercel".into()))?;

    info!("Running: vercel --token *** -y --prod");
    let output = Command::new("vercel")
        .args(["--token", &token, "-y", "--prod"])
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::Config(ConfigError(
                    "vercel CLI not found. Install: npm i -g vercel".into(),
                ))
            } else {
                ToolError::Other(anyhow::Error::new(e).context("Failed to spawn vercel CLI"))
            }
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    info!("{}", stdout.trim());

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ToolError::ExternalService {
            service: "vercel",
            status: output.status.code().unwrap_or(1).unsigned_abs() as u16,
            body: stderr.trim().to_string(),
        });
    }
    Ok(json!({"ok": true}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_token_is_a_config_error() {
        std::env::remove_var("VERCEL_TOKEN");
        let err = vercel_deploy().await.unwrap_err();
        assert!(matches!(err, ToolError::Config(_)));
        assert!(err.to_string().contains("VERCEL_TOKEN"));
    }
}
