use super::{MediaNormalizer, run_tool};
use crate::api::error::AppError;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// `MediaNormalizer` backed by the ffmpeg CLI: stream copy with `+faststart`,
/// no re-encoding.
pub struct FfmpegNormalizer {
    binary: String,
    timeout: Duration,
}

impl FfmpegNormalizer {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl MediaNormalizer for FfmpegNormalizer {
    async fn normalize(&self, input: &Path, output: &Path) -> Result<(), AppError> {
        tracing::info!(
            "Running faststart remux: {} -> {}",
            input.display(),
            output.display()
        );

        let mut cmd = Command::new(&self.binary);
        cmd.args(["-y", "-v", "error", "-i"])
            .arg(input)
            .args(["-c", "copy", "-movflags", "+faststart", "-f", "mp4"])
            .arg(output);

        run_tool(cmd, "ffmpeg", self.timeout)
            .await
            .map_err(|e| AppError::TranscodeFailure(e.to_string()))?;

        let written = tokio::fs::metadata(output)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(AppError::TranscodeFailure(
                "ffmpeg exited cleanly but produced no output".to_string(),
            ));
        }

        tracing::info!("Faststart remux complete ({} bytes)", written);
        Ok(())
    }
}
