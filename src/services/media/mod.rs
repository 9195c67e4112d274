//! Out-of-process media tooling.
//!
//! The orchestrator only sees the `MediaIntrospector` and `MediaNormalizer`
//! traits, which take file paths in and hand structured data or a file out.
//! The ffprobe/ffmpeg implementations live in `probe` and `remux`.

pub mod probe;
pub mod remux;

pub use probe::FfprobeIntrospector;
pub use remux::FfmpegNormalizer;

use crate::api::error::AppError;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Relative tolerance when matching a width:height ratio to a canonical one
pub const ASPECT_TOLERANCE: f64 = 0.01;

/// Storage bucket for a video, decided by its display aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    pub fn classify(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return AspectClass::Other;
        }
        let ratio = width as f64 / height as f64;
        let near = |target: f64| ((ratio / target) - 1.0).abs() <= ASPECT_TOLERANCE;

        if near(16.0 / 9.0) {
            AspectClass::Landscape
        } else if near(9.0 / 16.0) {
            AspectClass::Portrait
        } else {
            AspectClass::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AspectClass::Landscape => "16:9",
            AspectClass::Portrait => "9:16",
            AspectClass::Other => "other",
        }
    }

    /// Key prefix used when publishing
    pub fn folder(self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }
}

impl std::fmt::Display for AspectClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait MediaIntrospector: Send + Sync {
    /// Classify the staged video at `path`. Fails with `AnalysisFailure`.
    async fn inspect(&self, path: &Path) -> Result<AspectClass, AppError>;
}

#[async_trait]
pub trait MediaNormalizer: Send + Sync {
    /// Remux `input` into `output` with the index moved to the front.
    /// Fails with `TranscodeFailure`.
    async fn normalize(&self, input: &Path, output: &Path) -> Result<(), AppError>;
}

/// Run an external tool to completion within `budget`, killing it on timeout.
/// A non-zero exit status is an error carrying the tool's stderr.
pub(crate) async fn run_tool(mut cmd: Command, name: &str, budget: Duration) -> Result<Output> {
    cmd.kill_on_drop(true).stdin(std::process::Stdio::null());

    let output = tokio::time::timeout(budget, cmd.output())
        .await
        .map_err(|_| anyhow!("{} timed out after {:?}", name, budget))?
        .map_err(|e| anyhow!("Failed to run {}: {}", name, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("{} exited with {}: {}", name, output.status, stderr.trim()));
    }

    Ok(output)
}
