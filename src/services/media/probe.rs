use super::{AspectClass, MediaIntrospector, run_tool};
use crate::api::error::AppError;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<serde_json::Value>,
}

impl ProbeStream {
    // Older files carry a `rotate` tag, newer ffprobe reports a display matrix
    fn rotation(&self) -> i64 {
        let from_tag = self.tags.get("rotate").and_then(|r| r.trim().parse::<i64>().ok());

        let from_matrix = self
            .side_data_list
            .iter()
            .filter(|sd| sd["side_data_type"].as_str() == Some("Display Matrix"))
            .find_map(|sd| {
                sd["rotation"]
                    .as_f64()
                    .or_else(|| sd["rotation"].as_str().and_then(|s| s.parse().ok()))
            })
            .map(|r| r.round() as i64);

        from_tag.or(from_matrix).unwrap_or(0)
    }
}

/// Parse ffprobe JSON into display (post-rotation) width and height
pub fn display_dimensions(stdout: &[u8]) -> Result<(u32, u32)> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| anyhow!("Failed to parse ffprobe output: {}", e))?;

    let stream = probe
        .streams
        .first()
        .ok_or_else(|| anyhow!("No video stream found"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        (w, h) => {
            return Err(anyhow!(
                "Could not determine video dimensions: {:?}x{:?}",
                w,
                h
            ));
        }
    };

    let degrees = stream.rotation().rem_euclid(360);
    if (45..135).contains(&degrees) || (225..315).contains(&degrees) {
        Ok((height, width))
    } else {
        Ok((width, height))
    }
}

/// `MediaIntrospector` backed by the ffprobe CLI
pub struct FfprobeIntrospector {
    binary: String,
    timeout: Duration,
}

impl FfprobeIntrospector {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl MediaIntrospector for FfprobeIntrospector {
    async fn inspect(&self, path: &Path) -> Result<AspectClass, AppError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-select_streams",
            "v:0",
        ])
        .arg(path);

        let output = run_tool(cmd, "ffprobe", self.timeout)
            .await
            .map_err(|e| AppError::AnalysisFailure(e.to_string()))?;

        let (width, height) = display_dimensions(&output.stdout)
            .map_err(|e| AppError::AnalysisFailure(e.to_string()))?;

        let class = AspectClass::classify(width, height);
        tracing::info!(
            "Video probe: display={}x{}, aspect={}",
            width,
            height,
            class
        );
        Ok(class)
    }
}
