use anyhow::{Context, Result, bail};
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_FRAME_RATE: f64 = 30.0;

#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub duration_seconds: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: Option<String>,
    pub frame_rate: f64,
    pub bit_rate: Option<u64>,
}

/// 影片資訊探測介面
pub trait MetadataProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<VideoMetadata>;
}

/// 透過外部 ffprobe 程序取得影片資訊
#[derive(Debug, Clone)]
pub struct Ffprobe {
    binary: PathBuf,
}

impl Ffprobe {
    #[must_use]
    pub fn new(binary: &Path) -> Self {
        Self {
            binary: binary.to_path_buf(),
        }
    }
}

impl Default for Ffprobe {
    fn default() -> Self {
        Self::new(Path::new("ffprobe"))
    }
}

impl MetadataProbe for Ffprobe {
    fn probe(&self, path: &Path) -> Result<VideoMetadata> {
        debug!("ffprobe: {}", path.display());
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .with_context(|| format!("無法執行 ffprobe: {}", path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("ffprobe 執行失敗 ({}): {}", path.display(), stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_probe_output(&stdout).with_context(|| format!("無法解析影片資訊: {}", path.display()))
    }
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
}

/// 解析 ffprobe 的 JSON 輸出
///
/// 缺少視訊串流時寬高為 `None`；長度優先取 format，其次取串流，皆無則為 0。
pub fn parse_probe_output(json: &str) -> Result<VideoMetadata> {
    let probe: FfprobeOutput = serde_json::from_str(json).context("無法解析 ffprobe 輸出")?;

    let video_stream = probe.streams.as_ref().and_then(|streams| {
        streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
    });

    let duration_seconds = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| video_stream.and_then(|s| s.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    let bit_rate = probe
        .format
        .as_ref()
        .and_then(|f| f.bit_rate.as_deref())
        .or_else(|| video_stream.and_then(|s| s.bit_rate.as_deref()))
        .and_then(|b| b.parse::<u64>().ok());

    let frame_rate = video_stream
        .and_then(|s| s.r_frame_rate.as_deref())
        .and_then(parse_frame_rate)
        .unwrap_or(DEFAULT_FRAME_RATE);

    Ok(VideoMetadata {
        duration_seconds,
        width: video_stream.and_then(|s| s.width),
        height: video_stream.and_then(|s| s.height),
        codec: video_stream.and_then(|s| s.codec_name.clone()),
        frame_rate,
        bit_rate,
    })
}

/// 解析幀率字串（例如 "30/1" 或 "30000/1001"）
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = if let Some((num_str, den_str)) = rate.split_once('/') {
        let num: f64 = num_str.trim().parse().ok()?;
        let den: f64 = den_str.trim().parse().ok()?;
        if den == 0.0 {
            return None;
        }
        num / den
    } else {
        rate.trim().parse().ok()?
    };
    (value.is_finite() && value > 0.0).then_some(value)
}
