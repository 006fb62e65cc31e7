use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

pub const MAX_RECENT_PATHS: usize = 10;
pub const DEFAULT_WORKER_COUNT: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTypeTable {
    #[serde(rename = "VIDEO_FILE")]
    pub video_file: Vec<String>,
    #[serde(rename = "SKIP_DIRECTORY")]
    pub skip_directory: Vec<String>,
}

impl FileTypeTable {
    #[must_use]
    pub fn video_extensions_set(&self) -> HashSet<String> {
        self.video_file
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect()
    }

    #[must_use]
    pub fn skip_directory_set(&self) -> HashSet<String> {
        self.skip_directory.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl Language {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::ZhTw => "zh-TW",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnUs => write!(f, "English"),
            Self::ZhTw => write!(f, "繁體中文"),
        }
    }
}

/// 代理影片（proxy）編碼參數
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProxySettings {
    /// 輸出高度上限，寬度依比例縮放
    pub max_height: u32,
    pub frame_rate: u32,
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_bitrate: String,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            max_height: 720,
            frame_rate: 30,
            video_codec: "libx264".to_string(),
            preset: "veryfast".to_string(),
            crf: 28,
            audio_bitrate: "96k".to_string(),
        }
    }
}

/// 衍生素材（縮圖、sprite、proxy）設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetSettings {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub thumbnail_width: u32,
    pub sprite_tile_width: u32,
    pub sprite_tile_height: u32,
    /// JPEG 品質 (1-31，數字越小品質越高)
    pub jpeg_quality: u8,
    pub proxy: ProxySettings,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            thumbnail_width: 384,
            sprite_tile_width: 160,
            sprite_tile_height: 90,
            jpeg_quality: 5,
            proxy: ProxySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub language: Language,
    /// 掃描時同時處理的影片數量
    pub worker_count: usize,
    pub assets: AssetSettings,
    pub recent_paths: Vec<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            language: Language::default(),
            worker_count: DEFAULT_WORKER_COUNT,
            assets: AssetSettings::default(),
            recent_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub file_type_table: FileTypeTable,
    pub settings: UserSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FileTypeTable {
        FileTypeTable {
            video_file: vec![".mp4".to_string(), ".MKV".to_string()],
            skip_directory: vec!["node_modules".to_string()],
        }
    }

    #[test]
    fn test_video_extensions_normalized() {
        let extensions = table().video_extensions_set();
        assert!(extensions.contains("mp4"));
        assert!(extensions.contains("mkv"));
        assert!(!extensions.contains(".mp4"));
    }

    #[test]
    fn test_user_settings_partial_json_uses_defaults() {
        let settings: UserSettings = serde_json::from_str(r#"{"worker_count": 8}"#).unwrap();
        assert_eq!(settings.worker_count, 8);
        assert_eq!(settings.language, Language::EnUs);
        assert_eq!(settings.assets.sprite_tile_width, 160);
        assert_eq!(settings.assets.proxy.max_height, 720);
    }
}
