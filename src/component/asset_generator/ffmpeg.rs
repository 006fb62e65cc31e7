use super::{AssetError, AssetGenerator, thumbnail_timestamp};
use crate::config::AssetSettings;
use crate::tools::{SpriteConfig, follow_progress};
use log::debug;
use std::fs;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

/// 以 ffmpeg 產生衍生素材
#[derive(Debug, Clone)]
pub struct FfmpegAssetGenerator {
    settings: AssetSettings,
}

impl FfmpegAssetGenerator {
    #[must_use]
    pub const fn new(settings: AssetSettings) -> Self {
        Self { settings }
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.settings.ffmpeg_path);
        cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]);
        cmd
    }

    #[must_use]
    pub fn thumbnail_command(&self, source: &Path, destination: &Path, duration: f64) -> Command {
        let timestamp = thumbnail_timestamp(duration);
        let mut cmd = self.base_command();
        cmd.args(["-ss", &format!("{timestamp:.3}")])
            .arg("-i")
            .arg(source)
            .args([
                "-frames:v",
                "1",
                "-an",
                "-vf",
                &format!("scale={}:-1", self.settings.thumbnail_width),
                "-q:v",
                &self.settings.jpeg_quality.to_string(),
            ])
            .arg(destination);
        cmd
    }

    #[must_use]
    pub fn sprite_config(&self, duration: f64) -> SpriteConfig {
        SpriteConfig::for_duration(
            duration,
            self.settings.sprite_tile_width,
            self.settings.sprite_tile_height,
        )
    }

    #[must_use]
    pub fn sprite_command(&self, source: &Path, destination: &Path, duration: f64) -> Command {
        let layout = self.sprite_config(duration);
        let (w, h) = (layout.tile_width, layout.tile_height);
        debug!(
            "sprite {}x{} 格，共 {} 格，輸出 {}x{}",
            layout.columns,
            layout.rows,
            layout.total_frames,
            layout.sheet_width(),
            layout.sheet_height()
        );
        // 每格先等比縮小再補黑邊，確保 tile 濾鏡拿到固定尺寸
        let filter = format!(
            "fps={:.6},scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black,tile={}x{}",
            layout.sample_rate(),
            layout.columns,
            layout.rows
        );

        let mut cmd = self.base_command();
        cmd.arg("-i")
            .arg(source)
            .args([
                "-an",
                "-vf",
                &filter,
                "-frames:v",
                "1",
                "-q:v",
                &self.settings.jpeg_quality.to_string(),
            ])
            .arg(destination);
        cmd
    }

    #[must_use]
    pub fn proxy_command(&self, source: &Path, destination: &Path) -> Command {
        let proxy = &self.settings.proxy;
        let mut cmd = self.base_command();
        cmd.arg("-i")
            .arg(source)
            .args([
                "-vf",
                &format!("scale=-2:min({}\\,ih)", proxy.max_height),
                "-r",
                &proxy.frame_rate.to_string(),
                "-c:v",
                &proxy.video_codec,
                "-preset",
                &proxy.preset,
                "-crf",
                &proxy.crf.to_string(),
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-b:a",
                &proxy.audio_bitrate,
                "-movflags",
                "+faststart",
                "-progress",
                "pipe:1",
                "-nostats",
            ])
            .arg(destination);
        cmd
    }

    fn program(&self) -> String {
        self.settings.ffmpeg_path.display().to_string()
    }

    fn spawn_error(&self, source: io::Error) -> AssetError {
        AssetError::Spawn {
            program: self.program(),
            source,
        }
    }

    /// 先寫到暫存檔，確認產生後才取代正式輸出檔
    fn run_to_file(
        &self,
        destination: &Path,
        build: impl FnOnce(&Path) -> Command,
    ) -> Result<(), AssetError> {
        let partial = prepare_partial(destination)?;
        let mut cmd = build(&partial);
        debug!("ffmpeg: {:?}", cmd.get_args().collect::<Vec<_>>());
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|source| self.spawn_error(source))?;
        self.finish(output.status, &output.stderr, &partial, destination)
    }

    fn finish(
        &self,
        status: ExitStatus,
        stderr: &[u8],
        partial: &Path,
        destination: &Path,
    ) -> Result<(), AssetError> {
        if !status.success() {
            let _ = fs::remove_file(partial);
            return Err(AssetError::ProcessFailed {
                program: self.program(),
                status: status.to_string(),
                stderr: String::from_utf8_lossy(stderr).trim().to_string(),
            });
        }
        if !partial.is_file() {
            return Err(AssetError::MissingOutput(destination.to_path_buf()));
        }
        fs::rename(partial, destination).map_err(|source| AssetError::Output {
            path: destination.to_path_buf(),
            source,
        })
    }
}

/// 暫存檔名保留副檔名，讓 ffmpeg 依副檔名決定輸出格式
fn partial_path(destination: &Path) -> PathBuf {
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match destination.extension() {
        Some(ext) => format!("{stem}.partial.{}", ext.to_string_lossy()),
        None => format!("{stem}.partial"),
    };
    destination.with_file_name(name)
}

/// 清掉上次中斷留下的暫存檔
fn prepare_partial(destination: &Path) -> Result<PathBuf, AssetError> {
    let partial = partial_path(destination);
    match fs::remove_file(&partial) {
        Ok(()) => Ok(partial),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(partial),
        Err(source) => Err(AssetError::Output {
            path: partial,
            source,
        }),
    }
}

impl Default for FfmpegAssetGenerator {
    fn default() -> Self {
        Self::new(AssetSettings::default())
    }
}

impl AssetGenerator for FfmpegAssetGenerator {
    fn thumbnail(
        &self,
        source: &Path,
        destination: &Path,
        duration: f64,
    ) -> Result<(), AssetError> {
        self.run_to_file(destination, |output| {
            self.thumbnail_command(source, output, duration)
        })
    }

    fn sprite_sheet(
        &self,
        source: &Path,
        destination: &Path,
        duration: f64,
    ) -> Result<(), AssetError> {
        self.run_to_file(destination, |output| {
            self.sprite_command(source, output, duration)
        })
    }

    fn proxy(
        &self,
        source: &Path,
        destination: &Path,
        duration: f64,
        on_progress: &dyn Fn(f64),
    ) -> Result<(), AssetError> {
        let partial = prepare_partial(destination)?;
        let mut cmd = self.proxy_command(source, &partial);
        debug!("ffmpeg proxy: {}", source.display());
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| self.spawn_error(source))?;

        // stderr 另開執行緒讀取，避免管線塞滿時與 stdout 互相等待
        let stdout = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stderr = thread::scope(|scope| {
            let collector = scope.spawn(move || {
                let mut buffer = Vec::new();
                if let Some(mut pipe) = stderr_pipe {
                    let _ = pipe.read_to_end(&mut buffer);
                }
                buffer
            });
            if let Some(stdout) = stdout {
                follow_progress(BufReader::new(stdout), duration, on_progress);
            }
            collector.join().unwrap_or_default()
        });

        let status = child.wait().map_err(|source| self.spawn_error(source))?;
        self.finish(status, &stderr, &partial, destination)?;
        on_progress(1.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    fn value_after(args: &[String], flag: &str) -> String {
        let index = args.iter().position(|a| a == flag).unwrap();
        args[index + 1].clone()
    }

    #[test]
    fn test_thumbnail_command() {
        let generator = FfmpegAssetGenerator::default();
        let cmd = generator.thumbnail_command(Path::new("/v/a.mp4"), Path::new("/o/t.jpg"), 120.0);
        let args = args_of(&cmd);

        assert_eq!(cmd.get_program(), OsStr::new("ffmpeg"));
        assert_eq!(value_after(&args, "-ss"), "5.000");
        assert_eq!(value_after(&args, "-i"), "/v/a.mp4");
        assert_eq!(value_after(&args, "-vf"), "scale=384:-1");
        assert_eq!(args.last().unwrap(), "/o/t.jpg");
    }

    #[test]
    fn test_sprite_command_uses_layout() {
        let generator = FfmpegAssetGenerator::default();
        let cmd = generator.sprite_command(Path::new("/v/a.mp4"), Path::new("/o/s.jpg"), 30.0);
        let filter = value_after(&args_of(&cmd), "-vf");

        assert!(filter.starts_with("fps=1.000000,"));
        assert!(filter.contains("scale=160:90:force_original_aspect_ratio=decrease"));
        assert!(filter.ends_with("tile=10x3"));
    }

    #[test]
    fn test_proxy_command_reports_progress() {
        let generator = FfmpegAssetGenerator::default();
        let cmd = generator.proxy_command(Path::new("/v/a.mp4"), Path::new("/o/p.mp4"));
        let args = args_of(&cmd);

        assert_eq!(value_after(&args, "-progress"), "pipe:1");
        assert_eq!(value_after(&args, "-vf"), "scale=-2:min(720\\,ih)");
        assert_eq!(value_after(&args, "-c:v"), "libx264");
        assert_eq!(value_after(&args, "-movflags"), "+faststart");
        assert!(args.contains(&"-nostats".to_string()));
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let settings = AssetSettings {
            ffmpeg_path: "/nonexistent/ffmpeg-binary".into(),
            ..AssetSettings::default()
        };
        let generator = FfmpegAssetGenerator::new(settings);
        let result = generator.thumbnail(Path::new("/v/a.mp4"), Path::new("/o/t.jpg"), 10.0);
        assert!(matches!(result, Err(AssetError::Spawn { .. })));
    }

    /// 以 shell 腳本取代 ffmpeg；`$last` 為最後一個參數（輸出檔）
    #[cfg(unix)]
    fn scripted_generator(dir: &Path, body: &str) -> FfmpegAssetGenerator {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-ffmpeg.sh");
        fs::write(&script, format!("#!/bin/sh\nfor last; do :; done\n{body}\n")).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        FfmpegAssetGenerator::new(AssetSettings {
            ffmpeg_path: script,
            ..AssetSettings::default()
        })
    }

    #[test]
    fn test_partial_path_keeps_extension() {
        assert_eq!(
            partial_path(Path::new("/o/abc_thumb.jpg")),
            Path::new("/o/abc_thumb.partial.jpg")
        );
        assert_eq!(partial_path(Path::new("/o/raw")), Path::new("/o/raw.partial"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_zero_without_output_is_missing_output() {
        let temp_dir = TempDir::new().unwrap();
        let generator = scripted_generator(temp_dir.path(), "exit 0");
        let dest = temp_dir.path().join("v_thumb.jpg");

        let result = generator.thumbnail(Path::new("/v/a.mp4"), &dest, 10.0);
        assert!(matches!(result, Err(AssetError::MissingOutput(ref p)) if p == &dest));
        assert!(!dest.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_output_does_not_count_as_produced() {
        let temp_dir = TempDir::new().unwrap();
        let generator = scripted_generator(temp_dir.path(), "exit 0");
        let dest = temp_dir.path().join("v_thumb.jpg");
        fs::write(&dest, b"previous scan").unwrap();

        let result = generator.thumbnail(Path::new("/v/a.mp4"), &dest, 10.0);
        assert!(matches!(result, Err(AssetError::MissingOutput(_))));
        let sprite = generator.sprite_sheet(Path::new("/v/a.mp4"), &dest, 10.0);
        assert!(matches!(sprite, Err(AssetError::MissingOutput(_))));
        // 舊的素材保留原樣
        assert_eq!(fs::read(&dest).unwrap(), b"previous scan");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_process_failed() {
        let temp_dir = TempDir::new().unwrap();
        let generator =
            scripted_generator(temp_dir.path(), "printf partial > \"$last\"\necho boom >&2\nexit 1");
        let dest = temp_dir.path().join("v_sprite.jpg");

        let result = generator.sprite_sheet(Path::new("/v/a.mp4"), &dest, 30.0);
        match result {
            Err(AssetError::ProcessFailed { stderr, .. }) => assert_eq!(stderr, "boom"),
            other => panic!("預期 ProcessFailed，實際為 {other:?}"),
        }
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_written_output_replaces_destination() {
        let temp_dir = TempDir::new().unwrap();
        let generator = scripted_generator(temp_dir.path(), "printf fresh > \"$last\"");
        let dest = temp_dir.path().join("v_thumb.jpg");
        fs::write(&dest, b"previous scan").unwrap();

        generator.thumbnail(Path::new("/v/a.mp4"), &dest, 10.0).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"fresh");
        assert!(!partial_path(&dest).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_proxy_reports_progress_and_output() {
        let temp_dir = TempDir::new().unwrap();
        let generator = scripted_generator(
            temp_dir.path(),
            "echo out_time_us=1000000\necho out_time_us=3000000\nprintf mp4 > \"$last\"",
        );
        let dest = temp_dir.path().join("v_proxy.mp4");
        let seen = Mutex::new(Vec::new());

        generator
            .proxy(Path::new("/v/a.mp4"), &dest, 4.0, &|f: f64| seen.lock().unwrap().push(f))
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), [0.25, 0.75, 1.0]);
        assert!(dest.is_file());
    }

    /// stderr 大量輸出時 proxy 仍會結束並回報失敗
    #[cfg(unix)]
    #[test]
    fn test_proxy_with_large_stderr_does_not_hang() {
        let temp_dir = TempDir::new().unwrap();
        let generator = scripted_generator(
            temp_dir.path(),
            "head -c 300000 /dev/zero | tr '\\0' e >&2\necho out_time_us=1000000\nexit 1",
        );
        let dest = temp_dir.path().join("v_proxy.mp4");

        let (tx, rx) = crossbeam_channel::bounded(1);
        std::thread::spawn(move || {
            let seen = Mutex::new(Vec::new());
            let result = generator.proxy(Path::new("/v/a.mp4"), &dest, 2.0, &|f: f64| {
                seen.lock().unwrap().push(f);
            });
            let _ = tx.send((result, seen.into_inner().unwrap()));
        });

        let (result, seen) = rx
            .recv_timeout(Duration::from_secs(30))
            .expect("proxy 沒有在時間內結束");
        match result {
            Err(AssetError::ProcessFailed { stderr, .. }) => assert_eq!(stderr.len(), 300_000),
            other => panic!("預期 ProcessFailed，實際為 {other:?}"),
        }
        assert_eq!(seen, [0.5]);
    }
}
