mod ffmpeg_progress;
mod ffprobe_info;
mod fingerprint;
mod path_validator;
mod sprite_layout;
mod task_group;
mod video_scanner;

pub use ffmpeg_progress::{follow_progress, parse_progress_line, progress_fraction};
pub use ffprobe_info::{DEFAULT_FRAME_RATE, Ffprobe, MetadataProbe, VideoMetadata, parse_probe_output};
pub use fingerprint::{FINGERPRINT_PREFIX_BYTES, calculate_fingerprint, format_mtime};
pub use path_validator::{ensure_directory_exists, validate_directory_exists};
pub use sprite_layout::{DEFAULT_TILE_HEIGHT, DEFAULT_TILE_WIDTH, SpriteConfig};
pub use task_group::{Task, run_concurrently};
pub use video_scanner::VideoWalker;
