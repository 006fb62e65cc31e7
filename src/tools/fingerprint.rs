use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;

/// 只讀取檔案開頭 64 KiB
pub const FINGERPRINT_PREFIX_BYTES: u64 = 64 * 1024;

/// 指紋長度（128 bit，32 個十六進位字元）
const FINGERPRINT_HEX_LEN: usize = 32;

/// 將檔案修改時間轉為 ISO-8601 字串（毫秒精度）
#[must_use]
pub fn format_mtime(mtime: SystemTime) -> String {
    DateTime::<Utc>::from(mtime).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 計算檔案指紋：BLAKE3(前 64 KiB + 檔案大小 + 修改時間)，截為 128 bit
///
/// 僅作為變更偵測用，不保證內容唯一性。
pub fn calculate_fingerprint(path: &Path) -> Result<String> {
    let metadata =
        std::fs::metadata(path).with_context(|| format!("無法讀取檔案資訊: {}", path.display()))?;
    let mtime = metadata
        .modified()
        .with_context(|| format!("無法取得修改時間: {}", path.display()))?;

    let file = File::open(path).with_context(|| format!("無法開啟檔案: {}", path.display()))?;
    let mut prefix = Vec::with_capacity(FINGERPRINT_PREFIX_BYTES as usize);
    file.take(FINGERPRINT_PREFIX_BYTES)
        .read_to_end(&mut prefix)
        .with_context(|| format!("讀取檔案失敗: {}", path.display()))?;

    Ok(fingerprint_parts(&prefix, metadata.len(), &format_mtime(mtime)))
}

fn fingerprint_parts(prefix: &[u8], size: u64, mtime: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(prefix);
    hasher.update(size.to_string().as_bytes());
    hasher.update(mtime.as_bytes());
    hasher.finalize().to_hex()[..FINGERPRINT_HEX_LEN].to_string()
}
