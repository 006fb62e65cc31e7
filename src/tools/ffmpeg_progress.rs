//! 解析 ffmpeg `-progress pipe:1` 輸出的 key=value 進度行

use std::io::BufRead;

/// 解析單行進度，回傳已編碼的秒數
///
/// 支援 `out_time_us`、`out_time_ms`（ffmpeg 實際單位為微秒）以及
/// `out_time=HH:MM:SS.micro`。
#[must_use]
pub fn parse_progress_line(line: &str) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => value.parse::<u64>().ok().map(|us| us as f64 / 1e6),
        "out_time" => parse_clock(value),
        _ => None,
    }
}

/// 解析 `HH:MM:SS.micro` 格式
fn parse_clock(raw: &str) -> Option<f64> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let h = parts[0].parse::<u64>().ok()?;
    let m = parts[1].parse::<u64>().ok()?;
    let s = parts[2].parse::<f64>().ok()?;
    Some((h * 3600 + m * 60) as f64 + s)
}

/// 計算進度比例（0.0 ~ 1.0）
#[must_use]
pub fn progress_fraction(elapsed: f64, duration: f64) -> f64 {
    if duration <= 0.0 || !elapsed.is_finite() {
        return 0.0;
    }
    (elapsed / duration).clamp(0.0, 1.0)
}

/// 讀取整個進度串流，每次進度增加時呼叫 `on_progress`
///
/// 回傳的比例保證不遞減。
pub fn follow_progress<R: BufRead>(reader: R, duration: f64, on_progress: &dyn Fn(f64)) {
    let mut last = 0.0_f64;
    for line in reader.lines().map_while(Result::ok) {
        if let Some(elapsed) = parse_progress_line(&line) {
            let fraction = progress_fraction(elapsed, duration);
            if fraction > last {
                last = fraction;
                on_progress(fraction);
            }
        }
    }
}
