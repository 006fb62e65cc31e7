use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 外部程序產生素材時的錯誤
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("無法啟動 {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} 執行失敗 ({status}): {stderr}")]
    ProcessFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// 程序正常結束但沒有產生輸出檔
    #[error("輸出檔案未建立: {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("無法處理輸出檔 {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
