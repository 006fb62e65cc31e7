use crossbeam_channel::{Receiver, Sender, bounded};
use serde::Serialize;

pub const PROGRESS_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanPhase {
    Counting,
    Processing,
    Complete,
    Error,
}

/// 掃描進度事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub current_file: Option<String>,
}

impl ScanProgress {
    pub(crate) fn counting(total: usize, current_file: Option<String>) -> Self {
        Self {
            phase: ScanPhase::Counting,
            total,
            processed: 0,
            skipped: 0,
            failed: 0,
            current_file,
        }
    }

    /// 已完成的單元數（成功、略過、失敗）
    #[must_use]
    pub const fn finished(&self) -> usize {
        self.processed + self.skipped + self.failed
    }
}

/// 掃描結果統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub interrupted: bool,
}

impl ScanSummary {
    pub(crate) fn to_event(self, phase: ScanPhase, current_file: Option<String>) -> ScanProgress {
        ScanProgress {
            phase,
            total: self.total,
            processed: self.processed,
            skipped: self.skipped,
            failed: self.failed,
            current_file,
        }
    }
}

/// 建立有界的進度事件通道
#[must_use]
pub fn progress_channel() -> (Sender<ScanProgress>, Receiver<ScanProgress>) {
    bounded(PROGRESS_CHANNEL_CAPACITY)
}
