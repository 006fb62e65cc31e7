use anyhow::Result;
use log::warn;
use std::sync::{Mutex, PoisonError};
use std::thread;

pub type Task<'a> = Box<dyn FnOnce() -> Result<()> + Send + 'a>;

/// 同時執行多個任務並等待全部結束
///
/// 任何任務失敗時回傳最先完成的那個錯誤；其他任務仍會執行到結束，不會被中斷。
pub fn run_concurrently(tasks: Vec<Task<'_>>) -> Result<()> {
    let first_error: Mutex<Option<anyhow::Error>> = Mutex::new(None);

    thread::scope(|scope| {
        for task in tasks {
            let first_error = &first_error;
            scope.spawn(move || {
                if let Err(e) = task() {
                    let mut slot = first_error.lock().unwrap_or_else(PoisonError::into_inner);
                    if slot.is_none() {
                        *slot = Some(e);
                    } else {
                        warn!("額外的任務錯誤: {e:#}");
                    }
                }
            });
        }
    });

    match first_error
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
    {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
