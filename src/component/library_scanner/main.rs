use super::events::{ScanPhase, ScanProgress, ScanSummary, progress_channel};
use super::orchestrator::ScanOrchestrator;
use crate::component::asset_generator::FfmpegAssetGenerator;
use crate::config::Config;
use crate::library::Library;
use crate::tools::Ffprobe;
use anyhow::{Result, anyhow};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;

/// 互動式影片庫掃描
pub struct LibraryScanner {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
}

impl LibraryScanner {
    pub const fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    fn build_orchestrator(&self) -> ScanOrchestrator {
        let assets = &self.config.settings.assets;
        ScanOrchestrator::new(
            Arc::new(Ffprobe::new(&assets.ffprobe_path)),
            Arc::new(FfmpegAssetGenerator::new(assets.clone())),
            self.config.file_type_table.clone(),
        )
        .with_worker_count(self.config.settings.worker_count)
        .with_shutdown_signal(Arc::clone(&self.shutdown_signal))
    }

    pub fn run(&self, library: &Library) -> Result<ScanSummary> {
        println!("{}", style(t!("scan.title")).cyan().bold());
        println!(
            "{}",
            style(t!("scan.root", path = library.root().display())).dim()
        );

        let orchestrator = self.build_orchestrator();
        let orchestrator = &orchestrator;
        let (tx, rx) = progress_channel();

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {msg}",
        )?);
        let bar_style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )?
        .progress_chars("#>-");

        let outcome = thread::scope(|scope| {
            let handle = scope.spawn(move || orchestrator.scan(library, &tx));
            for event in &rx {
                Self::render(&progress_bar, &bar_style, &event);
            }
            handle
                .join()
                .map_err(|_| anyhow!("{}", t!("scan.worker_panicked")))
        });

        let summary = match outcome {
            Ok(result) => result?,
            Err(e) => {
                progress_bar.abandon();
                return Err(e);
            }
        };
        self.print_summary(&summary);
        Ok(summary)
    }

    fn render(progress_bar: &ProgressBar, bar_style: &ProgressStyle, event: &ScanProgress) {
        match event.phase {
            ScanPhase::Counting => {
                progress_bar.set_message(t!("scan.counting", count = event.total).to_string());
                progress_bar.tick();
            }
            ScanPhase::Processing => {
                if progress_bar.length() != Some(event.total as u64) {
                    progress_bar.set_length(event.total as u64);
                    progress_bar.set_style(bar_style.clone());
                }
                progress_bar.set_position(event.finished() as u64);
                progress_bar.set_message(event.current_file.clone().unwrap_or_default());
            }
            ScanPhase::Complete => {
                progress_bar.finish_with_message(t!("scan.done").to_string());
            }
            ScanPhase::Error => {
                progress_bar.abandon_with_message(t!("scan.failed").to_string());
            }
        }
    }

    fn print_summary(&self, summary: &ScanSummary) {
        println!();
        println!("{}", style(t!("scan.summary_title")).cyan().bold());
        println!("  {}", t!("scan.summary_total", count = summary.total));
        println!(
            "  {}",
            style(t!("scan.summary_processed", count = summary.processed)).green()
        );
        println!("  {}", t!("scan.summary_skipped", count = summary.skipped));
        if summary.failed > 0 {
            println!(
                "  {}",
                style(t!("scan.summary_failed", count = summary.failed)).red()
            );
        }
        if summary.interrupted {
            println!("{}", style(t!("scan.interrupted")).yellow());
        }

        info!(
            "掃描摘要 - 處理: {}, 略過: {}, 失敗: {}",
            summary.processed, summary.skipped, summary.failed
        );
    }
}
