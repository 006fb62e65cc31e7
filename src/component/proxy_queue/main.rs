use super::queue::ProxyQueue;
use crate::component::asset_generator::FfmpegAssetGenerator;
use crate::config::Config;
use crate::library::Library;
use crate::store::{JobStatus, ProxyJob};
use anyhow::Result;
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Select};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rust_i18n::t;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// 互動式 proxy 佇列管理
pub struct ProxyManager {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
}

impl ProxyManager {
    pub const fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    fn queue_for(&self, library: &Arc<Library>) -> ProxyQueue {
        ProxyQueue::new(
            Arc::clone(library),
            Arc::new(FfmpegAssetGenerator::new(self.config.settings.assets.clone())),
        )
        .with_shutdown_signal(Arc::clone(&self.shutdown_signal))
    }

    /// 將所有缺少 proxy 的影片加入佇列並等待處理完成
    pub fn regenerate_missing(&self, library: &Arc<Library>) -> Result<()> {
        println!("{}", style(t!("proxy.title")).cyan().bold());

        let videos = library.store().videos_missing_proxy()?;
        if videos.is_empty() {
            println!("{}", style(t!("proxy.nothing_missing")).yellow());
            return Ok(());
        }

        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("proxy.confirm", count = videos.len()))
            .default(true)
            .interact()?;
        if !confirmed {
            return Ok(());
        }

        let queue = self.queue_for(library);
        let mut job_ids = HashSet::new();
        for video in &videos {
            job_ids.insert(queue.push(&video.id)?.id);
        }
        info!("已加入 {} 個 proxy 工作", job_ids.len());

        let Some(handle) = queue.ensure_worker()? else {
            println!("{}", style(t!("proxy.already_running")).yellow());
            return Ok(());
        };

        let progress_bar = ProgressBar::new(job_ids.len() as u64);
        progress_bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )?
            .progress_chars("#>-"),
        );

        while !handle.is_finished() {
            self.update_bar(library, &job_ids, &progress_bar)?;
            thread::sleep(POLL_INTERVAL);
        }
        if handle.join().is_err() {
            progress_bar.abandon_with_message(t!("proxy.worker_panicked").to_string());
            return Ok(());
        }
        self.update_bar(library, &job_ids, &progress_bar)?;
        progress_bar.finish_with_message(t!("proxy.done").to_string());

        self.print_summary(library, &job_ids)
    }

    fn update_bar(
        &self,
        library: &Library,
        job_ids: &HashSet<String>,
        progress_bar: &ProgressBar,
    ) -> Result<()> {
        let jobs: Vec<ProxyJob> = library
            .store()
            .list_jobs()?
            .into_iter()
            .filter(|j| job_ids.contains(&j.id))
            .collect();
        let finished = jobs.iter().filter(|j| j.status.is_terminal()).count();
        progress_bar.set_position(finished as u64);

        if let Some(current) = jobs.iter().find(|j| j.status == JobStatus::Processing) {
            let name = library
                .store()
                .get_video(&current.video_id)?
                .map(|v| v.name)
                .unwrap_or_default();
            progress_bar.set_message(format!("{name} {}%", current.progress));
        }
        Ok(())
    }

    fn print_summary(&self, library: &Library, job_ids: &HashSet<String>) -> Result<()> {
        let jobs = library.store().list_jobs()?;
        let ours = jobs.iter().filter(|j| job_ids.contains(&j.id));
        let (mut complete, mut failed) = (0, 0);
        for job in ours {
            match job.status {
                JobStatus::Complete => complete += 1,
                JobStatus::Error => failed += 1,
                _ => {}
            }
        }

        println!();
        println!("{}", style(t!("proxy.summary_title")).cyan().bold());
        println!("  {}", style(t!("proxy.summary_complete", count = complete)).green());
        if failed > 0 {
            println!("  {}", style(t!("proxy.summary_failed", count = failed)).red());
        }
        info!("proxy 佇列完成 - 成功: {complete}, 失敗: {failed}");
        Ok(())
    }

    /// 顯示佇列中所有工作
    pub fn show_status(&self, library: &Library) -> Result<()> {
        println!("{}", style(t!("queue.title")).cyan().bold());
        let jobs = library.store().list_jobs()?;
        if jobs.is_empty() {
            println!("{}", style(t!("queue.empty")).yellow());
            return Ok(());
        }

        for job in &jobs {
            let name = library
                .store()
                .get_video(&job.video_id)?
                .map(|v| v.name)
                .unwrap_or_default();
            let status = match job.status {
                JobStatus::Queued => style(job.status.as_str()).dim(),
                JobStatus::Processing => style(job.status.as_str()).cyan(),
                JobStatus::Complete => style(job.status.as_str()).green(),
                JobStatus::Error => style(job.status.as_str()).red(),
            };
            println!("  [{status:>10}] {:>3}% {name}", job.progress);
            if let Some(error) = &job.error {
                println!("      {}", style(error).red().dim());
            }
        }
        if library.is_queue_running() {
            println!("\n{}", style(t!("queue.running")).dim());
        }
        Ok(())
    }

    /// 將失敗或卡住的工作重新放回佇列
    pub fn requeue(&self, library: &Arc<Library>) -> Result<()> {
        let store = library.store();
        let mut candidates = store.jobs_with_status(JobStatus::Error)?;
        if !library.is_queue_running() {
            candidates.extend(store.jobs_with_status(JobStatus::Processing)?);
        }
        if candidates.is_empty() {
            println!("{}", style(t!("queue.nothing_to_requeue")).yellow());
            return Ok(());
        }

        let items: Vec<String> = candidates
            .iter()
            .map(|job| {
                let name = store
                    .get_video(&job.video_id)
                    .ok()
                    .flatten()
                    .map(|v| v.name)
                    .unwrap_or_default();
                format!("[{}] {name}", job.status)
            })
            .collect();

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("queue.requeue_prompt"))
            .items(&items)
            .default(0)
            .interact_opt()?;
        let Some(index) = selection else {
            return Ok(());
        };

        let job = &candidates[index];
        if store.requeue_job(&job.id)? {
            info!("工作已重新排入佇列: {}", job.id);
            self.queue_for(library).ensure_worker()?;
            println!("{}", style(t!("queue.requeued")).green());
        }
        Ok(())
    }
}
