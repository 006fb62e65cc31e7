use crate::component::{CatalogMaintenance, LibraryScanner, ProxyManager};
use crate::config::Config;
use crate::config::save::{add_recent_path, save_settings};
use crate::library::Library;
use crate::pause;
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use log::warn;
use rust_i18n::t;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// 目前開啟中的影片庫
#[derive(Default)]
pub struct LibrarySession {
    library: Option<Arc<Library>>,
}

impl LibrarySession {
    #[must_use]
    pub fn current(&self) -> Option<&Arc<Library>> {
        self.library.as_ref()
    }
}

fn print_error(e: &anyhow::Error) {
    eprintln!("{} {e:#}", style(t!("common.error_prefix")).red().bold());
}

/// 從最近使用的路徑選擇或輸入新路徑
fn prompt_library_path(term: &Term, config: &Config) -> Result<Option<PathBuf>> {
    let recent = &config.settings.recent_paths;
    if !recent.is_empty() {
        let mut items: Vec<String> = recent.clone();
        items.push(t!("library.enter_new").to_string());

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("library.choose_recent"))
            .items(&items)
            .default(0)
            .interact_on_opt(term)?;
        match selection {
            None => return Ok(None),
            Some(index) if index < recent.len() => return Ok(Some(PathBuf::from(&recent[index]))),
            Some(_) => {}
        }
    }

    let input: String = Input::new()
        .with_prompt(t!("library.prompt_path"))
        .interact_text()?;
    let input = input.trim();
    Ok((!input.is_empty()).then(|| PathBuf::from(input)))
}

/// 開啟影片庫並記錄到最近使用清單
pub fn run_open_library(term: &Term, config: &mut Config, session: &mut LibrarySession) -> Result<()> {
    let Some(path) = prompt_library_path(term, config)? else {
        return Ok(());
    };

    match Library::open(&path) {
        Ok(library) => {
            add_recent_path(&mut config.settings, &library.root().to_string_lossy());
            if let Err(e) = save_settings(&config.settings) {
                warn!("無法儲存設定: {e:#}");
            }
            println!(
                "{}",
                style(t!("library.opened", path = library.root().display())).green()
            );
            session.library = Some(Arc::new(library));
        }
        Err(e) => print_error(&e),
    }

    pause(term)?;
    Ok(())
}

/// 取得目前的影片庫，尚未開啟時先詢問
fn require_library(
    term: &Term,
    config: &mut Config,
    session: &mut LibrarySession,
) -> Result<Option<Arc<Library>>> {
    if session.library.is_none() {
        run_open_library(term, config, session)?;
    }
    Ok(session.library.clone())
}

pub fn run_library_scanner(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
    session: &mut LibrarySession,
) -> Result<()> {
    let Some(library) = require_library(term, config, session)? else {
        return Ok(());
    };
    let scanner = LibraryScanner::new(config.clone(), Arc::clone(shutdown_signal));

    if let Err(e) = scanner.run(&library) {
        print_error(&e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_catalog_overview(
    term: &Term,
    config: &mut Config,
    session: &mut LibrarySession,
) -> Result<()> {
    let Some(library) = require_library(term, config, session)? else {
        return Ok(());
    };

    if let Err(e) = CatalogMaintenance::new().show_overview(&library) {
        print_error(&e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_edit_selection(
    term: &Term,
    config: &mut Config,
    session: &mut LibrarySession,
) -> Result<()> {
    let Some(library) = require_library(term, config, session)? else {
        return Ok(());
    };

    if let Err(e) = CatalogMaintenance::new().edit_selection(&library) {
        print_error(&e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_proxy_regeneration(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
    session: &mut LibrarySession,
) -> Result<()> {
    let Some(library) = require_library(term, config, session)? else {
        return Ok(());
    };
    let manager = ProxyManager::new(config.clone(), Arc::clone(shutdown_signal));

    if let Err(e) = manager.regenerate_missing(&library) {
        print_error(&e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_queue_status(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
    session: &mut LibrarySession,
) -> Result<()> {
    let Some(library) = require_library(term, config, session)? else {
        return Ok(());
    };
    let manager = ProxyManager::new(config.clone(), Arc::clone(shutdown_signal));

    if let Err(e) = manager.show_status(&library) {
        print_error(&e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_requeue_job(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
    session: &mut LibrarySession,
) -> Result<()> {
    let Some(library) = require_library(term, config, session)? else {
        return Ok(());
    };
    let manager = ProxyManager::new(config.clone(), Arc::clone(shutdown_signal));

    if let Err(e) = manager.requeue(&library) {
        print_error(&e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_purge_directory(
    term: &Term,
    config: &mut Config,
    session: &mut LibrarySession,
) -> Result<()> {
    let Some(library) = require_library(term, config, session)? else {
        return Ok(());
    };

    if let Err(e) = CatalogMaintenance::new().purge_directory(&library) {
        print_error(&e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_clear_cache(term: &Term, config: &mut Config, session: &mut LibrarySession) -> Result<()> {
    let Some(library) = require_library(term, config, session)? else {
        return Ok(());
    };
    session.library = None;

    match CatalogMaintenance::new().clear_cache(library) {
        Ok(kept) => session.library = kept,
        Err(e) => print_error(&e),
    }

    pause(term)?;
    Ok(())
}
