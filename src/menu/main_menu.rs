use super::handlers::{
    LibrarySession, run_catalog_overview, run_clear_cache, run_edit_selection, run_library_scanner,
    run_open_library, run_proxy_regeneration, run_purge_directory, run_queue_status,
    run_requeue_job,
};
use crate::config::save::save_settings;
use crate::config::types::{Config, Language};
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
    session: &mut LibrarySession,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style(t!("main_menu.title")).cyan().bold());
    match session.current() {
        Some(library) => println!(
            "{}",
            style(t!("main_menu.current_library", path = library.root().display())).dim()
        ),
        None => println!("{}", style(t!("main_menu.no_library")).dim()),
    }
    println!("{}", style(t!("common.esc_hint")).dim());

    let options = vec![
        t!("main_menu.opt_open"),
        t!("main_menu.opt_scan"),
        t!("main_menu.opt_overview"),
        t!("main_menu.opt_selection"),
        t!("main_menu.opt_proxy"),
        t!("main_menu.opt_queue_status"),
        t!("main_menu.opt_requeue"),
        t!("main_menu.opt_purge"),
        t!("main_menu.opt_clear_cache"),
        t!("main_menu.opt_settings"),
        t!("main_menu.exit"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("main_menu.prompt"))
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => run_open_library(term, config, session)?,
        Some(1) => run_library_scanner(term, shutdown_signal, config, session)?,
        Some(2) => run_catalog_overview(term, config, session)?,
        Some(3) => run_edit_selection(term, config, session)?,
        Some(4) => run_proxy_regeneration(term, shutdown_signal, config, session)?,
        Some(5) => run_queue_status(term, shutdown_signal, config, session)?,
        Some(6) => run_requeue_job(term, shutdown_signal, config, session)?,
        Some(7) => run_purge_directory(term, config, session)?,
        Some(8) => run_clear_cache(term, config, session)?,
        Some(9) => show_settings_menu(term, config)?,
        Some(10) | None => return Ok(false), // ESC 也視為離開
        _ => unreachable!(),
    }
    Ok(true)
}

/// 設定選單
fn show_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let options = vec![
            t!("settings.opt_language"),
            t!("settings.opt_workers"),
            t!("settings.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        match selection {
            Some(0) => show_language_menu(term, config)?,
            Some(1) => show_worker_count_menu(term, config)?,
            Some(2) | None => break,
            _ => unreachable!(),
        }
    }

    Ok(())
}

/// 語言設定選單
fn show_language_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.language.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let languages = [Language::EnUs, Language::ZhTw];
    let items: Vec<String> = languages.iter().map(ToString::to_string).collect();

    let default_index = languages
        .iter()
        .position(|&l| l == config.settings.language)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.language.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    let Some(selection) = selection else {
        return Ok(());
    };

    let selected_lang = languages[selection];
    if selected_lang != config.settings.language {
        config.settings.language = selected_lang;
        rust_i18n::set_locale(selected_lang.as_str());
        save_settings(&config.settings)?;
        println!("\n{} {}", style(t!("settings.saved")).green(), selected_lang);
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}

/// 掃描並行數量設定
fn show_worker_count_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.workers.title")).cyan().bold());

    let count: usize = Input::new()
        .with_prompt(t!("settings.workers.prompt"))
        .default(config.settings.worker_count)
        .validate_with(|value: &usize| -> Result<(), String> {
            if (1..=64).contains(value) {
                Ok(())
            } else {
                Err(t!("settings.workers.invalid").to_string())
            }
        })
        .interact_text()?;

    if count != config.settings.worker_count {
        config.settings.worker_count = count;
        save_settings(&config.settings)?;
        println!("\n{} {}", style(t!("settings.saved")).green(), count);
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}
