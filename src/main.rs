use anyhow::Result;
use console::{Term, style};
use log::{info, warn};
use rust_i18n::t;
use video_catalog_indexer::config::types::Config;
use video_catalog_indexer::init;
use video_catalog_indexer::menu::{LibrarySession, show_main_menu};
use video_catalog_indexer::signal::setup_shutdown_signal;

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en-US");

fn main() -> Result<()> {
    init::init();
    let term = Term::stdout();

    let mut config = Config::new()?;
    rust_i18n::set_locale(config.settings.language.as_str());
    let shutdown_signal = setup_shutdown_signal();
    let mut session = LibrarySession::default();

    loop {
        match show_main_menu(&term, &shutdown_signal, &mut config, &mut session) {
            Ok(true) => {}
            Ok(false) => {
                term.clear_screen()?;
                println!("\n{}", style(t!("main_menu.goodbye")).green().bold());
                info!("程式正常結束");
                break;
            }
            Err(e) => {
                warn!("程式錯誤: {e}");
                eprintln!("{} {}", style(t!("common.error_prefix")).red().bold(), e);
                break;
            }
        }
    }

    Ok(())
}
