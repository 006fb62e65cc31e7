pub mod component;
pub mod config;
pub mod init;
pub mod library;
pub mod menu;
pub mod signal;
pub mod store;
pub mod tools;

use anyhow::Result;
use console::{Term, style};
use rust_i18n::t;

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en-US");

pub use library::Library;

pub fn pause(term: &Term) -> Result<()> {
    println!("\n{}", style(t!("common.press_enter")).dim());
    term.read_line()?;
    Ok(())
}
