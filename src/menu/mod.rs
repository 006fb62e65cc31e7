mod handlers;
mod main_menu;

pub use handlers::LibrarySession;
pub use main_menu::show_main_menu;
