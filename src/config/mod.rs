pub mod load;
pub mod save;
pub mod types;

pub use types::{
    AssetSettings, Config, DEFAULT_WORKER_COUNT, FileTypeTable, Language, MAX_RECENT_PATHS,
    ProxySettings, UserSettings,
};
