pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod oauth2;
pub mod settings;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use settings::{MemorySettings, Settings};
