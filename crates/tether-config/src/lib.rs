mod raw;
mod loader;
pub mod error;

pub use loader::{load_file, parse_str, DirectorySettings, TetherConfig};
pub use error::ConfigError;
