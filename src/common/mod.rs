pub mod config;
pub mod error;
pub mod paths;

pub use config::Config;
pub use error::{FaceIdError, Result};
pub use paths::{default_capture_dir, default_config_file};
