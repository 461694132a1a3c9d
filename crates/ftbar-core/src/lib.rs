pub mod config;
pub mod error;
pub mod types;

pub use config::{EvaluatorConfig, FtbarConfig, GeneralConfig};
pub use error::{FtbarError, Result};
pub use types::*;
