pub mod config;
pub mod error;
pub mod file_config;
pub mod types;

pub use config::Config;
pub use error::{WorkflowError, WorkflowResult};
pub use types::*;
