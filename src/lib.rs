pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod input;
pub mod platform;
pub mod registry;
pub mod template;
pub mod ui;

pub use commands::Dispatcher;
pub use error::{DjmakeError, Result};
pub use platform::{PlatformFamily, PlatformVariableSet};
pub use registry::CommandRegistry;
