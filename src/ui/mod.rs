pub mod help;
pub mod prompt;

pub use help::{render_help, render_variables};
pub use prompt::TerminalInput;
