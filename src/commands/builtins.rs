use crate::error::{DjmakeError, Result};
use std::io::Write;
use std::path::PathBuf;

/// In-process steps, resolved to concrete values.
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinStep {
    /// Write text to the invocation's output.
    Print(String),
    /// Abort unless the file exists.
    RequireFile(PathBuf),
}

pub fn run(step: &BuiltinStep, out: &mut dyn Write) -> Result<()> {
    match step {
        BuiltinStep::Print(text) => {
            write!(out, "{}", text)?;
            out.flush()?;
            Ok(())
        }
        BuiltinStep::RequireFile(path) => {
            if path.is_file() {
                Ok(())
            } else {
                Err(DjmakeError::MissingPrerequisite(path.clone()))
            }
        }
    }
}
