use crate::platform::PlatformVariableSet;
use crate::registry::CommandRegistry;
use colored::*;
use std::fmt::Write;

/// Command list in declaration order, padded to the longest name.
pub fn render_help(registry: &CommandRegistry) -> String {
    let width = registry.iter().map(|c| c.name.len()).max().unwrap_or(0);
    let mut out = String::new();

    let _ = writeln!(out, "{}", "Usage: djmake <command> [ARGS]...".bold());
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Commands:".bold());
    for command in registry.iter() {
        let _ = writeln!(
            out,
            "  {}  {}",
            format!("{:<width$}", command.name, width = width).cyan(),
            command.help
        );
    }
    out
}

pub fn render_variables(vars: &PlatformVariableSet) -> String {
    let width = vars.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let mut out = String::new();

    let _ = writeln!(out, "{} {:?}", "platform:".bold(), vars.family);
    for (name, value) in vars.iter() {
        let _ = writeln!(out, "  {}  {}", format!("{:<width$}", name, width = width).cyan(), value);
    }
    out
}
