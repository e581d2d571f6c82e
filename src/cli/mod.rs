use crate::commands::Dispatcher;
use crate::config::Config;
use crate::error::DjmakeError;
use crate::executor::{DryRunRunner, ProcessRunner, SystemRunner};
use crate::input::{ArgumentInput, InputSource};
use crate::platform::{PlatformFamily, PlatformVariableSet};
use crate::registry::CommandRegistry;
use crate::ui::{self, TerminalInput};
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use log::{debug, LevelFilter};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(name = "djmake")]
#[command(version, about = "Short aliases for Django project chores", long_about = None)]
pub struct Args {
    /// Command to run; `djmake help` lists them
    #[arg(value_name = "COMMAND")]
    pub command: Option<String>,

    /// Answer to the command's prompt, then extra arguments for its last step
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, value_name = "DIR")]
    pub chdir: Option<PathBuf>,

    /// Configuration file (default: ./djmake.toml when present)
    #[arg(short, long, value_name = "FILE", env = "DJMAKE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Never prompt; missing answers are errors
    #[arg(long)]
    pub no_input: bool,

    /// Print each step instead of running it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the resolved platform variables and exit
    #[arg(long)]
    pub print_vars: bool,

    /// With --print-vars, emit JSON
    #[arg(long, requires = "print_vars")]
    pub json: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Error
        } else {
            LevelFilter::Warn
        }
    }
}

/// `RUST_LOG`, when set, wins over the verbosity flags.
pub fn init_logging(args: &Args) {
    let level = args.log_level().to_string().to_lowercase();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Runs one invocation and returns the process exit status.
pub fn run(args: Args) -> Result<i32> {
    let workdir = resolve_workdir(args.chdir.as_deref())?;

    let config = Config::load(args.config.as_deref(), &workdir)?;
    let family = PlatformFamily::detect(config.strict_platform)?;
    let vars = PlatformVariableSet::resolve_with(family, &config.variables);

    if args.print_vars {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&vars)?);
        } else {
            print!("{}", ui::render_variables(&vars));
        }
        return Ok(0);
    }

    let registry = CommandRegistry::builtin();
    let name = args.command.as_deref().unwrap_or("help");
    let dispatcher = Dispatcher::new(registry, &vars, &workdir);

    let mut input: Box<dyn InputSource> = if args.no_input || !io::stdin().is_terminal() {
        Box::new(ArgumentInput::empty())
    } else {
        Box::new(TerminalInput::new())
    };
    let mut runner: Box<dyn ProcessRunner> = if args.dry_run {
        Box::new(DryRunRunner::new(io::stdout()))
    } else {
        Box::new(SystemRunner)
    };

    let result = dispatcher.dispatch(
        name,
        &args.args,
        input.as_mut(),
        runner.as_mut(),
        &mut io::stdout(),
    );

    Ok(match result {
        Ok(()) => 0,
        Err(err) => report(&err, registry),
    })
}

/// The directory steps run in; always absolute.
fn resolve_workdir(chdir: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    Ok(match chdir {
        Some(dir) => cwd.join(dir),
        None => cwd,
    })
}

/// Prints `err` for the user and returns the exit status it maps to.
fn report(err: &DjmakeError, registry: &CommandRegistry) -> i32 {
    match err {
        // The child already said what went wrong.
        DjmakeError::StepFailed { step, code } => {
            debug!("step {} failed with status {}", step, code);
        }
        DjmakeError::UnknownCommand(_) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            eprintln!();
            eprint!("{}", ui::render_help(registry));
        }
        _ => eprintln!("{} {}", "error:".red().bold(), err),
    }
    err.exit_code()
}
