//! Sequential step execution.
//!
//! Steps run strictly one after another with the child's stdio inherited.
//! The first non-zero exit status ends the invocation with that status.

use crate::commands::builtins::{self, BuiltinStep};
use crate::error::{DjmakeError, Result};
use crate::template::CommandLine;
use log::{debug, info};
use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// One child process, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessStep {
    pub line: CommandLine,
    pub cwd: PathBuf,
    pub env: Vec<(String, OsString)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Process(ProcessStep),
    Builtin(BuiltinStep),
}

/// Where child processes actually get started.
pub trait ProcessRunner {
    /// Runs the step to completion and returns its exit status.
    fn run(&mut self, step: &ProcessStep) -> Result<i32>;
}

/// Spawns real processes with inherited stdio.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&mut self, step: &ProcessStep) -> Result<i32> {
        let program = resolve_program(&step.line.program, &step.cwd);

        let mut cmd = Command::new(&program);
        cmd.args(&step.line.args).current_dir(&step.cwd);
        for (key, value) in &step.env {
            cmd.env(key, value);
        }
        if let Some(target) = &step.line.stdout {
            let file = File::create(step.cwd.join(target))?;
            cmd.stdout(Stdio::from(file));
        }

        let status = cmd.status().map_err(|source| DjmakeError::Spawn {
            program: step.line.program.clone(),
            source,
        })?;
        Ok(exit_code(status))
    }
}

/// Prints each process step instead of running it.
pub struct DryRunRunner<W: Write> {
    out: W,
}

impl<W: Write> DryRunRunner<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ProcessRunner for DryRunRunner<W> {
    fn run(&mut self, step: &ProcessStep) -> Result<i32> {
        writeln!(self.out, "$ {}", step.line)?;
        Ok(0)
    }
}

/// Relative paths with a separator are relative to the step's directory,
/// not to wherever djmake itself was started.
fn resolve_program(program: &str, cwd: &Path) -> PathBuf {
    let path = Path::new(program);
    if path.is_relative() && program.contains(['/', '\\']) {
        cwd.join(path)
    } else {
        path.to_path_buf()
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Pending,
    Expanding,
    Running(usize),
    Succeeded,
    Failed(i32),
}

impl InvocationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvocationState::Succeeded | InvocationState::Failed(_))
    }
}

/// Tracks one command invocation through its states.
#[derive(Debug)]
pub struct Invocation {
    command: String,
    state: InvocationState,
}

impl Invocation {
    pub fn new(command: &str) -> Self {
        debug!("{}: {:?}", command, InvocationState::Pending);
        Self {
            command: command.to_string(),
            state: InvocationState::Pending,
        }
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn transition(&mut self, next: InvocationState) {
        debug_assert!(!self.state.is_terminal(), "{:?} is terminal", self.state);
        debug!("{}: {:?} -> {:?}", self.command, self.state, next);
        self.state = next;
    }

    /// Moves to `Failed` carrying the exit status the error maps to.
    pub fn fail(&mut self, err: DjmakeError) -> DjmakeError {
        self.transition(InvocationState::Failed(err.exit_code()));
        err
    }

    /// Runs `steps` in order, stopping at the first failure.
    pub fn execute(
        &mut self,
        steps: &[Step],
        runner: &mut dyn ProcessRunner,
        out: &mut dyn Write,
    ) -> Result<()> {
        for (index, step) in steps.iter().enumerate() {
            let number = index + 1;
            self.transition(InvocationState::Running(number));

            let result = match step {
                Step::Builtin(builtin) => builtins::run(builtin, out),
                Step::Process(process) => {
                    info!("[{}/{}] {}", number, steps.len(), process.line);
                    match runner.run(process) {
                        Ok(0) => Ok(()),
                        Ok(code) => Err(DjmakeError::StepFailed { step: number, code }),
                        Err(err) => Err(err),
                    }
                }
            };

            if let Err(err) = result {
                return Err(self.fail(err));
            }
        }

        self.transition(InvocationState::Succeeded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records argv and answers with scripted exit codes.
    struct Scripted {
        codes: Vec<i32>,
        seen: Vec<String>,
    }

    impl ProcessRunner for Scripted {
        fn run(&mut self, step: &ProcessStep) -> Result<i32> {
            self.seen.push(step.line.to_string());
            Ok(self.codes.get(self.seen.len() - 1).copied().unwrap_or(0))
        }
    }

    fn process(program: &str) -> Step {
        Step::Process(ProcessStep {
            line: CommandLine {
                program: program.to_string(),
                args: Vec::new(),
                stdout: None,
            },
            cwd: PathBuf::from("."),
            env: Vec::new(),
        })
    }

    #[test]
    fn test_all_steps_run_on_success() {
        let mut runner = Scripted { codes: vec![], seen: vec![] };
        let mut invocation = Invocation::new("demo");
        let mut out = Vec::new();
        invocation
            .execute(&[process("a"), process("b")], &mut runner, &mut out)
            .unwrap();
        assert_eq!(runner.seen, vec!["a", "b"]);
        assert_eq!(invocation.state(), InvocationState::Succeeded);
    }

    #[test]
    fn test_failing_step_short_circuits() {
        let mut runner = Scripted { codes: vec![0, 3], seen: vec![] };
        let mut invocation = Invocation::new("demo");
        let mut out = Vec::new();
        let err = invocation
            .execute(&[process("a"), process("b"), process("c")], &mut runner, &mut out)
            .unwrap_err();

        assert!(matches!(err, DjmakeError::StepFailed { step: 2, code: 3 }));
        assert_eq!(runner.seen, vec!["a", "b"]);
        assert_eq!(invocation.state(), InvocationState::Failed(3));
    }

    #[test]
    fn test_builtin_failure_stops_processes() {
        let mut runner = Scripted { codes: vec![], seen: vec![] };
        let mut invocation = Invocation::new("install");
        let mut out = Vec::new();
        let steps = [
            Step::Builtin(BuiltinStep::RequireFile(PathBuf::from("/definitely/not/here.txt"))),
            process("pip"),
        ];
        let err = invocation.execute(&steps, &mut runner, &mut out).unwrap_err();
        assert!(matches!(err, DjmakeError::MissingPrerequisite(_)));
        assert!(runner.seen.is_empty());
        assert_eq!(invocation.state(), InvocationState::Failed(1));
    }

    #[test]
    fn test_dry_run_prints_instead_of_running() {
        let mut buf = Vec::new();
        {
            let mut runner = DryRunRunner::new(&mut buf);
            let mut invocation = Invocation::new("demo");
            let mut out = Vec::new();
            invocation.execute(&[process("venv/bin/python")], &mut runner, &mut out).unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "$ venv/bin/python\n");
    }

    #[test]
    fn test_relative_program_resolves_against_cwd() {
        let cwd = Path::new("/work");
        assert_eq!(resolve_program("venv/bin/pip", cwd), PathBuf::from("/work/venv/bin/pip"));
        assert_eq!(resolve_program("find", cwd), PathBuf::from("find"));
        assert_eq!(resolve_program("/usr/bin/find", cwd), PathBuf::from("/usr/bin/find"));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_passes_exit_status_through() {
        let mut runner = SystemRunner;
        let step = ProcessStep {
            line: CommandLine {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), "exit 7".to_string()],
                stdout: None,
            },
            cwd: PathBuf::from("."),
            env: Vec::new(),
        };
        assert_eq!(runner.run(&step).unwrap(), 7);
    }

    #[test]
    fn test_missing_program_is_a_spawn_error() {
        let mut runner = SystemRunner;
        let step = ProcessStep {
            line: CommandLine {
                program: "djmake-no-such-program".to_string(),
                args: Vec::new(),
                stdout: None,
            },
            cwd: PathBuf::from("."),
            env: Vec::new(),
        };
        assert!(matches!(runner.run(&step), Err(DjmakeError::Spawn { .. })));
    }
}
