//! Command dispatch: lookup, prerequisite, expansion, execution.

pub mod builtins;

pub use builtins::BuiltinStep;

use crate::error::Result;
use crate::executor::{Invocation, InvocationState, ProcessRunner, ProcessStep, Step};
use crate::input::{self, ArgumentInput, ChainedInput, InputSource};
use crate::platform::PlatformVariableSet;
use crate::registry::{Builtin, CommandRegistry, CommandSpec, StepTemplate, VENV_COMMAND};
use crate::template::{self, Scope};
use crate::ui;
use log::debug;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub struct Dispatcher<'a> {
    registry: &'a CommandRegistry,
    vars: &'a PlatformVariableSet,
    workdir: PathBuf,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a CommandRegistry, vars: &'a PlatformVariableSet, workdir: &Path) -> Self {
        Self {
            registry,
            vars,
            workdir: workdir.to_path_buf(),
        }
    }

    /// Looks up, expands and runs `name`.
    ///
    /// `args` answer the command's prompt first; the rest are appended to
    /// its final process step.
    pub fn dispatch(
        &self,
        name: &str,
        args: &[String],
        input: &mut dyn InputSource,
        runner: &mut dyn ProcessRunner,
        out: &mut dyn Write,
    ) -> Result<()> {
        let mut invocation = Invocation::new(name);
        invocation.transition(InvocationState::Expanding);

        let steps = match self.plan(name, args, input) {
            Ok(steps) => steps,
            Err(err) => return Err(invocation.fail(err)),
        };
        invocation.execute(&steps, runner, out)
    }

    /// Expands `name` into its concrete step list without running anything.
    pub fn plan(&self, name: &str, args: &[String], input: &mut dyn InputSource) -> Result<Vec<Step>> {
        let command = self.registry.lookup(name)?;

        let (answer, extra) = match (&command.prompt, args.split_first()) {
            (Some(_), Some((first, rest))) => (Some(first.clone()), rest.to_vec()),
            _ => (None, args.to_vec()),
        };

        let mut inputs = BTreeMap::new();
        if let Some(prompt) = &command.prompt {
            let mut positional = ArgumentInput::new(answer);
            let mut sources = ChainedInput::new(vec![&mut positional as &mut dyn InputSource, &mut *input]);
            inputs.insert(prompt.key.to_string(), input::require(&mut sources, prompt)?);
        }

        let env = if command.requires_venv {
            self.activation_env()?
        } else {
            Vec::new()
        };
        let mut own = self.expand_steps(command, &inputs, env)?;
        if !extra.is_empty() {
            match own.iter_mut().rev().find_map(|step| match step {
                Step::Process(process) => Some(process),
                Step::Builtin(_) => None,
            }) {
                Some(last) => last.line.args.extend(extra),
                None => debug!("{} takes no arguments, ignoring {:?}", name, extra),
            }
        }

        // Required files are checked before anything runs, prerequisite included.
        for step in &own {
            if let Step::Builtin(check @ BuiltinStep::RequireFile(_)) = step {
                builtins::run(check, &mut io::sink())?;
            }
        }

        let mut steps = Vec::new();
        if command.requires_venv && !self.venv_ready() {
            debug!("{} missing, creating it before {}", self.vars.venv_dir(), name);
            let venv = self.registry.lookup(VENV_COMMAND)?;
            steps.extend(self.expand_steps(venv, &BTreeMap::new(), Vec::new())?);
        }
        steps.extend(own);
        Ok(steps)
    }

    fn expand_steps(
        &self,
        command: &CommandSpec,
        inputs: &BTreeMap<String, String>,
        env: Vec<(String, OsString)>,
    ) -> Result<Vec<Step>> {
        let scope = Scope::new(self.vars, inputs);
        command
            .steps
            .iter()
            .map(|template| self.expand_step(template, &scope, &env))
            .collect()
    }

    fn expand_step(
        &self,
        template: &StepTemplate,
        scope: &Scope<'_>,
        env: &[(String, OsString)],
    ) -> Result<Step> {
        let step = match template {
            StepTemplate::Process(text) => Step::Process(ProcessStep {
                line: template::expand(text, scope)?,
                cwd: self.workdir.clone(),
                env: env.to_vec(),
            }),
            StepTemplate::Builtin(Builtin::Help) => {
                Step::Builtin(BuiltinStep::Print(ui::render_help(self.registry)))
            }
            StepTemplate::Builtin(Builtin::ActivationHint) => Step::Builtin(BuiltinStep::Print(
                format!("Activate the environment with: {}\n", self.vars.activate()),
            )),
            StepTemplate::Builtin(Builtin::RequireFile(path)) => {
                let path = template::expand_word(path, scope)?;
                Step::Builtin(BuiltinStep::RequireFile(self.workdir.join(path)))
            }
        };
        Ok(step)
    }

    /// The environment counts as present once its interpreter exists.
    pub fn venv_ready(&self) -> bool {
        self.workdir.join(self.vars.python()).is_file()
    }

    /// `VIRTUAL_ENV` and `PATH` as the activation script would set them.
    fn activation_env(&self) -> Result<Vec<(String, OsString)>> {
        let venv = self.workdir.join(self.vars.venv_dir());
        let scripts = self.workdir.join(self.vars.scripts_dir());

        let mut paths = vec![scripts];
        if let Some(existing) = std::env::var_os("PATH") {
            paths.extend(std::env::split_paths(&existing));
        }
        let path = std::env::join_paths(paths)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        Ok(vec![
            ("VIRTUAL_ENV".to_string(), venv.into_os_string()),
            ("PATH".to_string(), path),
        ])
    }
}
