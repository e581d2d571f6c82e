//! The fixed table of developer-facing commands.

use crate::error::{DjmakeError, Result};
use once_cell::sync::Lazy;

/// In-process steps that need no child process.
#[derive(Debug, Clone, PartialEq)]
pub enum Builtin {
    /// Print the command list.
    Help,
    /// Fail with a missing-prerequisite error unless the file exists.
    RequireFile(&'static str),
    /// Tell the user how to activate the environment by hand.
    ActivationHint,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepTemplate {
    Process(&'static str),
    Builtin(Builtin),
}

/// Input a command needs before its templates can be expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prompt {
    /// Name the value is bound to in templates.
    pub key: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: &'static str,
    pub help: &'static str,
    /// Run the environment prerequisite first and activate it for every step.
    pub requires_venv: bool,
    pub prompt: Option<Prompt>,
    pub steps: Vec<StepTemplate>,
}

impl CommandSpec {
    pub fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            requires_venv: false,
            prompt: None,
            steps: Vec::new(),
        }
    }

    pub fn in_venv(mut self) -> Self {
        self.requires_venv = true;
        self
    }

    pub fn prompt(mut self, key: &'static str, label: &'static str) -> Self {
        self.prompt = Some(Prompt { key, label });
        self
    }

    pub fn run(mut self, template: &'static str) -> Self {
        self.steps.push(StepTemplate::Process(template));
        self
    }

    pub fn builtin(mut self, builtin: Builtin) -> Self {
        self.steps.push(StepTemplate::Builtin(builtin));
        self
    }
}

pub const VENV_COMMAND: &str = "venv";

static BUILTIN_REGISTRY: Lazy<CommandRegistry> = Lazy::new(|| CommandRegistry {
    commands: vec![
        CommandSpec::new("help", "Show this help message").builtin(Builtin::Help),
        CommandSpec::new(VENV_COMMAND, "Create virtual environment and upgrade pip")
            .run("{system_python} -m venv {venv_dir}")
            .run("{python} -m pip install --upgrade pip")
            .builtin(Builtin::ActivationHint),
        CommandSpec::new("install", "Install dependencies from the requirements file")
            .in_venv()
            .builtin(Builtin::RequireFile("{requirements}"))
            .run("{pip} install -r {requirements}"),
        CommandSpec::new("create_project", "Create a new Django project in this directory")
            .in_venv()
            .prompt("project_name", "Project name")
            .run("{pip} install {framework_package}")
            .run("{django_admin} startproject {project_name} .")
            .run("{freeze}"),
        CommandSpec::new("run", "Run the development server")
            .in_venv()
            .run("{python} {manage} runserver"),
        CommandSpec::new("migrate", "Apply database migrations")
            .in_venv()
            .run("{python} {manage} migrate"),
        CommandSpec::new("shell", "Open the Django shell")
            .in_venv()
            .run("{python} {manage} shell"),
        CommandSpec::new("createsuperuser", "Create a superuser account")
            .in_venv()
            .run("{python} {manage} createsuperuser"),
        CommandSpec::new("test", "Run the test suite")
            .in_venv()
            .run("{python} {manage} test"),
        CommandSpec::new("makemigrations", "Create new migration files")
            .in_venv()
            .run("{python} {manage} makemigrations"),
        CommandSpec::new("collectstatic", "Collect static files without confirmation")
            .in_venv()
            .run("{python} {manage} collectstatic --noinput"),
        CommandSpec::new("check", "Run Django system checks")
            .in_venv()
            .run("{python} {manage} check"),
        CommandSpec::new("lint", "Check code style with flake8")
            .in_venv()
            .run("{python} -m flake8 ."),
        CommandSpec::new("coverage", "Run tests under coverage and print the report")
            .in_venv()
            .run("{python} -m coverage run {manage} test")
            .run("{python} -m coverage report"),
        CommandSpec::new("clean", "Remove compiled Python files and cache directories")
            .run("{rm_files}")
            .run("{rm_dirs}"),
        CommandSpec::new("freeze", "Write installed package versions to the requirements file")
            .in_venv()
            .run("{freeze}"),
        CommandSpec::new("startapp", "Create a new Django app")
            .in_venv()
            .prompt("app_name", "App name")
            .run("{python} {manage} startapp {app_name}"),
        CommandSpec::new("dbbackup", "Back up the database")
            .in_venv()
            .run("{backup}"),
        CommandSpec::new("dbrestore", "Restore the database from a backup file")
            .in_venv()
            .prompt("backup_file", "Backup file")
            .run("{restore} {backup_file}"),
    ],
});

/// Commands in declaration order.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    commands: Vec<CommandSpec>,
}

impl CommandRegistry {
    /// The registry shipped with the binary.
    pub fn builtin() -> &'static CommandRegistry {
        &BUILTIN_REGISTRY
    }

    /// Builds a registry from an explicit list, rejecting duplicate names.
    pub fn from_commands(commands: Vec<CommandSpec>) -> Result<Self> {
        for (i, command) in commands.iter().enumerate() {
            if commands[..i].iter().any(|c| c.name == command.name) {
                return Err(DjmakeError::DuplicateCommand(command.name.to_string()));
            }
        }
        Ok(Self { commands })
    }

    pub fn lookup(&self, name: &str) -> Result<&CommandSpec> {
        self.commands
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DjmakeError::UnknownCommand(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
