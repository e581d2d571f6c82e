use crate::error::{DjmakeError, Result};
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;

/// Environment variable Windows sets on every process.
pub const PLATFORM_SIGNAL: &str = "OS";
const WINDOWS_SIGNAL: &str = "Windows_NT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Windows,
    Posix,
}

impl PlatformFamily {
    /// Map the raw signal value onto a family.
    ///
    /// An absent signal is the normal POSIX case. A present but unrecognised
    /// value falls back to POSIX unless `strict` is set.
    pub fn from_signal(signal: Option<&str>, strict: bool) -> Result<Self> {
        match signal {
            Some(WINDOWS_SIGNAL) => Ok(PlatformFamily::Windows),
            None => Ok(PlatformFamily::Posix),
            Some(other) if strict => Err(DjmakeError::UnsupportedPlatform(other.to_string())),
            Some(other) => {
                warn!("unrecognised {}={:?}, assuming a POSIX host", PLATFORM_SIGNAL, other);
                Ok(PlatformFamily::Posix)
            }
        }
    }

    /// Reads the signal from the current process environment.
    pub fn detect(strict: bool) -> Result<Self> {
        let signal = std::env::var(PLATFORM_SIGNAL).ok();
        Self::from_signal(signal.as_deref(), strict)
    }

    pub fn separator(&self) -> char {
        match self {
            PlatformFamily::Windows => '\\',
            PlatformFamily::Posix => '/',
        }
    }

    /// Name of the environment's script directory.
    pub fn scripts_dir(&self) -> &'static str {
        match self {
            PlatformFamily::Windows => "Scripts",
            PlatformFamily::Posix => "bin",
        }
    }

    fn executable(&self, name: &str) -> String {
        match self {
            PlatformFamily::Windows => format!("{}.exe", name),
            PlatformFamily::Posix => name.to_string(),
        }
    }
}

/// Base settings a variable set is derived from. Every field can be
/// overridden from the `[variables]` table of the config file.
#[derive(Debug, Clone)]
struct BaseSettings {
    venv_dir: String,
    system_python: String,
    requirements: String,
    framework_package: String,
    manage: String,
}

impl BaseSettings {
    fn for_family(family: PlatformFamily) -> Self {
        Self {
            venv_dir: "venv".to_string(),
            system_python: match family {
                PlatformFamily::Windows => "python".to_string(),
                PlatformFamily::Posix => "python3".to_string(),
            },
            requirements: "requirements.txt".to_string(),
            framework_package: "django".to_string(),
            manage: "manage.py".to_string(),
        }
    }

    fn take_overrides(&mut self, overrides: &mut BTreeMap<String, String>) {
        let slots: [(&str, &mut String); 5] = [
            ("venv_dir", &mut self.venv_dir),
            ("system_python", &mut self.system_python),
            ("requirements", &mut self.requirements),
            ("framework_package", &mut self.framework_package),
            ("manage", &mut self.manage),
        ];
        for (key, slot) in slots {
            if let Some(value) = overrides.remove(key) {
                *slot = value;
            }
        }
    }
}

/// The resolved platform-dependent tokens for one invocation.
///
/// Values are template fragments: paths are single words, the composed
/// pipelines (`freeze`, `backup`, `restore`, `rm_files`, `rm_dirs`) are
/// multi-word and splice into step templates.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformVariableSet {
    pub family: PlatformFamily,
    #[serde(flatten)]
    values: BTreeMap<&'static str, String>,
}

/// Declaration order used for `--print-vars`.
pub const VARIABLE_NAMES: &[&str] = &[
    "venv_dir",
    "scripts_dir",
    "system_python",
    "python",
    "pip",
    "django_admin",
    "activate",
    "manage",
    "requirements",
    "framework_package",
    "rm_files",
    "rm_dirs",
    "freeze",
    "backup",
    "restore",
];

impl PlatformVariableSet {
    pub fn resolve(family: PlatformFamily) -> Self {
        Self::resolve_with(family, &BTreeMap::new())
    }

    /// Builds the set for `family`, applying config overrides.
    pub fn resolve_with(family: PlatformFamily, overrides: &BTreeMap<String, String>) -> Self {
        let mut remaining = overrides.clone();
        let mut base = BaseSettings::for_family(family);
        base.take_overrides(&mut remaining);

        let sep = family.separator();
        let scripts = format!("{}{}{}", base.venv_dir, sep, family.scripts_dir());
        let tool = |name: &str| format!("{}{}{}", scripts, sep, family.executable(name));

        let python = tool("python");
        let pip = tool("pip");
        let django_admin = tool("django-admin");
        let activate = match family {
            PlatformFamily::Windows => format!("{}{}activate", scripts, sep),
            PlatformFamily::Posix => format!(". {}{}activate", scripts, sep),
        };
        let (rm_files, rm_dirs) = match family {
            PlatformFamily::Windows => (
                "cmd /C del /s /q *.pyc *.pyo".to_string(),
                "cmd /C for /d /r . %d in (__pycache__) do @if exist %d rd /s /q %d".to_string(),
            ),
            PlatformFamily::Posix => (
                "find . -type f ( -name '*.pyc' -o -name '*.pyo' ) -delete".to_string(),
                "find . -depth -type d -name __pycache__ -exec rm -rf {} +".to_string(),
            ),
        };
        let quoted_requirements = quote_word(&base.requirements);
        let freeze = format!("{} freeze > {}", quote_word(&pip), quoted_requirements);
        let backup = format!("{} {} dbbackup", quote_word(&python), quote_word(&base.manage));
        let restore = format!(
            "{} {} dbrestore --noinput --input-path",
            quote_word(&python),
            quote_word(&base.manage)
        );

        let mut values: BTreeMap<&'static str, String> = BTreeMap::new();
        values.insert("venv_dir", base.venv_dir);
        values.insert("scripts_dir", scripts);
        values.insert("system_python", base.system_python);
        values.insert("python", python);
        values.insert("pip", pip);
        values.insert("django_admin", django_admin);
        values.insert("activate", activate);
        values.insert("manage", base.manage);
        values.insert("requirements", base.requirements);
        values.insert("framework_package", base.framework_package);
        values.insert("rm_files", rm_files);
        values.insert("rm_dirs", rm_dirs);
        values.insert("freeze", freeze);
        values.insert("backup", backup);
        values.insert("restore", restore);

        // Direct overrides of derived values win over derivation.
        for (key, value) in remaining {
            match VARIABLE_NAMES.iter().find(|name| **name == key) {
                Some(name) => {
                    values.insert(*name, value);
                }
                None => warn!("ignoring override for unknown variable {}", key),
            }
        }

        debug!("resolved {:?} variable set", family);
        Self { family, values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Variables in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        VARIABLE_NAMES
            .iter()
            .filter_map(move |name| self.values.get(name).map(|v| (*name, v.as_str())))
    }

    /// Every name in `VARIABLE_NAMES` is present once resolved.
    fn value(&self, name: &str) -> &str {
        &self.values[name]
    }

    pub fn venv_dir(&self) -> &str {
        self.value("venv_dir")
    }

    pub fn scripts_dir(&self) -> &str {
        self.value("scripts_dir")
    }

    pub fn python(&self) -> &str {
        self.value("python")
    }

    pub fn activate(&self) -> &str {
        self.value("activate")
    }
}

/// Quotes a value so the template lexer reads it back as one word.
fn quote_word(value: &str) -> String {
    if value.chars().any(char::is_whitespace) {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}
