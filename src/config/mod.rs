use crate::error::{DjmakeError, Result};
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "djmake.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Refuse to guess POSIX when the OS signal is unrecognised.
    #[serde(default)]
    pub strict_platform: bool,

    /// Overrides for resolved platform variables.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl Config {
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| DjmakeError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Loads `explicit` if given (it must exist), else `djmake.toml` in
    /// `workdir` if present, else defaults.
    pub fn load(explicit: Option<&Path>, workdir: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) if path.is_relative() => workdir.join(path),
            Some(path) => path.to_path_buf(),
            None => {
                let default = workdir.join(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    debug!("no {} in {}, using defaults", DEFAULT_CONFIG_FILE, workdir.display());
                    return Ok(Self::default());
                }
                default
            }
        };
        Self::read(&path)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| DjmakeError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!("loaded configuration from {}", path.display());
        Self::parse(&content, path)
    }
}
