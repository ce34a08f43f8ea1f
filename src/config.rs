//! The supervisor's data model: [`Config`], [`Command`], [`CronJob`], [`Template`].
//!
//! Loaded once at startup from TOML and treated as read-only thereafter.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::enabler::Enabler;
use crate::error::Error;

/// The seven environment variables a `safe_env` child is allowed to see.
pub const SAFE_ENV_WHITELIST: [&str; 7] =
    ["HOST", "PATH", "EDITOR", "SHELL", "TERM", "TMP", "TEMP"];

/// An external file-render step producing a config file a worker reads at spawn time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Template {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub dst: String,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl Template {
    /// True when both `src` and `dst` are set, i.e. rendering was requested.
    pub fn enabled(&self) -> bool {
        !self.src.is_empty() && !self.dst.is_empty()
    }
}

/// One launchable process: pre-start, post-start, a worker, or a cron job's body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Command {
    #[serde(default)]
    pub cmd: String,
    #[serde(default, rename = "config")]
    pub template: Template,
    #[serde(default, rename = "user")]
    pub run_as: Option<String>,
    #[serde(default)]
    pub enabled: Option<Enabler>,
    #[serde(default, rename = "safeEnv")]
    pub safe_env: bool,
}

impl Command {
    /// Splits `cmd` on ASCII whitespace; the first token is the program, the rest argv.
    pub fn argv(&self) -> Vec<&str> {
        self.cmd.split_ascii_whitespace().collect()
    }
}

/// A crontab-scheduled [`Command`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CronJob {
    #[serde(rename = "job")]
    pub command: Command,
    pub schedule: String,
}

/// The fully parsed, immutable configuration tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub pre_start: Option<Command>,
    #[serde(default)]
    pub post_start: Option<Command>,
    #[serde(default)]
    pub process: Vec<Command>,
    #[serde(default)]
    pub cron: Vec<CronJob>,
}

impl Config {
    /// Reads and parses the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigInvalid(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&contents)
            .map_err(|e| Error::ConfigInvalid(format!("parsing {}: {e}", path.display())))
    }
}
