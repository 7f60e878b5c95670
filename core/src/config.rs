// Run configuration
//
// Settings are layered with the `config` crate: built-in defaults, the user's
// config directory, a `bulkwipe.toml` in the working directory, an explicit
// `--config` file and finally `BULKWIPE_<SECTION>__<KEY>` environment
// variables. Per-run switches from the command line live in `RunOptions`.

use crate::{WipeError, WipeResult};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "BULKWIPE";
const LOCAL_CONFIG: &str = "bulkwipe.toml";

/// Inventory service connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventorySettings {
    pub url: String,
    pub token: String,
    /// Parent location for newly created items
    pub location: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// External wipe-and-verify tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WipeSettings {
    pub program: String,
    /// Arguments; `{device}` and `{log}` are substituted per disk
    pub args: Vec<String>,
    pub log_dir: PathBuf,
    pub require_root: bool,
}

impl Default for WipeSettings {
    fn default() -> Self {
        Self {
            program: "badblocks".to_string(),
            args: ["-w", "-t", "0x00", "-o", "{log}", "{device}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            log_dir: PathBuf::from("badblocks_error_logs"),
            require_root: true,
        }
    }
}

/// Programs used to inspect the host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeSettings {
    pub lsblk: String,
    pub smartctl: String,
    pub df: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            lsblk: "lsblk".to_string(),
            smartctl: "smartctl".to_string(),
            df: "df".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub inventory: InventorySettings,
    #[serde(default)]
    pub wipe: WipeSettings,
    #[serde(default)]
    pub probe: ProbeSettings,
    #[serde(default = "default_shutdown_command")]
    pub shutdown_command: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_shutdown_command() -> Vec<String> {
    vec!["shutdown".to_string()]
}

impl Settings {
    /// Load settings from every configured source
    pub fn load(explicit: Option<&Path>) -> WipeResult<Self> {
        let mut builder = Config::builder();

        if let Some(dirs) = ProjectDirs::from("org", "bulkwipe", "bulkwipe") {
            let user_config = dirs.config_dir().join("config.toml");
            builder = builder.add_source(File::from(user_config).required(false));
        }

        builder = builder.add_source(File::with_name(LOCAL_CONFIG).required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(" ")
                    .with_list_parse_key("wipe.args")
                    .with_list_parse_key("shutdown_command")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| WipeError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| WipeError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> WipeResult<()> {
        if self.inventory.url.trim().is_empty() {
            return Err(WipeError::Config("inventory.url is empty".to_string()));
        }
        if self.inventory.location.trim().is_empty() {
            return Err(WipeError::Config(
                "inventory.location must name the parent for new items".to_string(),
            ));
        }
        if self.wipe.program.trim().is_empty() {
            return Err(WipeError::Config("wipe.program is empty".to_string()));
        }
        Ok(())
    }
}

/// Switches taken from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    pub quiet: bool,
    pub simulate: bool,
    pub usb_allowed: bool,
    pub shutdown: bool,
}

/// Everything a run needs, passed explicitly into each component
#[derive(Debug, Clone)]
pub struct RunContext {
    pub options: RunOptions,
    pub settings: Settings,
}

impl RunContext {
    pub fn new(options: RunOptions, settings: Settings) -> Self {
        Self { options, settings }
    }
}
