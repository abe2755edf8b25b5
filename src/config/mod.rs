use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};
use std::{
    env, fs,
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::args::BaseArgs;
use crate::ui::{print_command_status, CommandStatus};

/// Persistent defaults. The password is deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub url: Option<String>,
    pub database: Option<String>,
    pub user: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub const KNOWN_KEYS: &[&str] = &["url", "database", "user"];

impl Config {
    pub fn get_field(&self, key: &str) -> Option<&str> {
        match key {
            "url" => self.url.as_deref(),
            "database" => self.database.as_deref(),
            "user" => self.user.as_deref(),
            _ => None,
        }
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "url" => Some(&mut self.url),
            "database" => Some(&mut self.database),
            "user" => Some(&mut self.user),
            _ => None,
        }
    }

    pub fn set_field(&mut self, key: &str, value: String) -> bool {
        self.field_mut(key).map(|slot| *slot = Some(value)).is_some()
    }

    pub fn unset_field(&mut self, key: &str) -> bool {
        self.field_mut(key).map(|slot| *slot = None).is_some()
    }

    pub fn non_empty_fields(&self) -> Vec<(&str, &str)> {
        KNOWN_KEYS
            .iter()
            .filter_map(|&key| self.get_field(key).map(|v| (key, v)))
            .collect()
    }

    fn merge(&self, other: &Config) -> Config {
        let mut extra = self.extra.clone();
        extra.extend(other.extra.clone());
        Config {
            url: other.url.clone().or_else(|| self.url.clone()),
            database: other.database.clone().or_else(|| self.database.clone()),
            user: other.user.clone().or_else(|| self.user.clone()),
            extra,
        }
    }
}

pub fn global_config_dir() -> Result<PathBuf> {
    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("ddb"));
    }
    dirs::home_dir()
        .map(|path| path.join(".config").join("ddb"))
        .ok_or_else(|| anyhow!("$HOME not configured."))
}

pub fn global_path() -> Result<PathBuf> {
    Ok(global_config_dir()?.join("config.json"))
}

/// Unreadable or malformed files degrade to an empty config with a warning.
pub fn load_file(path: &Path) -> Config {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Config::default(),
        Err(e) => {
            print_command_status(
                CommandStatus::Warning,
                &format!("could not read {}: {e}", path.display()),
            );
            return Config::default();
        }
    };

    let config: Config = match serde_json::from_str(&contents) {
        Ok(c) => c,
        Err(e) => {
            print_command_status(
                CommandStatus::Warning,
                &format!("could not parse {}: {e}", path.display()),
            );
            return Config::default();
        }
    };

    for key in config.extra.keys() {
        print_command_status(
            CommandStatus::Warning,
            &format!("unknown config key {} in {}", key, path.display()),
        );
    }

    config
}

pub fn load() -> Result<Config> {
    let global = load_file(&global_path()?);
    let local = local_path().map(|p| load_file(&p)).unwrap_or_default();
    Ok(global.merge(&local))
}

pub fn save_file(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Walks up from the working directory looking for `.ddb/`, stopping at a git root or $HOME.
pub fn find_local_config_dir() -> Option<PathBuf> {
    let home = dirs::home_dir();
    let mut current_dir = env::current_dir().ok()?;

    loop {
        if current_dir.join(".ddb").is_dir() {
            return Some(current_dir.join(".ddb"));
        }
        if current_dir.join(".git").exists() {
            return None;
        }
        if Some(&current_dir) == home.as_ref() {
            return None;
        }
        if !current_dir.pop() {
            return None;
        }
    }
}

pub fn local_path() -> Option<PathBuf> {
    find_local_config_dir().map(|dir| dir.join("config.json"))
}

fn resolve_path(global: bool, local: bool) -> Result<PathBuf> {
    if global {
        return global_path();
    }
    match local_path() {
        Some(p) => Ok(p),
        None if local => Ok(env::current_dir()?.join(".ddb").join("config.json")),
        None => global_path(),
    }
}

// --- CLI commands ---

#[derive(Debug, Clone, Args)]
pub struct ScopeArgs {
    /// Apply to global config (~/.config/ddb/config.json)
    #[arg(long, short = 'g', conflicts_with = "local")]
    global: bool,

    /// Apply to local config (.ddb/config.json)
    #[arg(long, short = 'l')]
    local: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommands>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommands {
    /// List config values
    List,
    /// Get a config value
    Get {
        /// Config key (url, database, user)
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key (url, database, user)
        key: String,
        /// Value to set
        value: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Remove a config value
    Unset {
        /// Config key (url, database, user)
        key: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
}

fn validate_key(key: &str) -> Result<()> {
    if !KNOWN_KEYS.contains(&key) {
        bail!(
            "Unknown config key: {key}\nValid keys: {}",
            KNOWN_KEYS.join(", ")
        );
    }
    Ok(())
}

pub fn run(base: BaseArgs, args: ConfigArgs) -> Result<()> {
    match args.command {
        None | Some(ConfigCommands::List) => {
            let config = load()?;
            println!("{}", format_fields(&config, base.json)?);
            Ok(())
        }
        Some(ConfigCommands::Get { key }) => {
            validate_key(&key)?;
            match load()?.get_field(&key) {
                Some(value) if base.json => println!("{}", serde_json::to_string(value)?),
                Some(value) => println!("{value}"),
                None => bail!("{key} is not set"),
            }
            Ok(())
        }
        Some(ConfigCommands::Set { key, value, scope }) => {
            validate_key(&key)?;
            let path = resolve_path(scope.global, scope.local)?;
            let mut config = load_file(&path);
            config.set_field(&key, value.clone());
            save_file(&path, &config)?;
            print_command_status(CommandStatus::Success, &format!("Set {key} = {value}"));
            Ok(())
        }
        Some(ConfigCommands::Unset { key, scope }) => {
            validate_key(&key)?;
            let path = resolve_path(scope.global, scope.local)?;
            let mut config = load_file(&path);
            config.unset_field(&key);
            save_file(&path, &config)?;
            print_command_status(CommandStatus::Success, &format!("Unset {key}"));
            Ok(())
        }
    }
}

fn format_fields(config: &Config, json: bool) -> Result<String> {
    let fields = config.non_empty_fields();
    if json {
        let map: Map<String, Value> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        Ok(serde_json::to_string(&map)?)
    } else {
        Ok(fields
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
