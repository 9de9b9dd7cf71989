//! Unified precedence resolution for settings.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. `GOLD_EDITOR_*` environment variables
//! 3. KDL config file (`--config`, else `./gold-editor.kdl`,
//!    else `~/.config/gold-editor/config.kdl`)
//! 4. Built-in defaults

use super::schema::{DEFAULT_HOST, DEFAULT_LOG_LEVEL, DEFAULT_PORT, FileConfig, LogFormat, Settings};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Prefix of every settings environment variable.
pub const ENV_PREFIX: &str = "GOLD_EDITOR_";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "gold-editor.kdl";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from environment variable
    EnvVar(String),
    /// Value from a config file
    ConfigFile(PathBuf),
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile(path) => write!(f, "file:{}", path.display()),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// CLI overrides for settings resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Explicit config file (`--config`)
    pub config_file: Option<PathBuf>,
    pub data_root: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set config file override.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set data root override.
    pub fn with_data_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_root = Some(path.into());
        self
    }

    /// Set host override.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set port override.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}

/// Fully resolved settings with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    /// Config file that was read, if any
    pub config_file: Option<PathBuf>,
    pub data_root: Resolved<PathBuf>,
    pub host: Resolved<String>,
    pub port: Resolved<u16>,
    pub backup_on_save: Resolved<bool>,
    pub edits_log: Option<Resolved<PathBuf>>,
    pub reviewed_output_dir: Option<Resolved<PathBuf>>,
    pub skipped_output_dir: Option<Resolved<PathBuf>>,
    pub log_level: Resolved<String>,
    pub log_format: Resolved<LogFormat>,
}

impl ResolvedSettings {
    /// Resolve from the process environment.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let user_config = dirs::config_dir().map(|dir| dir.join("gold-editor").join("config.kdl"));
        resolve_with(overrides, &cwd, user_config.as_deref(), |name| std::env::var(name).ok())
    }

    /// Drop source tracking.
    pub fn into_settings(self) -> Settings {
        Settings {
            data_root: self.data_root.value,
            host: self.host.value,
            port: self.port.value,
            backup_on_save: self.backup_on_save.value,
            edits_log: self.edits_log.map(|r| r.value),
            reviewed_output_dir: self.reviewed_output_dir.map(|r| r.value),
            skipped_output_dir: self.skipped_output_dir.map(|r| r.value),
            log_level: self.log_level.value,
            log_format: self.log_format.value,
        }
    }
}

/// Pick the config file: the explicit one (which must exist), else the
/// local file, else the user-level file.
fn find_config_file(
    explicit: Option<&Path>,
    cwd: &Path,
    user_config: Option<&Path>,
) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(Error::Config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }
    let local = cwd.join(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Ok(Some(local));
    }
    Ok(user_config.filter(|path| path.is_file()).map(Path::to_path_buf))
}

/// One layer lookup: env var, then config file value.
struct Layers<'a, F> {
    env: F,
    file: &'a FileConfig,
    file_source: ValueSource,
}

impl<F: Fn(&str) -> Option<String>> Layers<'_, F> {
    fn env_var(&self, key: &str) -> Option<(String, ValueSource)> {
        let name = format!("{}{}", ENV_PREFIX, key);
        (self.env)(&name)
            .filter(|value| !value.is_empty())
            .map(|value| (value, ValueSource::EnvVar(name)))
    }

    fn parsed_env<T: FromStr>(&self, key: &str) -> Result<Option<Resolved<T>>> {
        match self.env_var(key) {
            Some((raw, source)) => match raw.parse() {
                Ok(value) => Ok(Some(Resolved::new(value, source))),
                Err(_) => Err(Error::Config(format!("Invalid value {:?} for {}", raw, source))),
            },
            None => Ok(None),
        }
    }

    fn pick<T: Clone>(
        &self,
        cli: Option<&T>,
        env: Option<Resolved<T>>,
        file: Option<&T>,
    ) -> Option<Resolved<T>> {
        if let Some(value) = cli {
            return Some(Resolved::new(value.clone(), ValueSource::CliFlag));
        }
        if env.is_some() {
            return env;
        }
        file.map(|value| Resolved::new(value.clone(), self.file_source.clone()))
    }
}

/// Resolve settings against an explicit working directory, user config path
/// and environment lookup.
pub fn resolve_with<F>(
    overrides: &ConfigOverrides,
    cwd: &Path,
    user_config: Option<&Path>,
    env: F,
) -> Result<ResolvedSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let config_file = find_config_file(overrides.config_file.as_deref(), cwd, user_config)?;
    let file = match &config_file {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let layers = Layers {
        env,
        file: &file,
        file_source: config_file
            .clone()
            .map(ValueSource::ConfigFile)
            .unwrap_or(ValueSource::Default),
    };

    let path_env = |key: &str| {
        layers
            .env_var(key)
            .map(|(raw, source)| Resolved::new(PathBuf::from(raw), source))
    };

    let data_root = layers
        .pick(overrides.data_root.as_ref(), path_env("DATA_ROOT"), layers.file.data_root.as_ref())
        .unwrap_or_else(|| Resolved::new(PathBuf::from("."), ValueSource::Default));

    let host = layers
        .pick(
            overrides.host.as_ref(),
            layers.env_var("HOST").map(|(raw, source)| Resolved::new(raw, source)),
            layers.file.host.as_ref(),
        )
        .unwrap_or_else(|| Resolved::new(DEFAULT_HOST.to_string(), ValueSource::Default));

    let port = layers
        .pick(overrides.port.as_ref(), layers.parsed_env("PORT")?, layers.file.port.as_ref())
        .unwrap_or_else(|| Resolved::new(DEFAULT_PORT, ValueSource::Default));

    let backup_on_save = layers
        .pick(None, layers.parsed_env("BACKUP_ON_SAVE")?, layers.file.backup_on_save.as_ref())
        .unwrap_or_else(|| Resolved::new(true, ValueSource::Default));

    let edits_log = layers.pick(None, path_env("EDITS_LOG"), layers.file.edits_log.as_ref());
    let reviewed_output_dir = layers.pick(
        None,
        path_env("REVIEWED_OUTPUT_DIR"),
        layers.file.reviewed_output_dir.as_ref(),
    );
    let skipped_output_dir = layers.pick(
        None,
        path_env("SKIPPED_OUTPUT_DIR"),
        layers.file.skipped_output_dir.as_ref(),
    );

    let log_level = layers
        .pick(
            None,
            layers.env_var("LOG_LEVEL").map(|(raw, source)| Resolved::new(raw, source)),
            layers.file.log_level.as_ref(),
        )
        .unwrap_or_else(|| Resolved::new(DEFAULT_LOG_LEVEL.to_string(), ValueSource::Default));

    let log_format_env = match layers.env_var("LOG_FORMAT") {
        Some((raw, source)) => Some(Resolved::new(
            LogFormat::parse(&raw)
                .ok_or_else(|| Error::Config(format!("Invalid value {:?} for {}", raw, source)))?,
            source,
        )),
        None => None,
    };
    let log_format = layers
        .pick(None, log_format_env, layers.file.log_format.as_ref())
        .unwrap_or_else(|| Resolved::new(LogFormat::Text, ValueSource::Default));

    Ok(ResolvedSettings {
        config_file,
        data_root,
        host,
        port,
        backup_on_save,
        edits_log,
        reviewed_output_dir,
        skipped_output_dir,
        log_level,
        log_format,
    })
}
