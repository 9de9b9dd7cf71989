//! Configuration for Gold Editor.
//!
//! Settings come from a KDL file, `GOLD_EDITOR_*` environment variables and
//! CLI flags. The file is looked up at:
//! - `--config <path>` when given
//! - `./gold-editor.kdl`
//! - `~/.config/gold-editor/config.kdl`
//!
//! ## Precedence
//!
//! CLI flag > environment variable > config file > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, ENV_PREFIX, LOCAL_CONFIG_FILE, Resolved, ResolvedSettings, ValueSource,
    resolve_with,
};
pub use schema::{FileConfig, LogFormat, Settings};
