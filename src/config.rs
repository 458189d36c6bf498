//! Configuration System
//!
//! Hierarchical configuration loading from:
//! - gp2c.toml (project configuration)
//! - Environment variables (GP2C_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # gp2c.toml
//! [output]
//! directory = "./generated"
//!
//! [codegen]
//! highlights = false
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! GP2C_OUTPUT__DIRECTORY=/tmp/out
//! GP2C_CODEGEN__HIGHLIGHTS=false
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub codegen: CodegenConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where generated rule modules are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one `<rule>.h` / `<rule>.c` pair per rule
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: default_output_directory(),
        }
    }
}

/// Code generation options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Emit the per-rule added-item counters and highlight arrays used
    /// by graph-visualisation tooling
    #[serde(default = "default_true")]
    pub highlights: bool,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        CodegenConfig { highlights: true }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("./generated")
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from `gp2c.toml` and the environment.
    pub fn load() -> Result<Config, figment::Error> {
        Config::figment(Path::new("gp2c.toml")).extract()
    }

    /// Load configuration from an explicit TOML file path plus the
    /// environment.
    pub fn load_from(path: &Path) -> Result<Config, figment::Error> {
        Config::figment(path).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("GP2C_").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_directory() {
        let config = Config::default();
        assert_eq!(config.output.directory, PathBuf::from("./generated"));
    }

    #[test]
    fn test_default_highlights_enabled() {
        let config = Config::default();
        assert!(config.codegen.highlights);
    }

    #[test]
    fn test_default_log_level() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.output.directory, config.output.directory);
        assert_eq!(back.codegen.highlights, config.codegen.highlights);
    }
}
