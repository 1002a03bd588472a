use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ConfigError;

/// A package config file. Namely Transpiler.toml
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub package: Package,
    #[serde(default)]
    pub profile: HashMap<String, Profile>,
}

/// Meta information about the package.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Package {
    /// The name of the package.
    pub name: String,
    /// The SEMVER compatible version of the package.
    pub version: String,
    /// The SPDX license name.
    #[serde(default)]
    pub license: String,
}

/// Defines a compilation profile.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Profile {
    /// Whether this profile is the --release profile.
    #[serde(default)]
    pub release: bool,
    /// Whether instructions carry debug info.
    #[serde(default)]
    pub debug_info: bool,
}

/// Settings the [`IRBuilder`](crate::ir::builder::IRBuilder) stamps on every
/// instruction it emits.
#[derive(Debug, Clone, Default)]
pub struct BuilderOptions {
    pub filename: Option<String>,
    pub debug: bool,
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("loading config from {}", path.display());
        Self::from_toml(&source)
    }

    /// Builder options for compiling `filename` under the given profile.
    pub fn builder_options(
        &self,
        profile: &str,
        filename: Option<&str>,
    ) -> Result<BuilderOptions, ConfigError> {
        let profile = self
            .profile
            .get(profile)
            .ok_or_else(|| ConfigError::MissingProfile(profile.to_string()))?;

        Ok(BuilderOptions {
            filename: filename.map(ToString::to_string),
            debug: profile.debug_info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[package]
name = "demo"
version = "0.1.0"

[profile.dev]
debug_info = true

[profile.release]
release = true
"#;

    #[test]
    fn profiles_drive_debug_info() {
        let config = Config::from_toml(CONFIG).unwrap();
        assert_eq!(config.package.name, "demo");
        assert!(config.package.license.is_empty());

        let dev = config.builder_options("dev", Some("main.py")).unwrap();
        assert!(dev.debug);
        assert_eq!(dev.filename.as_deref(), Some("main.py"));

        let release = config.builder_options("release", None).unwrap();
        assert!(!release.debug);
        assert!(config.profile["release"].release);
    }

    #[test]
    fn unknown_profile() {
        let config = Config::from_toml(CONFIG).unwrap();
        assert!(matches!(
            config.builder_options("bench", None),
            Err(ConfigError::MissingProfile(name)) if name == "bench"
        ));
    }
}
