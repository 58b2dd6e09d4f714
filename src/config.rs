//! Configuration file for nmrkit
//!
//! Settings are read from `nmrkit.toml` in the working directory, or from the
//! file named with `--config`. Every section is optional; command-line flags
//! take precedence over values read here.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use nmrkit_changelog::DEFAULT_TITLE;

/// Config file looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "nmrkit.toml";

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub engine: EngineSection,

    /// Extra or re-pointed verbs: `verb = "entry"`
    pub commands: BTreeMap<String, String>,

    pub changelog: ChangelogSection,

    pub manifest: ManifestSection,
}

/// How to start the external engine
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSection {
    /// Executable to launch
    pub program: String,

    /// Arguments placed before the entry point on every launch
    pub args: Vec<String>,

    /// Entry point that runs processing recipes
    pub process_entry: String,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            program: "nmrfx".to_string(),
            args: Vec::new(),
            process_entry: "process".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChangelogSection {
    pub title: String,
    pub input: PathBuf,
}

impl Default for ChangelogSection {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            input: PathBuf::from("logall.txt"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestSection {
    pub key: String,
    pub lib_dir: String,
    pub main_class: Option<String>,
    /// `windows` or `unix`; detected from the host when unset
    pub platform: Option<String>,
}

impl Default for ManifestSection {
    fn default() -> Self {
        Self {
            key: "classpath".to_string(),
            lib_dir: "lib".to_string(),
            main_class: None,
            platform: None,
        }
    }
}

impl Config {
    /// Load the named file (which must exist), or the default file if present
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::from_file(path)
                } else {
                    tracing::debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
