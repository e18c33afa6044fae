//! Properties-file configuration.
//!
//! Configuration files are plain `key = value` lines. Lines starting with `#`
//! or `!` are comments, blank lines are ignored and a key that appears twice
//! keeps its last value. Environment variables override the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use dirs::config_dir;

use crate::error::{Error, Result};

const APP_NAME: &str = "gemini";
const CONFIG_FILE: &str = "gemini.conf";
const DEFAULT_PORT: u16 = 3000;

/// Prefix for feature flag settings (`Feature.<...>.<key> = true`).
pub const FEATURE_PREFIX: &str = "Feature.";

/// Ordered `key = value` settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let mut props = Self::new();
        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    props.set(key.trim(), value.trim());
                }
                _ => {
                    tracing::warn!("Ignoring malformed configuration line {}: {}", number + 1, line);
                }
            }
        }
        props
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(parse_bool)
    }

    /// Entries whose key starts with `prefix`, with the prefix stripped.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.entries.iter().filter_map(move |(key, value)| {
            key.strip_prefix(prefix).map(|rest| (rest, value.as_str()))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lenient boolean: `true/false`, `yes/no`, `on/off`, `1/0`, any case.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// SQLite file. `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
    pub port: u16,
    /// JSON file declaring the feature tree.
    pub features_file: Option<PathBuf>,
    /// Relations to open and serve.
    pub relations: Vec<String>,
    /// Every setting from the file, including `Feature.*` flags.
    pub properties: Properties,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            port: DEFAULT_PORT,
            features_file: None,
            relations: Vec::new(),
            properties: Properties::new(),
        }
    }
}

impl GeminiConfig {
    /// Load from the user's config directory, then apply environment
    /// overrides. A missing or invalid file falls back to defaults; the
    /// environment still applies on top of them.
    pub fn load() -> Self {
        let path = default_config_path()
            .map_err(|e| tracing::warn!("{}", e))
            .ok();
        Self::load_with(path.as_deref(), |name| std::env::var(name).ok())
    }

    /// [`GeminiConfig::load`] with an explicit file and variable lookup.
    pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base = match path.filter(|p| p.exists()) {
            Some(path) => match Properties::load(path).and_then(Self::from_properties) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to load config from {}, using defaults: {}",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            None => Self::default(),
        };

        match base.clone().with_overrides(lookup) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring environment overrides: {}", e);
                base
            }
        }
    }

    /// Load a specific file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let props = Properties::load(path)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Self::from_properties(props)?.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn from_properties(properties: Properties) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = properties.get("Database.Path") {
            config.database_path = Some(PathBuf::from(path));
        }
        if let Some(port) = properties.get("Server.Port") {
            config.port = parse_port(port)?;
        }
        if let Some(path) = properties.get("Features.File") {
            config.features_file = Some(PathBuf::from(path));
        }
        if let Some(names) = properties.get("Relations") {
            config.relations = names
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        config.properties = properties;
        Ok(config)
    }

    /// Apply overrides from `GEMINI_DB_PATH`, `GEMINI_PORT` and
    /// `GEMINI_FEATURES_FILE`, read through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup("GEMINI_DB_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(port) = lookup("GEMINI_PORT") {
            self.port = parse_port(&port)?;
        }
        if let Some(path) = lookup("GEMINI_FEATURES_FILE") {
            self.features_file = Some(PathBuf::from(path));
        }
        Ok(self)
    }
}

fn parse_port(value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid port: {}", value)))
}

/// `<config dir>/gemini/gemini.conf`.
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = config_dir()
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
