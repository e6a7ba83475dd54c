//! API key resolution.
//!
//! The key is looked up in an ordered list of [`SecretSource`]s; the first
//! source that yields a non-empty value wins.  The standard chain consults a
//! YAML secrets file, then the process environment, then a local `.env` file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Error, Result};

/// Variable names that may hold the API key, in order of preference.
pub const API_KEY_VARS: &[&str] = &["ANTHROPIC_API_KEY", "KEY"];

/// Environment variable naming the secrets file.
pub const SECRETS_PATH_VAR: &str = "COLLOQUY_SECRETS";

/// Secrets file consulted when `COLLOQUY_SECRETS` is unset.
pub const DEFAULT_SECRETS_PATH: &str = ".colloquy/secrets.yaml";

/// A place secrets can be read from.
pub trait SecretSource: Send + Sync {
    /// Short description used in logs.
    fn name(&self) -> String;

    /// Look up one key.  A missing key or a missing backing file is `Ok(None)`;
    /// a backing file that cannot be read or parsed is an error.
    fn lookup(&self, key: &str) -> Result<Option<String>>;
}

/// A YAML mapping of secret names to values.
#[derive(Debug, Clone)]
pub struct SecretsFile {
    path: PathBuf,
}

impl SecretsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file named by `COLLOQUY_SECRETS`, or `.colloquy/secrets.yaml`.
    pub fn from_env() -> Self {
        match std::env::var(SECRETS_PATH_VAR) {
            Ok(path) if !path.is_empty() => Self::new(path),
            _ => Self::new(DEFAULT_SECRETS_PATH),
        }
    }
}

impl SecretSource for SecretsFile {
    fn name(&self) -> String {
        format!("secrets file {}", self.path.display())
    }

    fn lookup(&self, key: &str) -> Result<Option<String>> {
        let Some(contents) = read_optional(&self.path)? else {
            return Ok(None);
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let secrets: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(&contents)
            .map_err(|e| {
                Error::configuration(format!(
                    "secrets file {} is malformed: {e}",
                    self.path.display()
                ))
            })?;
        Ok(secrets.get(key).and_then(|v| match v {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }))
    }
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Environment;

impl SecretSource for Environment {
    fn name(&self) -> String {
        "environment".to_string()
    }

    fn lookup(&self, key: &str) -> Result<Option<String>> {
        Ok(std::env::var(key).ok())
    }
}

/// A dotenv-format file, read without modifying the process environment.
#[derive(Debug, Clone)]
pub struct DotEnvFile {
    path: PathBuf,
}

impl DotEnvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SecretSource for DotEnvFile {
    fn name(&self) -> String {
        format!("dotenv file {}", self.path.display())
    }

    fn lookup(&self, key: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let malformed = |e: dotenvy::Error| {
            Error::configuration(format!(
                "dotenv file {} is malformed: {e}",
                self.path.display()
            ))
        };
        for item in dotenvy::from_path_iter(&self.path).map_err(malformed)? {
            let (name, value) = item.map_err(malformed)?;
            if name == key {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::configuration(format!(
            "cannot read {}: {e}",
            path.display()
        ))),
    }
}

/// Ordered secret sources.
pub struct CredentialChain {
    sources: Vec<Box<dyn SecretSource>>,
    keys: Vec<String>,
}

impl CredentialChain {
    /// An empty chain that looks for the standard key names.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            keys: API_KEY_VARS.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Secrets file, then environment, then `.env`.
    pub fn standard() -> Self {
        Self::layered(SecretsFile::from_env(), DotEnvFile::new(".env"))
    }

    fn layered(secrets: SecretsFile, dotenv: DotEnvFile) -> Self {
        Self::new()
            .with_source(secrets)
            .with_source(Environment)
            .with_source(dotenv)
    }

    /// Append a source; earlier sources take precedence.
    pub fn with_source(mut self, source: impl SecretSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Replace the key names to look for.
    pub fn with_keys(mut self, keys: &[&str]) -> Self {
        self.keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Return the first non-empty value for any key, trying each source in
    /// order and each key in order within a source.
    pub fn resolve(&self) -> Result<String> {
        for source in &self.sources {
            for key in &self.keys {
                if let Some(value) = source.lookup(key)? {
                    let value = value.trim();
                    if !value.is_empty() {
                        debug!(source = %source.name(), key = %key, "resolved API key");
                        return Ok(value.to_string());
                    }
                }
            }
        }
        Err(Error::configuration(format!(
            "no API key found; set {} in the environment, {} or .env",
            self.keys.join(" or "),
            DEFAULT_SECRETS_PATH
        )))
    }
}

impl Default for CredentialChain {
    fn default() -> Self {
        Self::standard()
    }
}
