use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::models::RightsLevel;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    pub endpoints: EndpointTables,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub bind: BindConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Which endpoint table is active.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Development,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            other => Err(format!(
                "unknown environment '{}'. Must be production or development.",
                other
            )),
        }
    }
}

/// The `[endpoints.production]` and `[endpoints.development]` tables.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EndpointTables {
    #[serde(default)]
    pub production: Option<EndpointsConfig>,
    #[serde(default)]
    pub development: Option<EndpointsConfig>,
}

impl EndpointTables {
    pub fn get(&self, environment: Environment) -> Option<&EndpointsConfig> {
        match environment {
            Environment::Production => self.production.as_ref(),
            Environment::Development => self.development.as_ref(),
        }
    }

    fn iter(&self) -> impl Iterator<Item = (Environment, &EndpointsConfig)> {
        [Environment::Production, Environment::Development]
            .into_iter()
            .filter_map(move |env| self.get(env).map(|e| (env, e)))
    }
}

/// Base URLs for one environment.
#[derive(Debug, Deserialize, Clone)]
pub struct EndpointsConfig {
    /// Discovery application host; landing pages live at `<app_url>ark:-...`.
    pub app_url: String,
    /// File server host; downloads live at `<file_server_url><rights>/...`.
    pub file_server_url: String,
    /// NOID service URL including the trailing `?`, e.g. `https://host/noidu_gmgs?`.
    pub noid_url: String,
}

impl EndpointsConfig {
    pub fn mint_url(&self) -> String {
        format!("{}mint+1", self.noid_url)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            retry_base_ms: 1000,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct BindConfig {
    #[serde(default = "default_bind_field")]
    pub field: String,
    /// Value prefix for the bound field. Defaults to the active `app_url`.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            field: default_bind_field(),
            base_url: None,
            enabled: true,
        }
    }
}

fn default_bind_field() -> String {
    "where".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default = "default_exclude_globs")]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Used when a record's constraints statement names no rights level.
    #[serde(default)]
    pub default_rights: Option<RightsLevel>,
    /// When set, every `cntHours` element is rewritten to this text.
    #[serde(default)]
    pub contact_hours: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            include_globs: default_include_globs(),
            exclude_globs: default_exclude_globs(),
            follow_symlinks: false,
            default_rights: None,
            contact_hours: None,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.xml".to_string()]
}
fn default_exclude_globs() -> Vec<String> {
    vec!["**/*_ISO.xml".to_string(), "**/*_FGDC.xml".to_string()]
}

impl Config {
    /// Endpoints of the active environment.
    pub fn endpoints(&self) -> Result<&EndpointsConfig> {
        self.endpoints.get(self.environment).ok_or_else(|| {
            anyhow::anyhow!(
                "No [endpoints.{}] table in config for the active environment",
                self.environment
            )
        })
    }

    /// Base URL whose suffix is the ark when binding.
    pub fn bind_base_url(&self) -> Result<String> {
        match &self.bind.base_url {
            Some(url) => Ok(url.clone()),
            None => Ok(self.endpoints()?.app_url.clone()),
        }
    }

    /// URI builder settings for the active environment.
    pub fn uri_config(&self) -> Result<crate::uri::UriConfig> {
        let endpoints = self.endpoints()?;
        Ok(crate::uri::UriConfig {
            app_url: endpoints.app_url.clone(),
            file_server_url: endpoints.file_server_url.clone(),
        })
    }

    pub fn with_environment(mut self, environment: Environment) -> Result<Self> {
        self.environment = environment;
        self.endpoints()?;
        Ok(self)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    config.endpoints()?;

    for (env, endpoints) in config.endpoints.iter() {
        check_url(&env, "app_url", &endpoints.app_url, '/')?;
        check_url(&env, "file_server_url", &endpoints.file_server_url, '/')?;
        check_url(&env, "noid_url", &endpoints.noid_url, '?')?;
    }

    if config.http.timeout_secs == 0 {
        anyhow::bail!("http.timeout_secs must be > 0");
    }

    if config.http.max_retries > 10 {
        anyhow::bail!("http.max_retries must be <= 10");
    }

    if config.bind.field.trim().is_empty() || config.bind.field.contains('+') {
        anyhow::bail!("bind.field must be non-empty and must not contain '+'");
    }

    if config.ingest.include_globs.is_empty() {
        anyhow::bail!("ingest.include_globs must not be empty");
    }

    Ok(config)
}

fn check_url(env: &Environment, key: &str, url: &str, terminator: char) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("endpoints.{}.{} must be an http(s) URL: '{}'", env, key, url);
    }
    if !url.ends_with(terminator) {
        anyhow::bail!(
            "endpoints.{}.{} must end with '{}': '{}'",
            env,
            key,
            terminator,
            url
        );
    }
    Ok(())
}
