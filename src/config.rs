use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use log::info;
use serde::{Deserialize, Serialize};
use url::Url;

pub const ENV_BASE_URL: &str = "WILMA_BASE_URL";
pub const ENV_USERNAME: &str = "WILMA_USERNAME";
pub const ENV_PASSWORD: &str = "WILMA_PASSWORD";
pub const ENV_TIMEOUT: &str = "WILMA_TIMEOUT_SECS";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const TEMPLATE: &str = r#"# Wilma portal access. Environment variables WILMA_BASE_URL, WILMA_USERNAME,
# WILMA_PASSWORD and WILMA_TIMEOUT_SECS override these values.
# base_url = "https://yourschool.inschool.fi"
# username = "parent@example.com"
# password = ""
# timeout_secs = 30
"#;

/// Values as written in `config.toml`; every key is optional there.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings.
#[derive(Clone)]
pub struct Config {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("no config dir available"))?
        .join("wilma_client"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Reads `path`. A missing file is replaced by a commented template and
/// contributes no values.
pub fn load_file(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating config directory {}", dir.display()))?;
        }
        fs::write(path, TEMPLATE)
            .with_context(|| format!("writing config template {}", path.display()))?;
        info!("created config template at {}", path.display());
        return Ok(FileConfig::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parsing {}", path.display()))
}

/// File values overlaid with the environment, `.env` included.
pub fn load_config() -> Result<Config> {
    dotenvy::dotenv().ok();
    let path = config_path()?;
    let file = load_file(&path)?;
    Config::resolve(file, |key| std::env::var(key).ok())
        .with_context(|| format!("configure {} or the WILMA_* environment variables", path.display()))
}

impl Config {
    /// Combine file values with `env`, which wins for every key it has.
    pub fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Config> {
        let pick = |key: &str, from_file: Option<String>| {
            env(key)
                .or(from_file)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let base_url = pick(ENV_BASE_URL, file.base_url);
        let username = pick(ENV_USERNAME, file.username);
        let password = pick(ENV_PASSWORD, file.password);

        let missing: Vec<&str> = [
            (ENV_BASE_URL, base_url.is_none()),
            (ENV_USERNAME, username.is_none()),
            (ENV_PASSWORD, password.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(key, _)| key)
        .collect();
        let (Some(base_url), Some(username), Some(password)) = (base_url, username, password) else {
            bail!("missing configuration: {}", missing.join(", "));
        };

        let timeout_secs = match env(ENV_TIMEOUT).filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{ENV_TIMEOUT} must be a number of seconds, got '{raw}'"))?,
            None => file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Config {
            base_url: validate_base_url(&base_url)?,
            username,
            password,
            timeout: Duration::from_secs(timeout_secs.max(1)),
        })
    }
}

fn validate_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw).with_context(|| format!("invalid base URL '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        bail!("base URL must be an http(s) address, got '{raw}'");
    }
    Ok(raw.trim_end_matches('/').to_string())
}
