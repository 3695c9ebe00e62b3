use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use config::{Config, ConfigError, Environment, File, Map};
use serde::{Deserialize, Serialize};

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_LOG_FILE: &str = "~/.local/state/jira-rewriter/jira-rewriter.log";
const LOCAL_CONFIG_FILE: &str = "jira-rewriter.toml";
const ENV_PREFIX: &str = "JIRA_REWRITER";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub backend_url: String,
    pub banner_timeout_secs: u64,
    pub log_file: String,
}

impl Settings {
    /// Defaults, then the user file, then the local (or explicit) file, then
    /// `JIRA_REWRITER_*` variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let local = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));
        Self::load_from(
            get_user_config_path().as_deref(),
            &local,
            explicit.is_some(),
            None,
        )
    }

    /// `env` replaces the process environment when given; keys keep the
    /// `JIRA_REWRITER_` prefix.
    pub fn load_from(
        user_config: Option<&Path>,
        local_config: &Path,
        local_required: bool,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("backend_url", DEFAULT_BACKEND_URL)?
            .set_default("banner_timeout_secs", 5)?
            .set_default("log_file", DEFAULT_LOG_FILE)?;
        if let Some(user_config) = user_config {
            builder = builder.add_source(File::from(user_config).required(false));
        }
        builder
            .add_source(File::from(local_config).required(local_required))
            .add_source(Environment::with_prefix(ENV_PREFIX).source(env))
            .build()?
            .try_deserialize()
    }

    /// `--backend-url` wins over every file and variable.
    pub fn apply_backend_url_override(&mut self, backend_url: Option<&str>) {
        if let Some(url) = backend_url {
            self.backend_url = url.to_string();
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backend_url.trim().is_empty() {
            bail!("backend_url must not be empty");
        }
        if self.banner_timeout_secs == 0 {
            bail!("banner_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn banner_timeout(&self) -> Duration {
        Duration::from_secs(self.banner_timeout_secs)
    }

    pub fn log_path(&self) -> anyhow::Result<PathBuf> {
        let expanded = shellexpand::full(&self.log_file)
            .with_context(|| format!("could not expand log_file {}", self.log_file))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }
}

pub fn get_user_config_path() -> Option<PathBuf> {
    let mut path = dirs::home_dir()?;
    path.push(".config");
    path.push("jira-rewriter");
    path.push("config.toml");
    Some(path)
}

pub fn save_backend_url(backend_url: &str) -> anyhow::Result<PathBuf> {
    let path = get_user_config_path().context("could not determine the home directory")?;
    save_backend_url_to(&path, backend_url)?;
    Ok(path)
}

/// Rewrites only `backend_url`; other keys in the file are preserved.
pub fn save_backend_url_to(path: &Path, backend_url: &str) -> anyhow::Result<()> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let mut doc = config_str
        .parse::<toml::Table>()
        .with_context(|| format!("{} is not valid TOML", path.display()))?;

    doc.insert(
        "backend_url".to_string(),
        toml::Value::String(backend_url.to_string()),
    );

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }
    fs::write(path, doc.to_string()).with_context(|| format!("could not write {}", path.display()))?;
    Ok(())
}
