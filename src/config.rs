use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::identity::AuthorIdentity;
use crate::domain::timestamp::DateWindow;
use crate::error::{AppError, AppResult};

pub const DEFAULT_CONFIG_FILE: &str = "master.toml";
pub const DEFAULT_OLLAMA_MODEL: &str = "mistral";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
const DEFAULT_GENERATION_ATTEMPTS: u32 = 3;
const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

/// On-disk form of the configuration file. Every field is optional so the
/// wizard can load and save partial files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(rename = "REPO_PATH", default, skip_serializing_if = "Option::is_none")]
    pub repo_path: Option<String>,
    #[serde(rename = "GIT_USER_NAME", default, skip_serializing_if = "Option::is_none")]
    pub git_user_name: Option<String>,
    #[serde(rename = "GIT_USER_EMAIL", default, skip_serializing_if = "Option::is_none")]
    pub git_user_email: Option<String>,
    #[serde(rename = "OLLAMA_MODEL", default, skip_serializing_if = "Option::is_none")]
    pub ollama_model: Option<String>,
    #[serde(rename = "OLLAMA_HOST", default, skip_serializing_if = "Option::is_none")]
    pub ollama_host: Option<String>,
    #[serde(rename = "START_DATE", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(rename = "END_DATE", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(rename = "BRANCH", default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(
        rename = "GENERATION_ATTEMPTS",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub generation_attempts: Option<u32>,
}

impl StoredConfig {
    /// Missing files load as an empty configuration.
    pub fn load(path: &Path) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).map_err(|err| match err {
                AppError::Configuration(msg) => {
                    AppError::Configuration(format!("{}: {msg}", path.display()))
                }
                other => other,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn parse(contents: &str) -> AppResult<Self> {
        toml::from_str(contents)
            .map_err(|err| AppError::Configuration(format!("invalid config file: {err}")))
    }

    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let data = toml::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub repo_path: PathBuf,
    pub identity: AuthorIdentity,
    pub ollama_model: String,
    pub ollama_host: String,
    pub date_window: DateWindow,
    pub branch: Option<String>,
    pub generation_attempts: u32,
}

impl AppConfig {
    pub fn load(path: &Path) -> AppResult<Self> {
        let stored = StoredConfig::load(path)?;
        Self::from_stored(stored, env::var(OLLAMA_HOST_ENV).ok())
    }

    pub fn from_stored(stored: StoredConfig, host_override: Option<String>) -> AppResult<Self> {
        let repo_path = required(stored.repo_path, "REPO_PATH")?;
        let name = required(stored.git_user_name, "GIT_USER_NAME")?;
        let email = required(stored.git_user_email, "GIT_USER_EMAIL")?;
        let identity = AuthorIdentity::new(&name, &email)?;

        let date_window = DateWindow::parse(
            non_empty(stored.start_date).as_deref(),
            non_empty(stored.end_date).as_deref(),
        )?;

        let generation_attempts = stored
            .generation_attempts
            .unwrap_or(DEFAULT_GENERATION_ATTEMPTS);
        if generation_attempts == 0 {
            return Err(AppError::Configuration(
                "GENERATION_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let ollama_host = non_empty(host_override)
            .or_else(|| non_empty(stored.ollama_host))
            .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string());

        Ok(Self {
            repo_path: PathBuf::from(repo_path),
            identity,
            ollama_model: non_empty(stored.ollama_model)
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            ollama_host,
            date_window,
            branch: non_empty(stored.branch),
            generation_attempts,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, key: &str) -> AppResult<String> {
    non_empty(value).ok_or_else(|| AppError::Configuration(format!("{key} is not configured")))
}
