use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment keys consulted for the access credential, in priority order.
pub const CREDENTIAL_ENV_KEYS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Remote model settings. No request timeout unless one is set explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    pub api_base: String,
    pub model: String,
    pub request_timeout: Option<Duration>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: None,
        }
    }
}

impl EditorConfig {
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn api_base(mut self, api_base: impl AsRef<str>) -> Self {
        let trimmed = api_base.as_ref().trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            self.api_base = trimmed.to_string();
        }
        self
    }

    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Where the single access credential comes from.
///
/// Resolution happens on every call to [`CredentialSource::resolve`]; nothing
/// is cached, so a key exported after startup is picked up by the next request.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialSource {
    Environment {
        keys: Vec<String>,
        dotenv: Option<PathBuf>,
    },
    Fixed(Option<String>),
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self::from_env(None)
    }
}

impl CredentialSource {
    pub fn from_env(dotenv: Option<PathBuf>) -> Self {
        Self::Environment {
            keys: CREDENTIAL_ENV_KEYS
                .iter()
                .map(|key| (*key).to_string())
                .collect(),
            dotenv,
        }
    }

    pub fn fixed(value: impl Into<String>) -> Self {
        Self::Fixed(Some(value.into()))
    }

    pub fn missing() -> Self {
        Self::Fixed(None)
    }

    /// Process environment first, then the `.env` file.
    pub fn resolve(&self) -> Option<String> {
        match self {
            Self::Fixed(value) => value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            Self::Environment { keys, dotenv } => {
                if let Some(found) = keys.iter().find_map(|key| non_empty_env(key)) {
                    return Some(found);
                }
                let file_vars = read_dotenv(dotenv.as_deref()?).ok()?;
                keys.iter().find_map(|key| {
                    file_vars
                        .get(key)
                        .map(|value| value.trim().to_string())
                        .filter(|value| !value.is_empty())
                })
            }
        }
    }
}

/// Looks for `.env` in `start` and its ancestors.
pub fn find_dotenv(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(".env");
        if candidate.is_file() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}

/// Key/value pairs from a `.env` file, leaving the process environment
/// alone. Lines `dotenvy` cannot parse are skipped.
pub fn read_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    Ok(entries.filter_map(|entry| entry.ok()).collect())
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn read_dotenv_handles_quotes_and_comments() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join(".env");
        fs::write(
            &path,
            "# local secrets\nGEMINI_API_KEY=\"abc123\"\n\nAPI_KEY='xyz'\n",
        )?;

        let vars = read_dotenv(&path)?;
        assert_eq!(vars.get("GEMINI_API_KEY").map(String::as_str), Some("abc123"));
        assert_eq!(vars.get("API_KEY").map(String::as_str), Some("xyz"));
        assert_eq!(vars.len(), 2);
        assert!(read_dotenv(&temp.path().join("missing.env")).is_err());
        Ok(())
    }

    #[test]
    fn environment_source_falls_back_to_dotenv() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join(".env");
        fs::write(&path, "NEONLOCKS_TEST_ONLY_KEY= from-file \n")?;

        let source = CredentialSource::Environment {
            keys: vec!["NEONLOCKS_TEST_ONLY_KEY".to_string()],
            dotenv: Some(path),
        };
        assert_eq!(source.resolve().as_deref(), Some("from-file"));

        let without_file = CredentialSource::Environment {
            keys: vec!["NEONLOCKS_TEST_ONLY_KEY".to_string()],
            dotenv: None,
        };
        assert_eq!(without_file.resolve(), None);
        Ok(())
    }

    #[test]
    fn fixed_source_treats_blank_as_missing() {
        assert_eq!(CredentialSource::fixed("  ").resolve(), None);
        assert_eq!(CredentialSource::missing().resolve(), None);
        assert_eq!(
            CredentialSource::fixed(" key ").resolve().as_deref(),
            Some("key")
        );
    }

    #[test]
    fn find_dotenv_walks_up_parents() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested)?;
        fs::write(temp.path().join(".env"), "API_KEY=1\n")?;

        assert_eq!(find_dotenv(&nested), Some(temp.path().join(".env")));
        Ok(())
    }

    #[test]
    fn editor_config_trims_api_base() {
        let config = EditorConfig::with_model("gemini-test").api_base("http://localhost:9000/v1/");
        assert_eq!(config.api_base, "http://localhost:9000/v1");
        assert_eq!(config.model, "gemini-test");
        assert_eq!(config.request_timeout, None);

        let unchanged = EditorConfig::default().api_base("   ");
        assert_eq!(unchanged.api_base, DEFAULT_API_BASE);
    }
}
