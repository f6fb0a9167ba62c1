use crate::http::Role;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File looked up in the working directory when no `--config` is given
pub const LOCAL_CONFIG_FILE: &str = "library-check.yaml";

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "LIBRARY_CHECK_";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// API root every scenario path is appended to
    pub base_url: String,

    /// Server root, used for the health endpoint
    pub root_url: String,

    /// Per-call timeout (ms)
    pub timeout_ms: u64,

    /// Probe `<rootUrl>/health` before anything else
    pub health_check: bool,

    pub reader: Option<Credentials>,

    pub admin: Option<Credentials>,

    /// Date ranges for the admin stats endpoints
    pub stats: StatsWindow,

    /// Name used when creating the throwaway category
    pub test_category: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            root_url: "http://localhost:8080".to_string(),
            timeout_ms: 5000,
            health_check: true,
            reader: None,
            admin: None,
            stats: StatsWindow::default(),
            test_category: "TEST_CATEGORY_API_CHECK".to_string(),
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsWindow {
    pub from: String,
    pub to: String,
    pub from_month: String,
    pub to_month: String,
    pub limit: u32,
}

impl Default for StatsWindow {
    fn default() -> Self {
        Self {
            from: "2024-01-01".to_string(),
            to: "2025-12-31".to_string(),
            from_month: "2024-01-01".to_string(),
            to_month: "2025-12-01".to_string(),
            limit: 10,
        }
    }
}

impl Config {
    /// Load from `path`, or the first config file found, then apply
    /// `LIBRARY_CHECK_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        let mut config = match file {
            Some(ref p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file: {}", p.display()))?;
                log::debug!("Loaded config from {}", p.display());
                Self::from_yaml_str(&content)
                    .with_context(|| format!("Invalid config file: {}", p.display()))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides; `lookup` receives full variable names
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(url) = var("BASE_URL") {
            self.base_url = url;
        }
        if let Some(url) = var("ROOT_URL") {
            self.root_url = url;
        }
        if let Some(ms) = var("TIMEOUT_MS") {
            self.timeout_ms = ms
                .trim()
                .parse()
                .with_context(|| format!("{}TIMEOUT_MS is not a number: {}", ENV_PREFIX, ms))?;
        }

        merge_credentials(
            &mut self.reader,
            var("READER_EMAIL"),
            var("READER_PASSWORD"),
        );
        merge_credentials(&mut self.admin, var("ADMIN_EMAIL"), var("ADMIN_PASSWORD"));
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn credentials_for(&self, role: Role) -> Option<&Credentials> {
        match role {
            Role::Public => None,
            Role::Reader => self.reader.as_ref(),
            Role::Admin => self.admin.as_ref(),
        }
    }
}

/// A lone email or password only patches credentials that already exist
fn merge_credentials(
    slot: &mut Option<Credentials>,
    email: Option<String>,
    password: Option<String>,
) {
    match (email, password) {
        (Some(email), Some(password)) => *slot = Some(Credentials { email, password }),
        (Some(email), None) => {
            if let Some(existing) = slot.as_mut() {
                existing.email = email;
            }
        }
        (None, Some(password)) => {
            if let Some(existing) = slot.as_mut() {
                existing.password = password;
            }
        }
        (None, None) => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("library-api-checker").join("config.yaml"))
        .filter(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
baseUrl: http://library.local/api
reader:
  email: anna.reader@example.com
  password: reader123
stats:
  limit: 3
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.base_url, "http://library.local/api");
        assert_eq!(config.root_url, "http://localhost:8080");
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.stats.limit, 3);
        assert_eq!(config.stats.from, "2024-01-01");
        assert!(config.admin.is_none());
        assert_eq!(
            config.credentials_for(Role::Reader).unwrap().email,
            "anna.reader@example.com"
        );
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = Config::from_yaml_str("  \n").unwrap();
        assert!(config.health_check);
        assert_eq!(config.test_category, "TEST_CATEGORY_API_CHECK");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("LIBRARY_CHECK_BASE_URL", "http://ci/api"),
                ("LIBRARY_CHECK_TIMEOUT_MS", "750"),
                ("LIBRARY_CHECK_ADMIN_EMAIL", "admin@example.com"),
                ("LIBRARY_CHECK_ADMIN_PASSWORD", "pw"),
                ("LIBRARY_CHECK_READER_EMAIL", "lonely@example.com"),
            ]))
            .unwrap();

        assert_eq!(config.base_url, "http://ci/api");
        assert_eq!(config.timeout(), Duration::from_millis(750));
        assert_eq!(config.admin.as_ref().unwrap().password, "pw");
        // email alone cannot create reader credentials
        assert!(config.reader.is_none());
        assert!(config.credentials_for(Role::Public).is_none());
    }

    #[test]
    fn test_env_patches_existing_credentials() {
        let mut config = Config::default();
        config.reader = Some(Credentials {
            email: "a@example.com".to_string(),
            password: "old".to_string(),
        });
        config
            .apply_env(env(&[("LIBRARY_CHECK_READER_PASSWORD", "new")]))
            .unwrap();
        let reader = config.reader.unwrap();
        assert_eq!(reader.email, "a@example.com");
        assert_eq!(reader.password, "new");
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("LIBRARY_CHECK_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("TIMEOUT_MS"));
    }

    #[test]
    fn test_password_not_in_debug_output() {
        let creds = Credentials {
            email: "a@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
