use std::{env, fs, path::PathBuf};

use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use tollgate_types::ConfirmationPolicy;
use tollgate_util::expand_tilde;
use tracing::warn;

use crate::search::DEFAULT_CATEGORY_LIMIT;
use crate::synonyms::SynonymGroup;

/// Environment override for the configuration file location.
pub const CONFIG_PATH_ENV: &str = "TOLLGATE_CONFIG_PATH";

/// Runtime configuration, read from JSON.
///
/// Every field has a default, so a missing or partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TollgateConfig {
    /// OpenAPI document path or URL; the bundled catalog is used when absent.
    pub catalog: Option<String>,
    /// Business API base URL; `TOLLGATE_API_BASE` takes precedence.
    pub api_base_url: Option<String>,
    pub confirmation_policy: ConfirmationPolicy,
    pub category_limit: usize,
    pub request_timeout_secs: u64,
    /// Synonym groups appended to the built-in vocabulary.
    pub extra_synonyms: Vec<SynonymGroup>,
    pub workflow: WorkflowSettings,
}

impl Default for TollgateConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            api_base_url: None,
            confirmation_policy: ConfirmationPolicy::default(),
            category_limit: DEFAULT_CATEGORY_LIMIT,
            request_timeout_secs: 30,
            extra_synonyms: Vec::new(),
            workflow: WorkflowSettings::default(),
        }
    }
}

/// Endpoints the activity workflow drives after confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    pub primary_endpoint: String,
    pub marketing_endpoint: String,
    pub image_endpoint: String,
    pub qrcode_endpoint: String,
    /// Public front-end origin used for share and registration links.
    pub share_base_url: String,
    /// Platforms that receive a mobile poster.
    pub mobile_platforms: Vec<String>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            primary_endpoint: "/api/activities".to_string(),
            marketing_endpoint: "/api/marketing/campaigns".to_string(),
            image_endpoint: "/api/ai/images/generate".to_string(),
            qrcode_endpoint: "/api/qrcode".to_string(),
            share_base_url: "http://localhost:5173".to_string(),
            mobile_platforms: vec!["wechat".to_string(), "weibo".to_string()],
        }
    }
}

impl TollgateConfig {
    /// Loads from [`default_config_path`]; unreadable or invalid files yield defaults.
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    pub fn load_from(path: &PathBuf) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return TollgateConfig::default();
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(error) => {
                warn!(path = %path.display(), %error, "ignoring invalid configuration file");
                TollgateConfig::default()
            }
        }
    }
}

/// Get the default path for the configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tollgate")
        .join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_selects_config_path() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("/tmp/tollgate-test/config.json"), || {
            assert_eq!(default_config_path(), PathBuf::from("/tmp/tollgate-test/config.json"));
        });
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("config.json");
        fs::write(
            &path,
            r#"{"confirmation_policy": "destructive_only", "workflow": {"share_base_url": "https://k.example.com"}}"#,
        )
        .unwrap();

        let config = TollgateConfig::load_from(&path);

        assert_eq!(config.confirmation_policy, ConfirmationPolicy::DestructiveOnly);
        assert_eq!(config.category_limit, DEFAULT_CATEGORY_LIMIT);
        assert_eq!(config.workflow.share_base_url, "https://k.example.com");
        assert_eq!(config.workflow.primary_endpoint, "/api/activities");
    }

    #[test]
    fn invalid_or_missing_files_fall_back_to_defaults() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(TollgateConfig::load_from(&path), TollgateConfig::default());
        assert_eq!(
            TollgateConfig::load_from(&directory.path().join("absent.json")),
            TollgateConfig::default()
        );
    }

    #[test]
    fn load_reads_file_named_by_environment() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("custom.json");
        fs::write(&path, r#"{"catalog": "~/openapi.yaml", "category_limit": 3}"#).unwrap();

        temp_env::with_var(CONFIG_PATH_ENV, Some(path.to_str().unwrap()), || {
            let config = TollgateConfig::load();
            assert_eq!(config.catalog.as_deref(), Some("~/openapi.yaml"));
            assert_eq!(config.category_limit, 3);
        });
    }
}
