use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const APP_DIR: &str = "pal_helper";
const CONFIG_FILE: &str = "config.yaml";

pub const DEFAULT_PREFIX: &str = "pal";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the configuration directory")]
    NoConfigDir,
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write config file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("No providers configured. Run 'pal /config' to set up a provider")]
    NoProviders,
    #[error("No model selected. Run 'pal /models' to select a model")]
    NoModelSelected,
    #[error("Selected model '{0}' not found in current configuration. Run 'pal /models' to select a valid model")]
    UnknownModel(String),
    #[error("Selected model '{model}' for key '{key}' not found in current configuration. Run 'pal /models' to select a valid model")]
    UnknownCommandModel { key: String, model: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub abbreviation_prefix: String,
    pub providers: BTreeMap<String, Provider>,
    pub selected_model: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub selected_models: BTreeMap<String, String>,
    pub format_markdown: bool,
    pub zsh_abbreviations: bool,
}

// Providers offered by the setup wizard
pub const PROVIDER_TEMPLATES: [(&str, &str, &[&str]); 4] = [
    (
        "anthropic",
        "https://api.anthropic.com/v1",
        &["claude-3-5-sonnet-latest", "claude-3-5-haiku-latest"],
    ),
    (
        "deepseek",
        "https://api.deepseek.com/v1",
        &["deepseek-chat", "deepseek-reasoner"],
    ),
    (
        "huggingface",
        "https://api-inference.huggingface.co/v1/",
        &[
            "meta-llama/Llama-3.3-70B-Instruct",
            "meta-llama/Llama-3.2-3B-Instruct",
            "deepseek-ai/DeepSeek-R1-Distill-Qwen-32B",
        ],
    ),
    (
        "openai",
        "https://api.openai.com/v1",
        &["gpt-4o", "gpt-4o-mini"],
    ),
];

impl Provider {
    pub fn from_template(name: &str, api_key: &str) -> Option<Self> {
        PROVIDER_TEMPLATES
            .iter()
            .find(|(template, _, _)| *template == name)
            .map(|(_, url, models)| Provider {
                url: url.to_string(),
                api_key: api_key.to_string(),
                models: models.iter().map(|m| m.to_string()).collect(),
            })
    }
}

/// `$XDG_DATA_HOME/pal_helper` when set, the platform config dir otherwise.
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    if let Some(data_home) = env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(data_home).join(APP_DIR));
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(ConfigError::NoConfigDir)
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join(CONFIG_FILE))
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path()?)
    }

    /// A missing file is an empty config.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if data.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let data = serde_yaml::to_string(self)?;
        fs::write(path, data).map_err(write_err)?;
        restrict_permissions(path).map_err(write_err)?;

        debug!("saved config to {}", path.display());
        Ok(())
    }

    /// Verifies providers exist and every selected model belongs to one.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }
        if self.selected_model.is_empty() && self.selected_models.is_empty() {
            return Err(ConfigError::NoModelSelected);
        }
        if !self.selected_model.is_empty() && !self.has_model(&self.selected_model) {
            return Err(ConfigError::UnknownModel(self.selected_model.clone()));
        }
        for (key, model) in &self.selected_models {
            if !self.has_model(model) {
                return Err(ConfigError::UnknownCommandModel {
                    key: key.clone(),
                    model: model.clone(),
                });
            }
        }
        Ok(())
    }

    /// Model configured for `command` (e.g. "ask"), else the default.
    pub fn selected_model(&self, command: &str) -> &str {
        self.selected_models
            .get(command)
            .map(String::as_str)
            .unwrap_or(&self.selected_model)
    }

    pub fn has_model(&self, name: &str) -> bool {
        let Some((provider, model)) = name.split_once('/') else {
            return false;
        };
        self.providers
            .get(provider)
            .is_some_and(|p| p.models.iter().any(|m| m == model))
    }

    /// `provider/model` names, providers in alphabetical order.
    pub fn available_models(&self) -> Vec<String> {
        self.providers
            .iter()
            .flat_map(|(name, provider)| {
                provider
                    .models
                    .iter()
                    .map(move |model| format!("{}/{}", name, model))
            })
            .collect()
    }

    pub fn prefix(&self) -> &str {
        if self.abbreviation_prefix.is_empty() {
            DEFAULT_PREFIX
        } else {
            &self.abbreviation_prefix
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        let mut cfg = Config {
            abbreviation_prefix: "pal".to_string(),
            selected_model: "deepseek/deepseek-chat".to_string(),
            ..Config::default()
        };
        cfg.providers.insert(
            "deepseek".to_string(),
            Provider::from_template("deepseek", "sk-test").unwrap(),
        );
        cfg.providers.insert(
            "anthropic".to_string(),
            Provider::from_template("anthropic", "sk-ant").unwrap(),
        );
        cfg
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let cfg = sample();

        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), cfg);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_parses_partial_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "abbreviation_prefix: ai\nproviders:\n  openai:\n    url: https://api.openai.com/v1\n    models: [gpt-4o]\nselected_models:\n  ask: openai/gpt-4o\n",
        )
        .unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.prefix(), "ai");
        assert_eq!(cfg.providers["openai"].api_key, "");
        assert_eq!(cfg.selected_model("ask"), "openai/gpt-4o");
        assert_eq!(cfg.selected_model("cmd"), "");
        assert!(!cfg.format_markdown);
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "providers: [not, a, map]\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_check() {
        assert!(matches!(
            Config::default().check(),
            Err(ConfigError::NoProviders)
        ));

        let mut cfg = sample();
        assert!(cfg.check().is_ok());

        cfg.selected_model.clear();
        assert!(matches!(cfg.check(), Err(ConfigError::NoModelSelected)));

        cfg.selected_models
            .insert("ask".to_string(), "anthropic/claude-3-5-haiku-latest".to_string());
        assert!(cfg.check().is_ok());

        cfg.selected_models
            .insert("edit".to_string(), "anthropic/nope".to_string());
        assert!(matches!(
            cfg.check(),
            Err(ConfigError::UnknownCommandModel { .. })
        ));

        let mut cfg = sample();
        cfg.selected_model = "deepseek-chat".to_string();
        assert!(matches!(cfg.check(), Err(ConfigError::UnknownModel(_))));
    }

    #[test]
    fn test_model_names_keep_slashes_after_provider() {
        let mut cfg = Config::default();
        cfg.providers.insert(
            "huggingface".to_string(),
            Provider::from_template("huggingface", "").unwrap(),
        );
        assert!(cfg.has_model("huggingface/meta-llama/Llama-3.3-70B-Instruct"));
        assert!(!cfg.has_model("meta-llama/Llama-3.3-70B-Instruct"));
    }

    #[test]
    fn test_available_models_sorted_by_provider() {
        let models = sample().available_models();
        assert_eq!(models[0], "anthropic/claude-3-5-sonnet-latest");
        assert_eq!(models.last().unwrap(), "deepseek/deepseek-reasoner");
        assert_eq!(models.len(), 4);
    }

    #[test]
    fn test_unknown_template() {
        assert!(Provider::from_template("nope", "key").is_none());
        assert_eq!(Config::default().prefix(), DEFAULT_PREFIX);
    }
}
