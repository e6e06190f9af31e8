//! Config fields definitions for the scheduler and its plugins

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::printer::DecisionPrinterConfig;

pub const DEFAULT_SCHEDULER_NAME: &str = "default_scheduler";

pub const DEFAULT_MODEL_NAME_LABEL_KEY: &str = "llmaz.io/model-name";
pub const DEFAULT_FLAVORS_ANNOTATION_KEY: &str = "llmaz.io/inference-service-flavors";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    /// Profile used for pods which don't set the `scheduler_name` label.
    #[serde(default = "default_scheduler_name")]
    pub default_scheduler_name: String,
    /// Number of worker threads running Filter over candidate nodes. 1 means sequential.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// If not set default output of logs is stdout/stderr
    pub logs_filepath: Option<String>,
    pub output: Option<DecisionPrinterConfig>,
    /// Empty means a single default profile with every registered plugin enabled.
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
    #[serde(default)]
    pub plugin_args: PluginArgs,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ProfileConfig {
    pub scheduler_name: String,
    #[serde(default)]
    pub plugins: PluginsConfig,
}

// Each extension point is a list of enabled plugins which are registered globally in plugin
// registry.
#[derive(Clone, Default, Debug, Deserialize, PartialEq)]
pub struct PluginsConfig {
    #[serde(default)]
    pub pre_filter: Vec<PluginConfig>,
    #[serde(default)]
    pub filter: Vec<PluginConfig>,
    #[serde(default)]
    pub pre_score: Vec<PluginConfig>,
    #[serde(default)]
    pub score: Vec<PluginConfig>,
}

// Plugin specifies a plugin name and its weight when applicable.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PluginConfig {
    pub name: String,
    // Weight is used only for Score plugins.
    pub weight: Option<i64>,
}

#[derive(Clone, Default, Debug, Deserialize, PartialEq)]
pub struct PluginArgs {
    #[serde(default)]
    pub resource_fungibility: ResourceFungibilityArgs,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ResourceFungibilityArgs {
    /// Pod label naming the model the pod serves.
    #[serde(default = "default_model_name_label_key")]
    pub model_name_label_key: String,
    /// Pod annotation with a comma separated subset of the model's flavors.
    #[serde(default = "default_flavors_annotation_key")]
    pub flavors_annotation_key: String,
}

impl Default for ResourceFungibilityArgs {
    fn default() -> Self {
        Self {
            model_name_label_key: default_model_name_label_key(),
            flavors_annotation_key: default_flavors_annotation_key(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_scheduler_name: default_scheduler_name(),
            parallelism: default_parallelism(),
            logs_filepath: None,
            output: None,
            profiles: vec![],
            plugin_args: Default::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }
}

fn default_scheduler_name() -> String {
    DEFAULT_SCHEDULER_NAME.to_string()
}

fn default_parallelism() -> usize {
    1
}

fn default_model_name_label_key() -> String {
    DEFAULT_MODEL_NAME_LABEL_KEY.to_string()
}

fn default_flavors_annotation_key() -> String {
    DEFAULT_FLAVORS_ANNOTATION_KEY.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_takes_defaults() {
        let config = SchedulerConfig::from_yaml("{}").unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(
            config.plugin_args.resource_fungibility.model_name_label_key,
            "llmaz.io/model-name"
        );
    }

    #[test]
    fn test_profiles_and_plugin_args() {
        let config = SchedulerConfig::from_yaml(
            r#"
        parallelism: 4
        profiles:
        - scheduler_name: inference_scheduler
          plugins:
            pre_filter:
            - name: ResourceFungibility
            filter:
            - name: ResourceFungibility
            score:
            - name: ResourceFungibility
              weight: 2
        plugin_args:
          resource_fungibility:
            model_name_label_key: example.com/model
        "#,
        )
        .unwrap();

        assert_eq!(config.parallelism, 4);
        assert_eq!(config.profiles.len(), 1);
        let plugins = &config.profiles[0].plugins;
        assert_eq!(plugins.pre_filter.len(), 1);
        assert!(plugins.pre_score.is_empty());
        assert_eq!(plugins.score[0].weight, Some(2));

        let args = &config.plugin_args.resource_fungibility;
        assert_eq!(args.model_name_label_key, "example.com/model");
        assert_eq!(args.flavors_annotation_key, DEFAULT_FLAVORS_ANNOTATION_KEY);
    }
}
