// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Hive Configuration Types
//
// Defines the configuration schema for a Hive node:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Swarm capacity limits (agents per swarm, swarms per agent, tasks per swarm, swarm count)
// - Task manager sizing (worker pool, queue bound)
// - Logging settings consumed by the CLI host

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "100monkeys.ai/v1";
pub const KIND: &str = "HiveConfig";

/// Top-level Kubernetes-style configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiveConfigManifest {
    /// API version (must be "100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "HiveConfig")
    pub kind: String,

    /// Node metadata (name, labels)
    pub metadata: ManifestMetadata,

    /// Configuration specification
    #[serde(default)]
    pub spec: HiveConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable node name
    pub name: String,

    /// Optional: Labels for categorization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HiveConfigSpec {
    /// Swarm capacity limits
    #[serde(default)]
    pub swarm: SwarmConfig,

    /// Task manager sizing
    #[serde(default)]
    pub tasks: TaskManagerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmConfig {
    /// Maximum member agents in a single swarm
    #[serde(default = "default_max_agents_per_swarm")]
    pub max_agents_per_swarm: usize,

    /// Maximum swarms a single agent may belong to
    #[serde(default = "default_max_swarms_per_agent")]
    pub max_swarms_per_agent: usize,

    /// Maximum swarm tasks assigned to a single swarm
    #[serde(default = "default_max_tasks_per_swarm")]
    pub max_tasks_per_swarm: usize,

    /// Maximum live swarm instances
    #[serde(default = "default_max_swarms")]
    pub max_swarms: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskManagerConfig {
    /// Size of the worker pool
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Bound of the pending task queue
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_max_agents_per_swarm() -> usize {
    10
}

fn default_max_swarms_per_agent() -> usize {
    5
}

fn default_max_tasks_per_swarm() -> usize {
    20
}

fn default_max_swarms() -> usize {
    10
}

fn default_max_workers() -> usize {
    5
}

fn default_max_queue_size() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            max_agents_per_swarm: default_max_agents_per_swarm(),
            max_swarms_per_agent: default_max_swarms_per_agent(),
            max_tasks_per_swarm: default_max_tasks_per_swarm(),
            max_swarms: default_max_swarms(),
        }
    }
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            max_queue_size: default_max_queue_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for HiveConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "hive-node".to_string(),
                labels: None,
            },
            spec: HiveConfigSpec::default(),
        }
    }
}

impl HiveConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        std::fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Well-known config file locations, in precedence order:
    /// 1. ./hive-config.yaml (working directory)
    /// 2. ~/.hive/config.yaml (user home)
    /// 3. /etc/hive/config.yaml (system, Unix) or C:\ProgramData\Hive\config.yaml (Windows)
    pub fn discovery_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./hive-config.yaml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".hive").join("config.yaml"));
        }
        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/hive/config.yaml"));
        #[cfg(windows)]
        paths.push(PathBuf::from("C:\\ProgramData\\Hive\\config.yaml"));
        paths
    }

    /// Discover configuration file: HIVE_CONFIG_PATH first, then the first
    /// existing entry of [`Self::discovery_paths`].
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("HIVE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        Self::discovery_paths().into_iter().find(|path| path.exists())
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // 1. Explicit CLI path (Fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        // 2. Discovery (Env -> Cwd -> Home -> System)
        let mut config = if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to override config via env vars
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the process environment in production)
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let targets: [(&str, &mut usize); 4] = [
            ("HIVE_MAX_WORKERS", &mut self.spec.tasks.max_workers),
            ("HIVE_MAX_QUEUE_SIZE", &mut self.spec.tasks.max_queue_size),
            ("HIVE_MAX_SWARMS", &mut self.spec.swarm.max_swarms),
            ("HIVE_MAX_AGENTS_PER_SWARM", &mut self.spec.swarm.max_agents_per_swarm),
        ];

        for (key, target) in targets {
            let Some(val) = lookup(key) else {
                continue;
            };
            match val.trim().parse::<usize>() {
                Ok(parsed) if parsed > 0 => {
                    tracing::info!("Environment override: {}={}", key, parsed);
                    *target = parsed;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for {}: '{}'. Expected a positive integer. Ignoring.",
                        key,
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let swarm = &self.spec.swarm;
        let limits = [
            ("spec.swarm.maxAgentsPerSwarm", swarm.max_agents_per_swarm),
            ("spec.swarm.maxSwarmsPerAgent", swarm.max_swarms_per_agent),
            ("spec.swarm.maxTasksPerSwarm", swarm.max_tasks_per_swarm),
            ("spec.swarm.maxSwarms", swarm.max_swarms),
            ("spec.tasks.maxWorkers", self.spec.tasks.max_workers),
            ("spec.tasks.maxQueueSize", self.spec.tasks.max_queue_size),
        ];
        for (field, value) in limits {
            if value == 0 {
                anyhow::bail!("{} must be greater than zero", field);
            }
        }

        match self.spec.observability.logging.format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("Invalid log format '{}'. Expected 'text' or 'json'", other),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = HiveConfigManifest::default();
        assert_eq!(manifest.api_version, "100monkeys.ai/v1");
        assert_eq!(manifest.kind, "HiveConfig");
        assert_eq!(manifest.spec.swarm.max_agents_per_swarm, 10);
        assert_eq!(manifest.spec.swarm.max_swarms_per_agent, 5);
        assert_eq!(manifest.spec.swarm.max_tasks_per_swarm, 20);
        assert_eq!(manifest.spec.swarm.max_swarms, 10);
        assert_eq!(manifest.spec.tasks.max_workers, 5);
        assert_eq!(manifest.spec.tasks.max_queue_size, 100);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_discovery_paths_precedence() {
        let paths = HiveConfigManifest::discovery_paths();
        assert_eq!(paths[0], PathBuf::from("./hive-config.yaml"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(paths[1], home.join(".hive").join("config.yaml"));
        }
        #[cfg(unix)]
        assert_eq!(paths.last(), Some(&PathBuf::from("/etc/hive/config.yaml")));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
apiVersion: 100monkeys.ai/v1
kind: HiveConfig
metadata:
  name: test-node
spec:
  swarm:
    maxAgentsPerSwarm: 2
  tasks:
    maxQueueSize: 8
"#;
        let manifest = HiveConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.metadata.name, "test-node");
        assert_eq!(manifest.spec.swarm.max_agents_per_swarm, 2);
        assert_eq!(manifest.spec.swarm.max_swarms_per_agent, 5);
        assert_eq!(manifest.spec.tasks.max_queue_size, 8);
        assert_eq!(manifest.spec.tasks.max_workers, 5);
        assert_eq!(manifest.spec.observability.logging.level, "info");
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hive-config.yaml");

        let mut manifest = HiveConfigManifest::default();
        manifest.metadata.name = "roundtrip".to_string();
        manifest.spec.tasks.max_workers = 3;
        manifest.to_yaml_file(&path).unwrap();

        let parsed = HiveConfigManifest::from_yaml_file(&path).unwrap();
        assert_eq!(parsed.metadata.name, "roundtrip");
        assert_eq!(parsed.spec.tasks.max_workers, 3);
        assert_eq!(parsed.spec.swarm, SwarmConfig::default());
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(HiveConfigManifest::load_or_default(Some(missing)).is_err());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let mut manifest = HiveConfigManifest::default();
        manifest.apply_overrides_from(|key| match key {
            "HIVE_MAX_WORKERS" => Some("12".to_string()),
            "HIVE_MAX_QUEUE_SIZE" => Some("not-a-number".to_string()),
            "HIVE_MAX_SWARMS" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(manifest.spec.tasks.max_workers, 12);
        assert_eq!(manifest.spec.tasks.max_queue_size, 100);
        assert_eq!(manifest.spec.swarm.max_swarms, 10);
    }

    #[test]
    fn test_validation() {
        let mut manifest = HiveConfigManifest::default();
        assert!(manifest.validate().is_ok());

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.metadata.name = "".to_string();
        assert!(manifest.validate().is_err());
        manifest.metadata.name = "test-node".to_string();

        manifest.spec.tasks.max_workers = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.tasks.max_workers = 1;

        manifest.spec.observability.logging.format = "xml".to_string();
        assert!(manifest.validate().is_err());
    }
}
