use std::path::{Path, PathBuf};

use collaborators::{DeployerSettings, OpenAiSettings};
use config::{Config, ConfigError as SourceError, File, FileFormat, Value, ValueKind};
use storage::DEFAULT_INITIAL_VERSION;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "production.json";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin123";
pub const DEFAULT_VERSION_FILE: &str = "version.txt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file '{}' not found.", path.display())]
    Missing { path: PathBuf },
    #[error("Config file '{}' is invalid: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: SourceError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    OpenAi,
    Offline,
}

/// The JSON configuration document, loaded once and read-only afterwards.
/// Lookups take dotted keys (`developer.username`) and fall back to defaults.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    source: Config,
    path: PathBuf,
}

impl EditorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(ConfigError::Missing { path });
        }
        let source = Config::builder()
            .add_source(File::from(path.as_path()).format(FileFormat::Json))
            .build()
            .map_err(|source| ConfigError::Invalid {
                path: path.clone(),
                source,
            })?;
        Ok(Self { source, path })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let path = PathBuf::from("<inline>");
        let source = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Json))
            .build()
            .map_err(|source| ConfigError::Invalid {
                path: path.clone(),
                source,
            })?;
        Ok(Self { source, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.source
            .get_string(key)
            .unwrap_or_else(|_| default.to_string())
    }

    pub fn optional_string(&self, key: &str) -> Option<String> {
        self.source
            .get_string(key)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }

    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        self.source.get_int(key).unwrap_or(default)
    }

    /// Expected login pair. A missing key takes its default; a value that is
    /// not a JSON string comes back as `None` and matches no submitted input.
    pub fn credentials(&self) -> (Option<String>, Option<String>) {
        (
            self.credential("developer.username", DEFAULT_USERNAME),
            self.credential("developer.password", DEFAULT_PASSWORD),
        )
    }

    fn credential(&self, key: &str, default: &str) -> Option<String> {
        match self.source.get::<Value>(key) {
            Ok(value) => match value.kind {
                ValueKind::String(value) => Some(value),
                _ => None,
            },
            Err(SourceError::NotFound(_)) => Some(default.to_string()),
            Err(_) => None,
        }
    }

    pub fn generator_kind(&self) -> GeneratorKind {
        match self
            .string_or("generation.provider", "openai")
            .to_ascii_lowercase()
            .as_str()
        {
            "offline" => GeneratorKind::Offline,
            _ => GeneratorKind::OpenAi,
        }
    }

    /// `env_api_key` is used when the document carries no `generation.api_key`.
    pub fn openai_settings(&self, env_api_key: Option<String>) -> OpenAiSettings {
        let defaults = OpenAiSettings::default();
        OpenAiSettings {
            api_key: self
                .optional_string("generation.api_key")
                .or(env_api_key)
                .unwrap_or_default(),
            model: self.string_or("generation.model", &defaults.model),
            base_url: self.string_or("generation.base_url", &defaults.base_url),
            max_tokens: self
                .source
                .get_int("generation.max_tokens")
                .ok()
                .and_then(|value| u32::try_from(value).ok()),
        }
    }

    pub fn deployer_settings(&self) -> DeployerSettings {
        let defaults = DeployerSettings::default();
        DeployerSettings {
            command: self.string_or("deploy.command", &defaults.command),
            base_port: u16::try_from(self.int_or("deploy.base_port", defaults.base_port.into()))
                .unwrap_or(defaults.base_port),
            max_port_attempts: u16::try_from(self.int_or(
                "deploy.max_port_attempts",
                defaults.max_port_attempts.into(),
            ))
            .unwrap_or(defaults.max_port_attempts),
        }
    }

    pub fn version_file(&self) -> PathBuf {
        PathBuf::from(self.string_or("versioning.file", DEFAULT_VERSION_FILE))
    }

    pub fn initial_version(&self) -> String {
        self.string_or("versioning.initial", DEFAULT_INITIAL_VERSION)
    }

    pub fn workspace_dir(&self) -> PathBuf {
        PathBuf::from(self.string_or("workspace.dir", "."))
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
