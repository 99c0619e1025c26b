use std::path::Path;

use async_trait::async_trait;
use shared::domain::BumpComponent;
use thiserror::Error;

pub mod deploy;
pub mod generation;

pub use deploy::{DeployerSettings, ProcessDeployer};
pub use generation::{
    strip_code_fences, OfflineGenerator, OpenAiGenerator, OpenAiSettings, UnavailableGenerator,
};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend is not configured: {0}")]
    NotConfigured(String),
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("generation backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation backend returned no content")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("no free port found starting at {start} after {attempts} attempts")]
    NoFreePort { start: u16, attempts: u16 },
    #[error("failed to launch '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("failed to access version file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid version '{value}': {source}")]
    Parse {
        value: String,
        #[source]
        source: semver::Error,
    },
    #[error("cannot bump {component} of {version}: the component is already at its maximum")]
    Overflow {
        version: String,
        component: BumpComponent,
    },
}

/// Turns a free-text prompt into the source of a single-file app.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Launches an app file and reports the local port it listens on.
#[async_trait]
pub trait AppDeployer: Send + Sync {
    async fn deploy(&self, app_path: &Path) -> Result<u16, DeployError>;
}

#[async_trait]
pub trait VersionStore: Send + Sync {
    async fn current_version(&self) -> Result<String, VersionError>;
    /// Bumps one component and returns the new version string.
    async fn bump(&self, component: BumpComponent) -> Result<String, VersionError>;
}
