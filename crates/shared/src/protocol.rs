use serde::{Deserialize, Serialize};

use crate::domain::{ActionKind, BumpComponent};

/// Result of a successful create/edit: the file that was written and its contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedApp {
    pub file_name: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedApp {
    pub file_name: String,
    pub port: u16,
    pub url: String,
}

impl DeployedApp {
    pub fn new(file_name: impl Into<String>, port: u16) -> Self {
        Self {
            file_name: file_name.into(),
            port,
            url: format!("http://localhost:{port}"),
        }
    }

    pub fn success_message(&self) -> String {
        format!("App deployed on {}", self.url)
    }
}

/// One button press. Each variant maps to exactly one collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ActionRequest {
    Generate { prompt: String },
    Deploy { app_file: String },
    BumpVersion { component: BumpComponent },
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::Generate { .. } => ActionKind::CreateOrEdit,
            ActionRequest::Deploy { .. } => ActionKind::Deploy,
            ActionRequest::BumpVersion { .. } => ActionKind::VersionInfo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ActionOutcome {
    Generated(GeneratedApp),
    Deployed(DeployedApp),
    VersionBumped { version: String },
}
