use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identifies one interactive client. Issued by the host, carried in a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActionKind {
    #[default]
    #[serde(rename = "create")]
    CreateOrEdit,
    #[serde(rename = "deploy")]
    Deploy,
    #[serde(rename = "version")]
    VersionInfo,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [
        ActionKind::CreateOrEdit,
        ActionKind::Deploy,
        ActionKind::VersionInfo,
    ];

    /// Value used in the `action` query parameter.
    pub fn slug(self) -> &'static str {
        match self {
            ActionKind::CreateOrEdit => "create",
            ActionKind::Deploy => "deploy",
            ActionKind::VersionInfo => "version",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActionKind::CreateOrEdit => "Create / Edit App",
            ActionKind::Deploy => "Deploy",
            ActionKind::VersionInfo => "Version Info",
        }
    }
}

impl FromStr for ActionKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.slug().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "action",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BumpComponent {
    Patch,
    Minor,
    Major,
}

impl BumpComponent {
    pub fn as_str(self) -> &'static str {
        match self {
            BumpComponent::Patch => "patch",
            BumpComponent::Minor => "minor",
            BumpComponent::Major => "major",
        }
    }
}

impl fmt::Display for BumpComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BumpComponent {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patch" => Ok(BumpComponent::Patch),
            "minor" => Ok(BumpComponent::Minor),
            "major" => Ok(BumpComponent::Major),
            _ => Err(UnknownVariant {
                kind: "version component",
                value: s.to_string(),
            }),
        }
    }
}
