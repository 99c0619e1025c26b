use anyhow::{Context, Result};
use async_trait::async_trait;
use collaborators::{VersionError, VersionStore};
use semver::Version;
use shared::domain::BumpComponent;
use std::{
    fs,
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tempfile::NamedTempFile;
use tracing::info;

pub const DEFAULT_INITIAL_VERSION: &str = "0.1.0";

/// Generated app files, one per user, kept in a single workspace directory.
#[derive(Debug, Clone)]
pub struct AppFiles {
    dir: PathBuf,
}

impl AppFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_name_for(user: &str) -> String {
        format!("{user}_app.py")
    }

    /// Resolves a user-supplied file name against the workspace directory.
    /// Absolute paths are used as given.
    pub fn resolve(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    pub fn exists(&self, file_name: &str) -> bool {
        self.resolve(file_name).is_file()
    }

    pub fn read_app(&self, user: &str) -> Result<Option<String>> {
        let path = self.resolve(&Self::file_name_for(user));
        match fs::read_to_string(&path) {
            Ok(source) => Ok(Some(source)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read app file '{}'", path.display()))
            }
        }
    }

    /// Replaces the user's app file. The previous file stays intact unless the
    /// new contents were fully written.
    pub fn write_app(&self, user: &str, source: &str) -> Result<PathBuf> {
        let path = self.resolve(&Self::file_name_for(user));
        write_atomic(&path, source.as_bytes())
            .with_context(|| format!("failed to write app file '{}'", path.display()))?;
        info!(path = %path.display(), bytes = source.len(), "app file written");
        Ok(path)
    }
}

/// Writes `contents` next to `path` and renames it into place.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Returns `version` with one component incremented and the lower ones reset.
/// Pre-release and build metadata are dropped. A component already at
/// `u64::MAX` is an error, never a wrap.
pub fn bump_version(version: &Version, component: BumpComponent) -> Result<Version, VersionError> {
    let overflow = || VersionError::Overflow {
        version: version.to_string(),
        component,
    };
    let next = match component {
        BumpComponent::Patch => Version::new(
            version.major,
            version.minor,
            version.patch.checked_add(1).ok_or_else(overflow)?,
        ),
        BumpComponent::Minor => Version::new(
            version.major,
            version.minor.checked_add(1).ok_or_else(overflow)?,
            0,
        ),
        BumpComponent::Major => {
            Version::new(version.major.checked_add(1).ok_or_else(overflow)?, 0, 0)
        }
    };
    Ok(next)
}

/// Plain-text semantic version kept in a single file.
pub struct FileVersionStore {
    path: PathBuf,
    initial: Version,
    write_lock: Mutex<()>,
}

impl FileVersionStore {
    pub fn new(path: impl Into<PathBuf>, initial: &str) -> Result<Self, VersionError> {
        let initial = parse_version(initial)?;
        Ok(Self {
            path: path.into(),
            initial,
            write_lock: Mutex::new(()),
        })
    }

    fn read(&self) -> Result<Version, VersionError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => parse_version(&raw),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(self.initial.clone()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: io::Error) -> VersionError {
        VersionError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

fn parse_version(raw: &str) -> Result<Version, VersionError> {
    let value = raw.trim();
    Version::parse(value).map_err(|source| VersionError::Parse {
        value: value.to_string(),
        source,
    })
}

#[async_trait]
impl VersionStore for FileVersionStore {
    async fn current_version(&self) -> Result<String, VersionError> {
        Ok(self.read()?.to_string())
    }

    async fn bump(&self, component: BumpComponent) -> Result<String, VersionError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = self.read()?;
        let next = bump_version(&current, component)?;
        write_atomic(&self.path, format!("{next}\n").as_bytes())
            .map_err(|source| self.io_error(source))?;
        info!(%current, %next, %component, "version bumped");
        Ok(next.to_string())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
