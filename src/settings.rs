use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use crate::models::UserProfile;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredSettings {
    #[serde(default)]
    profile: UserProfile,
}

/// Caller profile backed by an optional JSON file. Without a path it lives in memory only.
pub struct ProfileStore {
    path: Option<PathBuf>,
    data: RwLock<StoredSettings>,
}

impl ProfileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            read_settings(&path)?
        } else {
            StoredSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn in_memory(profile: UserProfile) -> Self {
        Self {
            path: None,
            data: RwLock::new(StoredSettings { profile }),
        }
    }

    pub fn profile(&self) -> UserProfile {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .profile
            .clone()
    }

    pub fn update(&self, profile: UserProfile) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.profile = profile;
        self.persist(&guard)
    }

    /// Re-reads the file so edits made by another process are picked up.
    /// Keeps the current profile when there is no file yet.
    pub fn reload(&self) -> Result<()> {
        let Some(path) = self.path.as_deref().filter(|path| path.exists()) else {
            return Ok(());
        };
        let data = read_settings(path)?;
        *self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = data;
        Ok(())
    }

    fn persist(&self, data: &StoredSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write profile to {}", path.display()))
    }
}

fn read_settings(path: &Path) -> Result<StoredSettings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse profile in {}", path.display()))
}
