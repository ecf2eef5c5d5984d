use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// Identifiers of entries that have already been delivered.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeenSet {
    ids: BTreeSet<String>,
}

impl SeenSet {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns `true` if `id` was not seen before.
    pub fn insert(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SeenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self { ids: iter.into_iter().map(Into::into).collect() }
    }
}

#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Never fails: unreadable state is logged and treated as empty.
    async fn load(&self) -> SeenSet;
    /// Overwrites the persisted state with the full set.
    async fn save(&self, seen: &SeenSet) -> Result<()>;
}

/// Seen-set checkpoint stored as a JSON array of strings.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "seen.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SeenStore for JsonFileStore {
    async fn load(&self) -> SeenSet {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No seen file yet, starting empty");
                return SeenSet::default();
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to read seen file, starting fresh");
                return SeenSet::default();
            }
        };

        match serde_json::from_str::<Vec<String>>(&content) {
            Ok(ids) => {
                let seen: SeenSet = ids.into_iter().collect();
                tracing::info!(path = %self.path.display(), count = seen.len(), "Loaded seen entries");
                seen
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Seen file is corrupt, starting fresh");
                SeenSet::default()
            }
        }
    }

    async fn save(&self, seen: &SeenSet) -> Result<()> {
        let ids: Vec<&str> = seen.iter().collect();
        let content = serde_json::to_string_pretty(&ids).context("failed to serialize seen set")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("failed to write seen file: {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace seen file: {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), count = seen.len(), "Saved seen entries");
        Ok(())
    }
}
