//! JSON file persistence shared by the record and mapping caches.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Where a cache keeps its flat JSON object between runs.
///
/// Loading and saving never fail the caller: problems are logged and the
/// cache carries on in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStore {
    path: Option<PathBuf>,
}

impl CacheStore {
    /// Persists to `path`.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Never touches disk.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self { path: None }
    }

    /// Persists to `path`, or nowhere when `path` is empty.
    #[must_use]
    pub fn from_setting(path: &Path) -> Self {
        if path.as_os_str().is_empty() {
            Self::ephemeral()
        } else {
            Self::file(path)
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads the stored map; an absent or unreadable file yields an empty map.
    pub async fn load<V: DeserializeOwned>(&self) -> HashMap<String, V> {
        let Some(path) = self.path.as_deref() else {
            return HashMap::new();
        };

        match tokio::fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, V>>(&bytes) {
                Ok(map) => {
                    debug!(path = %path.display(), entries = map.len(), "loaded cache");
                    map
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "cache file is not a JSON object; starting empty");
                    HashMap::new()
                }
            },
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no cache file yet");
                HashMap::new()
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to read cache file; starting empty");
                HashMap::new()
            }
        }
    }

    /// Replaces the stored map with `data`.
    ///
    /// The file is written to a sibling temp file and renamed into place, so a
    /// crash mid-write leaves the previous contents intact.
    pub async fn save<T: Serialize + Sync + ?Sized>(&self, data: &T) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        if let Err(error) = write_atomically(path, data).await {
            warn!(path = %path.display(), %error, "failed to persist cache");
        }
    }
}

async fn write_atomically<T: Serialize + Sync + ?Sized>(path: &Path, data: &T) -> io::Result<()> {
    let bytes = serde_json::to_vec(data)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
