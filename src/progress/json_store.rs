use crate::progress::{ProgressError, ProgressMap, ProgressStore};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

/// File name is versioned so a future record-shape change can migrate by
/// reading the old file and writing a new one.
const PROGRESS_FILE: &str = "progress_v1.json";

/// Watch state persisted as a single JSON document on disk.
///
/// A missing file is an empty map; an undecodable file is treated the same
/// way (with a warning) rather than blocking playback. Writes go through a
/// sibling temp file and rename so a crash mid-write cannot truncate the
/// previous state.
#[derive(Debug, Clone)]
pub struct JsonProgressStore {
    path: PathBuf,
}

impl JsonProgressStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location under the user's home directory.
    pub fn default_path() -> PathBuf {
        let home_dir = dirs::home_dir().expect("Failed to get home directory");
        home_dir.join(".matinee").join(PROGRESS_FILE)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Default for JsonProgressStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

#[async_trait::async_trait]
impl ProgressStore for JsonProgressStore {
    async fn load(&self) -> Result<ProgressMap, ProgressError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No progress file at {}, starting empty", self.path.display());
                return Ok(ProgressMap::new());
            }
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(map) => Ok(map),
            Err(err) => {
                warn!(
                    "Progress file {} is undecodable, starting empty: {}",
                    self.path.display(),
                    err
                );
                Ok(ProgressMap::new())
            }
        }
    }

    async fn save(&self, progress: &ProgressMap) -> Result<(), ProgressError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(progress)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(
            "Saved progress for {} videos to {}",
            progress.len(),
            self.path.display()
        );
        Ok(())
    }
}
