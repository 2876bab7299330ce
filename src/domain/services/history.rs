#[cfg(test)]
#[path = "history_test.rs"]
mod tests;

use std::io;
use std::path;

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::GeneratedImage;
use crate::domain::models::StoredImage;
use crate::domain::services::codec;

/// Outcome of one write attempt against the bounded history file.
enum WriteError {
    /// The serialized document is larger than the configured byte budget.
    QuotaExceeded,
    Io(io::Error),
}

/// Bounded, persisted, most-recent-first list of past generations. Saving
/// and loading never fail the caller: persistence is best-effort and the
/// user's generation result is never at stake.
pub struct History {
    pub cache_file: path::PathBuf,
    limit: usize,
    quota_bytes: usize,
}

impl Default for History {
    fn default() -> History {
        let cache_file = dirs::cache_dir().unwrap().join("atelier/history.json");

        return History::new(
            cache_file,
            Config::get(ConfigKey::HistoryLimit).parse().unwrap_or(8),
            Config::get(ConfigKey::HistoryQuotaBytes)
                .parse()
                .unwrap_or(5 * 1024 * 1024),
        );
    }
}

impl History {
    pub fn new(cache_file: path::PathBuf, limit: usize, quota_bytes: usize) -> History {
        return History {
            cache_file,
            limit,
            quota_bytes,
        };
    }

    /// Persists the first `limit` entries. When the document does not fit
    /// the byte budget, the oldest retained entry is evicted and the write
    /// retried until it fits; when not even one entry fits, the persisted
    /// state is cleared.
    pub async fn save(&self, history: &[GeneratedImage]) {
        let mut stored = history
            .iter()
            .take(self.limit)
            .map(|image| {
                return StoredImage {
                    id: image.id.clone(),
                    prompt: image.prompt.clone(),
                    base64: codec::blob_to_base64(&image.blob),
                    mime_type: image.blob.mime_type.clone(),
                };
            })
            .collect::<Vec<StoredImage>>();

        loop {
            let payload = match serde_json::to_string(&stored) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::error!(error = ?err, "failed to serialize history");
                    return;
                }
            };

            match self.write_checked(&payload).await {
                Ok(()) => return,
                Err(WriteError::QuotaExceeded) => {
                    if stored.len() > 1 {
                        stored.pop();
                        continue;
                    }

                    tracing::warn!(
                        quota_bytes = self.quota_bytes,
                        "not even one history entry fits the quota, clearing"
                    );
                    self.clear().await;
                    return;
                }
                Err(WriteError::Io(err)) => {
                    tracing::error!(error = ?err, "failed to persist history");
                    return;
                }
            }
        }
    }

    /// Reads the persisted history back. A missing file is an empty
    /// history; an unparseable document is discarded entirely so the next
    /// save starts clean; an entry with undecodable image data is dropped
    /// without affecting its neighbors.
    pub async fn load(&self) -> Vec<GeneratedImage> {
        if !self.cache_file.exists() {
            return vec![];
        }

        let payload = match fs::read_to_string(&self.cache_file).await {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(error = ?err, "failed to read history file");
                return vec![];
            }
        };

        let stored: Vec<StoredImage> = match serde_json::from_str(&payload) {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(error = ?err, "history file is corrupt, discarding it");
                self.clear().await;
                return vec![];
            }
        };

        return stored
            .into_iter()
            .filter_map(|item| {
                match codec::base64_to_blob(&item.base64, &item.mime_type) {
                    Ok(blob) => {
                        return Some(GeneratedImage {
                            id: item.id,
                            url: codec::data_url(&blob),
                            blob,
                            prompt: item.prompt,
                        });
                    }
                    Err(err) => {
                        tracing::warn!(id = item.id, error = ?err, "dropping undecodable history entry");
                        return None;
                    }
                }
            })
            .collect::<Vec<GeneratedImage>>();
    }

    pub async fn clear(&self) {
        if !self.cache_file.exists() {
            return;
        }

        if let Err(err) = fs::remove_file(&self.cache_file).await {
            tracing::error!(error = ?err, "failed to clear history file");
        }
    }

    /// Enforces the byte budget, then writes through a temp file so readers
    /// never observe a half-written document.
    async fn write_checked(&self, payload: &str) -> Result<(), WriteError> {
        if payload.len() > self.quota_bytes {
            return Err(WriteError::QuotaExceeded);
        }

        if let Some(parent) = self.cache_file.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(WriteError::Io)?;
            }
        }

        let tmp_file = self.cache_file.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_file).await.map_err(WriteError::Io)?;
        file.write_all(payload.as_bytes())
            .await
            .map_err(WriteError::Io)?;

        fs::rename(&tmp_file, &self.cache_file)
            .await
            .map_err(WriteError::Io)?;

        return Ok(());
    }
}
