use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

use crate::error::{AssistantError, Result};

/// Namespace the API key is persisted under
pub const KEY_STORE_NAMESPACE: &str = "deepseek-storage";

/// Holds the single opaque API key for the completion service
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Current key, `None` if nothing is configured
    async fn get(&self) -> Result<Option<String>>;

    /// Replace the key; a blank key clears it
    async fn set(&self, key: &str) -> Result<()>;

    /// Forget the key
    async fn clear(&self) -> Result<()>;
}

fn normalize(key: &str) -> Option<String> {
    let key = key.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// In-memory key store, lost when the process exits
pub struct MemoryKeyStore {
    key: Arc<RwLock<Option<String>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self {
            key: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_key(key: &str) -> Self {
        Self {
            key: Arc::new(RwLock::new(normalize(key))),
        }
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get(&self) -> Result<Option<String>> {
        Ok(self.key.read().await.clone())
    }

    async fn set(&self, key: &str) -> Result<()> {
        *self.key.write().await = normalize(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.key.write().await = None;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredKey {
    api_key: Option<String>,
}

/// Key store persisted as JSON at `<root>/deepseek-storage.json`
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    /// Create a store under `root_dir`, creating the directory if needed
    pub async fn new(root_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root_dir).await?;
        Ok(Self {
            path: root_dir.join(format!("{}.json", KEY_STORE_NAMESPACE)),
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn write(&self, api_key: Option<String>) -> Result<()> {
        let data = serde_json::to_vec_pretty(&StoredKey { api_key })?;
        fs::write(&self.path, data)
            .await
            .map_err(|e| AssistantError::KeyStore {
                message: format!("Failed to write {}: {}", self.path.display(), e),
            })
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn get(&self) -> Result<Option<String>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AssistantError::KeyStore {
                    message: format!("Failed to read {}: {}", self.path.display(), e),
                })
            }
        };

        let stored: StoredKey = serde_json::from_slice(&data)?;
        Ok(stored.api_key.as_deref().and_then(normalize))
    }

    async fn set(&self, key: &str) -> Result<()> {
        self.write(normalize(key)).await
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AssistantError::KeyStore {
                message: format!("Failed to remove {}: {}", self.path.display(), e),
            }),
        }
    }
}
