//! Audit stores
//!
//! Records are written once and never rewritten. The filesystem layout is
//! `<root>/<decisionId>/<requestId>.json`, so every evaluation of the same
//! decision lands in the same directory. A request id that is reused, or that
//! sanitizes to an existing file name, gets a numeric suffix
//! (`<requestId>.1.json`, `<requestId>.2.json`, ...).

use crate::error::{PersistError, StoreError};
use async_trait::async_trait;
use north_policy::{AuditRecord, DecisionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;

/// Where a record ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistReceipt {
    pub decision_id: DecisionId,
    pub location: String,
}

/// Append-only sink for audit records
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist one record
    async fn persist(&self, record: &AuditRecord) -> Result<PersistReceipt, PersistError>;

    /// Every stored document as raw JSON. Documents that are not valid JSON
    /// are skipped; schema checks are left to the reader.
    async fn load_all(&self) -> Result<Vec<Value>, StoreError>;
}

/// Keep request ids from escaping the decision directory
fn file_stem(request_id: &str) -> String {
    let stem: String = request_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.is_empty() || stem.starts_with('.') {
        format!("_{}", stem)
    } else {
        stem
    }
}

/// Suffixed names tried before a write is rejected
const MAX_DUPLICATES: usize = 1000;

/// Stores records as JSON files under a root directory
#[derive(Debug, Clone)]
pub struct FsAuditStore {
    root: PathBuf,
}

impl FsAuditStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a record is written to when no earlier file holds that name
    pub fn path_for(&self, record: &AuditRecord) -> PathBuf {
        self.root
            .join(record.decision_id.as_str())
            .join(format!("{}.json", file_stem(&record.request_id)))
    }

    async fn write(&self, record: &AuditRecord) -> Result<PathBuf, StoreError> {
        let dir = self.root.join(record.decision_id.as_str());
        fs::create_dir_all(&dir).await?;
        let body = serde_json::to_vec_pretty(record)?;
        let stem = file_stem(&record.request_id);

        for attempt in 0..=MAX_DUPLICATES {
            let name = match attempt {
                0 => format!("{}.json", stem),
                n => format!("{}.{}.json", stem, n),
            };
            let path = dir.join(name);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            };
            file.write_all(&body).await?;
            file.flush().await?;
            return Ok(path);
        }

        Err(StoreError::Rejected(format!(
            "more than {} records for request {} under decision {}",
            MAX_DUPLICATES, record.request_id, record.decision_id
        )))
    }

    async fn json_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut decisions = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut files = Vec::new();
        while let Some(decision) = decisions.next_entry().await? {
            if !decision.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(decision.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    files.push(path);
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl AuditStore for FsAuditStore {
    async fn persist(&self, record: &AuditRecord) -> Result<PersistReceipt, PersistError> {
        let path = self
            .write(record)
            .await
            .map_err(|source| PersistError::new(record.decision_id.clone(), source))?;

        Ok(PersistReceipt {
            decision_id: record.decision_id.clone(),
            location: path.display().to_string(),
        })
    }

    async fn load_all(&self) -> Result<Vec<Value>, StoreError> {
        let mut documents = Vec::new();
        for path in self.json_files().await? {
            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => documents.push(value),
                Err(err) => debug!(path = %path.display(), error = %err, "skipping unreadable audit file"),
            }
        }
        Ok(documents)
    }
}

/// In-process store, mostly for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    documents: RwLock<Vec<Value>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Add a raw document, as if some other writer had produced it
    pub async fn insert_raw(&self, document: Value) {
        self.documents.write().await.push(document);
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn persist(&self, record: &AuditRecord) -> Result<PersistReceipt, PersistError> {
        let document = serde_json::to_value(record)
            .map_err(|source| PersistError::new(record.decision_id.clone(), source))?;

        let mut documents = self.documents.write().await;
        documents.push(document);

        Ok(PersistReceipt {
            decision_id: record.decision_id.clone(),
            location: format!("memory://{}", record.relative_path()),
        })
    }

    async fn load_all(&self) -> Result<Vec<Value>, StoreError> {
        Ok(self.documents.read().await.clone())
    }
}
