//! Persistence boundary. Each fully assembled record is handed over exactly
//! once; the sink decides the serialization.

use std::path::Path;

use async_trait::async_trait;
use tokio::{fs, fs::File, io::AsyncWriteExt, sync::Mutex};

use crate::record::PurchaseRecord;
use crate::Result;

/// Receives every finalized record. Called at most once per registry number
/// within a run.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn emit(&self, record: PurchaseRecord) -> Result<()>;
}

/// Appends one JSON object per line, in a shape a document store can ingest
/// directly keyed by `id`.
#[derive(Debug)]
pub struct JsonLinesSink {
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Opens `path` for appending, creating it when missing. Appending keeps
    /// earlier runs' records available for [`previously_emitted_ids`].
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = fs::OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(Self { file: Mutex::new(file) })
    }
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    async fn emit(&self, record: PurchaseRecord) -> Result<()> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        // Records must hit disk as they come; an interrupted run resumes
        // from whatever made it into the file.
        file.flush().await?;
        Ok(())
    }
}

/// Record ids found in an earlier run's output file, used to pre-seed the
/// seen-set so a restarted crawl skips detail fetches it already did.
/// A missing file is an empty history, not an error.
pub async fn previously_emitted_ids(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let text = match fs::read_to_string(path.as_ref()).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut ids = Vec::new();
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(value) => {
                if let Some(id) = value.get("id").and_then(|id| id.as_str()) {
                    ids.push(id.to_owned());
                }
            }
            Err(e) => tracing::warn!(error = %e, "skipping unreadable line in previous output"),
        }
    }
    Ok(ids)
}
