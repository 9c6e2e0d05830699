//! Persistence for operator-confirmed mappings.
//!
//! Every save replaces the whole file: the document is written to a sibling temp
//! file, flushed to disk, then renamed over the target. Saves within this process
//! are serialized; other processes writing the same path are not coordinated.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Serializer, Value, ser::PrettyFormatter};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::{info, warn};

pub struct MappingStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl MappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the mapping file with `mappings`. Last write wins.
    pub async fn save(&self, mappings: &Value) -> io::Result<()> {
        let bytes = to_pretty_json(mappings)?;
        let tmp = temp_path(&self.path);

        let _guard = self.lock.lock().await;
        if let Err(err) = write_synced(&tmp, &bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err);
        }
        if let Err(err) = fs::rename(&tmp, &self.path).await {
            warn!(
                target: "api::mapping",
                path = %self.path.display(),
                error = %err,
                "rename failed, temp file removed"
            );
            let _ = fs::remove_file(&tmp).await;
            return Err(err);
        }

        info!(
            target: "api::mapping",
            path = %self.path.display(),
            bytes = bytes.len(),
            "mappings saved"
        );
        Ok(())
    }
}

/// Four-space indented JSON; non-ASCII text is written as UTF-8.
fn to_pretty_json(value: &Value) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser).map_err(io::Error::other)?;
    Ok(out)
}

fn temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mappings.json".into());
    target.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}
