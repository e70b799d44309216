//! Local sync metadata.
//!
//! A local folder kept in sync with a remote one carries a `.girder_metadata`
//! file: a JSON object mapping item ids to the item documents as they were when
//! last downloaded. An item whose current document is identical is not
//! downloaded again.

use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::client::ClientError;

pub const METADATA_FILE_NAME: &str = ".girder_metadata";

pub type SyncMetadata = BTreeMap<String, Value>;

pub fn metadata_file_path(dest: &Path) -> PathBuf {
    dest.join(METADATA_FILE_NAME)
}

/// Read the metadata stored under `dest`. Returns `None` when there is none yet.
pub async fn load(dest: &Path) -> Result<Option<SyncMetadata>, ClientError> {
    let path = metadata_file_path(dest);
    trace!("Reading sync metadata from {}", path.display());

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No sync metadata at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(ClientError::Io(e)),
    };

    Ok(Some(serde_json::from_str(&content)?))
}

/// Write `metadata` under `dest`, creating the folder if needed.
pub async fn save(dest: &Path, metadata: &SyncMetadata) -> Result<(), ClientError> {
    tokio::fs::create_dir_all(dest).await?;

    let path = metadata_file_path(dest);
    debug!(
        "Writing sync metadata for {} items to {}",
        metadata.len(),
        path.display()
    );
    tokio::fs::write(&path, serde_json::to_vec(metadata)?).await?;
    Ok(())
}
