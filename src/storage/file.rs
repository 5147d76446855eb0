//! File-backed blob storage: one `.vault` file per principal.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use tokio::fs;

use super::BlobStorage;
use crate::errors::Result;

/// Stores blobs under `<dir>/<base64url(sha256(principal_id))>.vault`.
///
/// Hashing the id keeps arbitrary provider ids (emails, uids with
/// slashes) out of file names.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the blob file for `principal_id`.
    pub fn blob_path(&self, principal_id: &str) -> PathBuf {
        let digest = Sha256::digest(principal_id.as_bytes());
        self.dir
            .join(format!("{}.vault", URL_SAFE_NO_PAD.encode(digest)))
    }
}

#[async_trait]
impl BlobStorage for FileStorage {
    async fn read_blob(&self, principal_id: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.blob_path(principal_id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomic write: temp file in the same directory, then rename, so a
    /// reader never sees a half-written blob.
    async fn write_blob(&self, principal_id: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.blob_path(principal_id);
        let tmp_path = self.dir.join(format!(
            ".{}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));

        fs::write(&tmp_path, bytes).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}
