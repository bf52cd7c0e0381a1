//! Local staging of credential material.
//!
//! Each account gets one directory under the staging root. The protocol
//! transport writes credential files into it while the link is live; the
//! upload sequence reads them back out; terminal teardown removes it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{CoreError, Result};
use crate::id::AccountId;

/// Filesystem area holding per-account credential material.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StagingArea { root: root.into() }
    }

    /// The staging directory for an account. Stable across attempts so a
    /// later pairing request can resume from still-staged credentials.
    pub fn dir_for(&self, account: &AccountId) -> PathBuf {
        self.root.join(account.as_str())
    }

    /// Ensure the account's staging directory exists.
    ///
    /// Returns the directory path and whether this call created it; a
    /// pre-existing directory may already hold resumable credentials and is
    /// never removed on a creation failure path.
    pub async fn ensure(&self, account: &AccountId) -> Result<(PathBuf, bool)> {
        let dir = self.dir_for(account);
        let existed = match fs::try_exists(&dir).await {
            Ok(existed) => existed,
            Err(source) => return Err(CoreError::Staging { path: dir, source }),
        };
        if !existed {
            fs::create_dir_all(&dir)
                .await
                .map_err(|source| CoreError::Staging {
                    path: dir.clone(),
                    source,
                })?;
        }
        Ok((dir, !existed))
    }
}

/// List the regular files currently staged in `dir`.
pub async fn staged_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let staging_err = |source| CoreError::Staging {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir).await.map_err(staging_err)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(staging_err)? {
        let file_type = entry.file_type().await.map_err(staging_err)?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Remove a staging directory and its contents. Already-absent is fine.
pub async fn remove_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CoreError::Staging {
            path: dir.to_path_buf(),
            source,
        }),
    }
}
