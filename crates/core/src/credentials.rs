//! Per-(identity, platform) cookie storage for authenticated downloads.
//!
//! Credentials are Netscape-format cookie files on disk, one file per
//! `(platform, identity)` key. A file is only ever replaced atomically and
//! only after the new payload validates, so a bad upload can never clobber
//! a working credential.

use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use crate::platform::Platform;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Invalid cookie payload: expected Netscape cookie format")]
    InvalidFormat,

    #[error("Credential storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An entry reported by [`CredentialStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    pub platform: String,
    pub identity: String,
    pub path: PathBuf,
}

/// Filesystem-backed credential store.
///
/// Shared across workers; mutation is serialized per key by the atomic
/// rename, and keys never collide across identities.
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Open (and create if missing) the store directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn file_path(&self, identity: &str, platform: Platform) -> PathBuf {
        self.dir.join(format!("{}_{}.txt", platform.as_str(), identity))
    }

    /// Validate and store a cookie payload for `(identity, platform)`.
    ///
    /// An existing credential is replaced atomically; an invalid payload is
    /// rejected and leaves any prior credential untouched.
    pub async fn save(
        &self,
        identity: &str,
        platform: Platform,
        payload: &[u8],
    ) -> Result<PathBuf, CredentialError> {
        if !validate_cookie_payload(payload) {
            return Err(CredentialError::InvalidFormat);
        }

        let dest = self.file_path(identity, platform);
        let tmp = dest.with_extension("tmp");
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &dest).await?;

        info!(identity, platform = %platform, "credential saved");
        Ok(dest)
    }

    /// Path of the stored credential, if one exists.
    pub async fn lookup(&self, identity: &str, platform: Platform) -> Option<PathBuf> {
        let path = self.file_path(identity, platform);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(path),
            _ => None,
        }
    }

    /// Delete the credential for `(identity, platform)`.
    ///
    /// Idempotent: deleting a missing credential returns `Ok(false)`.
    pub async fn delete(&self, identity: &str, platform: Platform) -> Result<bool, CredentialError> {
        let path = self.file_path(identity, platform);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(identity, platform = %platform, "credential deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List stored credentials, optionally filtered by identity.
    pub async fn list(&self, identity: Option<&str>) -> Result<Vec<CredentialEntry>, CredentialError> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".txt") else { continue };
            let Some((platform, id)) = stem.split_once('_') else { continue };

            if identity.is_none_or(|want| want == id) {
                entries.push(CredentialEntry {
                    platform: platform.to_string(),
                    identity: id.to_string(),
                    path: entry.path(),
                });
            }
        }

        Ok(entries)
    }
}

/// Netscape cookie format check: either the explicit header marker or at
/// least one data line with the full 7 tab-separated fields.
fn validate_cookie_payload(payload: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(payload) else {
        return false;
    };

    if text.contains("# Netscape HTTP Cookie File") {
        return true;
    }

    text.lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|line| line.split('\t').count() >= 7)
}
