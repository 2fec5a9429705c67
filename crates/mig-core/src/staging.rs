//! File-backed staging area
//!
//! Converted documents can be written to disk for review before a batch
//! import. Layout under the base directory:
//!
//! ```text
//! {base}/{project}/{type}/{id}/{ordinal}_{kind}_{key}.json   one per plan entry
//! {base}/{project}_{type}_{id}.json                           merged array
//! ```
//!
//! `{type}`/`{id}` name the root resource of the plan. The ordinal keeps
//! plan order. Project ids and keys must be single path components; `..`,
//! empty names and names containing a separator are rejected.

use crate::error::{MigrationError, Result};
use mig_types::{ImportDocument, ResourceKey, ResourceKind, ResourceRef};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One staged import document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedDocument {
    /// Resource kind
    pub kind: ResourceKind,
    /// Key the resource is imported under
    pub key: ResourceKey,
    /// Converted document
    pub document: ImportDocument,
}

impl StagedDocument {
    /// Stage a converted document
    #[inline]
    #[must_use]
    pub fn new(key: ResourceKey, document: ImportDocument) -> Self {
        Self {
            kind: document.kind(),
            key,
            document,
        }
    }

    /// Resource reference
    #[inline]
    #[must_use]
    pub fn resource(&self) -> ResourceRef {
        ResourceRef::new(self.kind, self.key.clone())
    }
}

/// Staging directory tree
#[derive(Debug, Clone)]
pub struct StagingArea {
    base_dir: PathBuf,
}

impl StagingArea {
    /// Staging area rooted at `base_dir`
    #[inline]
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Base directory
    #[inline]
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding the per-entry files of one plan
    ///
    /// # Errors
    /// `Config` if the project id or the root key is not a plain file name
    pub fn entry_dir(&self, project_id: &str, root: &ResourceRef) -> Result<PathBuf> {
        Ok(self
            .base_dir
            .join(path_component(project_id)?)
            .join(root.kind.as_str())
            .join(path_component(root.key.as_str())?))
    }

    /// Path of the merged file of one plan
    ///
    /// # Errors
    /// `Config` if the project id or the root key is not a plain file name
    pub fn merged_path(&self, project_id: &str, root: &ResourceRef) -> Result<PathBuf> {
        Ok(self.base_dir.join(format!(
            "{}_{}_{}.json",
            path_component(project_id)?,
            root.kind.as_str(),
            path_component(root.key.as_str())?
        )))
    }

    /// Remove previously staged entry files of one plan
    ///
    /// # Errors
    /// `Config` on an unusable path component, `Staging` on I/O failure
    /// other than a missing directory
    pub async fn clear(&self, project_id: &str, root: &ResourceRef) -> Result<()> {
        let dir = self.entry_dir(project_id, root)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MigrationError::Staging { path: dir, source }),
        }
    }

    /// Write one entry file
    ///
    /// # Errors
    /// `Config` on an unusable path component, `Staging` on I/O failure
    pub async fn stage(&self, project_id: &str, root: &ResourceRef, ordinal: usize, doc: &StagedDocument) -> Result<PathBuf> {
        let dir = self.entry_dir(project_id, root)?;
        let name = format!(
            "{:04}_{}_{}.json",
            ordinal,
            doc.kind.as_str(),
            path_component(doc.key.as_str())?
        );
        tokio::fs::create_dir_all(&dir).await.map_err(|source| MigrationError::Staging {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(name);
        write_json(&path, doc).await?;
        tracing::debug!("Staged {} at {}", doc.resource(), path.display());
        Ok(path)
    }

    /// Merge all entry files of one plan into a single array file
    ///
    /// Entries are merged by their numeric ordinal, which is plan order.
    /// Files without an ordinal prefix are ignored.
    ///
    /// # Errors
    /// `Config` on an unusable path component, `Staging` on I/O failure,
    /// `StagedFormat` if an entry file is malformed
    pub async fn merge(&self, project_id: &str, root: &ResourceRef) -> Result<PathBuf> {
        let dir = self.entry_dir(project_id, root)?;
        let merged = self.merged_path(project_id, root)?;
        let io_err = |source: std::io::Error| MigrationError::Staging {
            path: dir.clone(),
            source,
        };

        tokio::fs::create_dir_all(&dir).await.map_err(io_err)?;
        let mut entries = Vec::new();
        let mut listing = tokio::fs::read_dir(&dir).await.map_err(io_err)?;
        while let Some(entry) = listing.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            match ordinal_of(&path) {
                Some(ordinal) => entries.push((ordinal, path)),
                None => tracing::debug!("Ignoring {} while merging", path.display()),
            }
        }
        entries.sort();

        let mut docs = Vec::with_capacity(entries.len());
        for (_, path) in &entries {
            docs.push(read_json::<StagedDocument>(path).await?);
        }

        write_json(&merged, &docs).await?;
        tracing::info!("Merged {} staged documents into {}", docs.len(), merged.display());
        Ok(merged)
    }

    /// Read a merged file back
    ///
    /// # Errors
    /// `Staging` on I/O failure, `StagedFormat` if the file is malformed
    pub async fn load(&self, path: &Path) -> Result<Vec<StagedDocument>> {
        read_json(path).await
    }
}

/// Accept a value as a single path component
fn path_component(value: &str) -> Result<&str> {
    let plain = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '\0']);
    if plain {
        Ok(value)
    } else {
        Err(MigrationError::config(format!("{value:?} cannot be used as a staging path component")))
    }
}

/// Leading `{ordinal}_` of an entry file name
fn ordinal_of(path: &Path) -> Option<usize> {
    let name = path.file_name()?.to_str()?;
    let (ordinal, _) = name.split_once('_')?;
    ordinal.parse().ok()
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_vec_pretty(value).map_err(|source| MigrationError::StagedFormat {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, body).await.map_err(|source| MigrationError::Staging {
        path: path.to_path_buf(),
        source,
    })
}

async fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let body = tokio::fs::read(path).await.map_err(|source| MigrationError::Staging {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&body).map_err(|source| MigrationError::StagedFormat {
        path: path.to_path_buf(),
        source,
    })
}
