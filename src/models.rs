use crate::errors::TrashError;
use crate::helpers::metadata_file_name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk layout of a trash root: a payload area and a metadata area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashDirectory {
    pub path: PathBuf,
    pub files_dir: PathBuf,
    pub info_dir: PathBuf,
}

impl TrashDirectory {
    pub fn new(path: PathBuf) -> Self {
        let files_dir = path.join("files");
        let info_dir = path.join("info");
        Self {
            path,
            files_dir,
            info_dir,
        }
    }

    /// Payload slot for a trash name.
    pub fn payload_path(&self, trash_name: &str) -> PathBuf {
        self.files_dir.join(trash_name)
    }

    /// Metadata record for a trash name.
    pub fn record_path(&self, trash_name: &str) -> PathBuf {
        self.info_dir.join(metadata_file_name(trash_name))
    }

    /// Where adopted payloads of unknown origin are restored to.
    pub fn recovered_path(&self, trash_name: &str) -> PathBuf {
        self.path.join("recovered").join(trash_name)
    }

    /// True when `path` is the trash root or lies inside it.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }
}

/// A relocated file or directory and what is needed to put it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashedItem {
    pub original_path: PathBuf,
    pub trash_path: PathBuf,
    pub deleted_at: DateTime<Utc>,
    pub size: u64,
}

impl TrashedItem {
    /// The unique identifier: basename of the payload entry.
    pub fn trash_name(&self) -> &str {
        self.trash_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

/// Outcome of a restore that moved the payload back.
#[derive(Debug)]
pub struct Restored {
    pub item: TrashedItem,
    /// Set when the metadata record could not be deleted afterwards; the item
    /// is back in place but still listed.
    pub stale_record: Option<TrashError>,
}

/// Mismatches between the payload and metadata areas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Payload entries with no metadata record.
    pub orphaned_payloads: Vec<String>,
    /// Metadata records whose payload entry is gone.
    pub dangling_records: Vec<String>,
    /// Files in the metadata area that do not parse as records.
    pub corrupt_records: Vec<PathBuf>,
    /// Half-written records left behind by an interrupted write.
    pub stale_staging: Vec<PathBuf>,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.orphaned_payloads.is_empty()
            && self.dangling_records.is_empty()
            && self.corrupt_records.is_empty()
            && self.stale_staging.is_empty()
    }
}
