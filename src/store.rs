//! The trash store: payload and metadata areas kept in lockstep.
//!
//! Every payload entry under `files/` has exactly one record under `info/`
//! with the same trash name plus [`METADATA_EXTENSION`]. Mutating operations
//! create or destroy both halves together; the only tolerated mismatches are
//! the degraded states documented on [`TrashStore::put`] and
//! [`TrashStore::restore`], which [`TrashStore::repair`] can clean up.

use crate::errors::{Result, TrashError};
use crate::fs::{move_path, FileSystem, RealFileSystem};
use crate::helpers::{
    absolutize, build_trash_name, is_valid_trash_name, trash_name_of_record, trash_name_stamp,
    METADATA_EXTENSION,
};
use crate::models::{Reconciliation, Restored, TrashDirectory, TrashedItem};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct TrashStore<F: FileSystem = RealFileSystem> {
    dir: TrashDirectory,
    fs: F,
}

impl TrashStore<RealFileSystem> {
    /// Opens the store rooted at `root`, creating `files/` and `info/` as needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_fs(root, RealFileSystem)
    }
}

impl<F: FileSystem> TrashStore<F> {
    pub fn with_fs(root: impl Into<PathBuf>, fs: F) -> Result<Self> {
        let root = root.into();
        let root = absolutize(&root)?;
        let store = Self {
            dir: TrashDirectory::new(root),
            fs,
        };
        store.ensure_layout()?;
        debug!(root = %store.dir.path.display(), "trash store ready");
        Ok(store)
    }

    pub fn directory(&self) -> &TrashDirectory {
        &self.dir
    }

    fn ensure_layout(&self) -> Result<()> {
        self.fs.create_dir_all(&self.dir.files_dir)?;
        self.fs.create_dir_all(&self.dir.info_dir)
    }

    /// Moves `path` into the payload area and records where it came from.
    ///
    /// If the record cannot be written after the move, the error is returned
    /// and the payload stays in the trash without metadata (see [`Self::repair`]).
    pub fn put(&self, path: impl AsRef<Path>) -> Result<TrashedItem> {
        let original_path = absolutize(path.as_ref())?;
        if !self.fs.exists(&original_path) {
            return Err(TrashError::not_found(original_path.display().to_string()));
        }
        let base_name = original_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| TrashError::unresolvable(&original_path, "no usable file name"))?
            .to_string();
        if self.dir.contains(&original_path) {
            return Err(TrashError::unresolvable(&original_path, "path is inside the trash"));
        }
        if self.dir.path.starts_with(&original_path) {
            return Err(TrashError::unresolvable(&original_path, "path contains the trash"));
        }

        let size = self.fs.tree_size_lossy(&original_path);
        let now = self.fs.now();
        let trash_name = self.free_trash_name(&trash_name_stamp(now), &base_name);
        let trash_path = self.dir.payload_path(&trash_name);

        move_path(&self.fs, &original_path, &trash_path)?;
        debug!(from = %original_path.display(), to = %trash_path.display(), "moved to trash");

        let item = TrashedItem {
            original_path,
            trash_path,
            deleted_at: DateTime::<Utc>::from(now),
            size,
        };
        if let Err(err) = self.write_record(&trash_name, &item) {
            warn!(
                payload = %item.trash_path.display(),
                error = %err,
                "payload trashed but its record could not be written"
            );
            return Err(err);
        }
        info!(name = %trash_name, original = %item.original_path.display(), size, "trashed");
        Ok(item)
    }

    /// Linear probe for a name free in both areas: `<stamp>_<base>`, then `_1`, `_2`, ...
    fn free_trash_name(&self, stamp: &str, base_name: &str) -> String {
        let mut probe = 0u64;
        loop {
            let candidate = build_trash_name(stamp, base_name, probe);
            if !self.fs.exists(&self.dir.payload_path(&candidate))
                && !self.fs.exists(&self.dir.record_path(&candidate))
            {
                return candidate;
            }
            debug!(candidate = %candidate, "trash name taken");
            probe += 1;
        }
    }

    /// Every parseable record. Records that do not parse and foreign files
    /// are skipped; a record that cannot be read at all fails the listing.
    pub fn list(&self) -> Result<Vec<TrashedItem>> {
        let mut items = Vec::new();
        for path in self.fs.list_dir(&self.dir.info_dir)? {
            if record_trash_name(&path).is_none() {
                continue;
            }
            match self.read_record(&path) {
                Ok(item) => items.push(item),
                Err(err @ TrashError::Serialization { .. }) => {
                    debug!(record = %path.display(), error = %err, "skipping corrupt record")
                }
                Err(err) => return Err(err),
            }
        }
        Ok(items)
    }

    /// Loads the record for one trash name.
    pub fn get(&self, trash_name: &str) -> Result<TrashedItem> {
        if !is_valid_trash_name(trash_name) {
            return Err(TrashError::not_found(trash_name));
        }
        let record = self.dir.record_path(trash_name);
        if !self.fs.exists(&record) {
            return Err(TrashError::not_found(trash_name));
        }
        self.read_record(&record)
    }

    /// Resolves a user-supplied identifier: an exact trash name, or else an
    /// original path (the most recently deleted item wins).
    pub fn find(&self, query: &str) -> Result<TrashedItem> {
        let items = self.list()?;
        if let Some(item) = items.iter().find(|item| item.trash_name() == query) {
            return Ok(item.clone());
        }
        let wanted = absolutize(Path::new(query)).ok();
        items
            .into_iter()
            .filter(|item| {
                item.original_path == Path::new(query) || Some(&item.original_path) == wanted.as_ref()
            })
            .max_by_key(|item| item.deleted_at)
            .ok_or_else(|| TrashError::not_found(query))
    }

    /// Moves an item back to where it was trashed from.
    ///
    /// Never overwrites: an occupied original path fails with `Conflict` and
    /// leaves everything untouched.
    pub fn restore(&self, trash_name: &str) -> Result<Restored> {
        let item = self.get(trash_name)?;
        let payload = self.dir.payload_path(trash_name);
        let target = &item.original_path;

        if self.fs.exists(target) {
            return Err(TrashError::conflict(target));
        }
        if !self.fs.exists(&payload) {
            return Err(TrashError::not_found(payload.display().to_string()));
        }
        if let Some(parent) = target.parent() {
            self.fs.create_dir_all(parent)?;
        }

        move_path(&self.fs, &payload, target)?;
        info!(name = %trash_name, to = %target.display(), "restored");

        let stale_record = match self.fs.remove_file(&self.dir.record_path(trash_name)) {
            Ok(()) => None,
            Err(err) => {
                warn!(name = %trash_name, error = %err, "restored but record could not be removed");
                Some(err)
            }
        };
        Ok(Restored { item, stale_record })
    }

    /// Permanently deletes one item: payload first, then its record.
    pub fn remove(&self, trash_name: &str) -> Result<()> {
        if !is_valid_trash_name(trash_name) {
            return Err(TrashError::not_found(trash_name));
        }
        let record = self.dir.record_path(trash_name);
        if !self.fs.exists(&record) {
            return Err(TrashError::not_found(trash_name));
        }

        match self.fs.remove_all(&self.dir.payload_path(trash_name)) {
            Err(err) if !err.is_missing_entry() => return Err(err),
            _ => {}
        }
        self.fs.remove_file(&record)?;
        info!(name = %trash_name, "permanently deleted");
        Ok(())
    }

    /// Discards every item by replacing both areas with empty directories.
    pub fn empty(&self) -> Result<()> {
        for dir in [&self.dir.files_dir, &self.dir.info_dir] {
            match self.fs.remove_all(dir) {
                Err(err) if !err.is_missing_entry() => return Err(err),
                _ => {}
            }
        }
        self.ensure_layout()?;
        info!(root = %self.dir.path.display(), "trash emptied");
        Ok(())
    }

    /// Total bytes held in the payload area.
    pub fn size(&self) -> Result<u64> {
        self.fs.tree_size(&self.dir.files_dir)
    }

    /// Compares both areas without changing anything.
    pub fn check(&self) -> Result<Reconciliation> {
        let mut report = Reconciliation::default();
        let mut recorded = HashSet::new();

        for path in self.fs.list_dir(&self.dir.info_dir)? {
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if is_staging_file(file_name) {
                report.stale_staging.push(path);
                continue;
            }
            let Some(name) = record_trash_name(&path) else {
                continue;
            };
            match self.read_record(&path) {
                Ok(_) => {}
                Err(TrashError::Serialization { .. }) => {
                    report.corrupt_records.push(path);
                    continue;
                }
                Err(err) => return Err(err),
            }
            if !self.fs.exists(&self.dir.payload_path(&name)) {
                report.dangling_records.push(name.clone());
            }
            recorded.insert(name);
        }

        for path in self.fs.list_dir(&self.dir.files_dir)? {
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !recorded.contains(name) {
                report.orphaned_payloads.push(name.to_string());
            }
        }

        report.orphaned_payloads.sort();
        report.dangling_records.sort();
        report.corrupt_records.sort();
        report.stale_staging.sort();
        Ok(report)
    }

    /// Restores lockstep: drops dangling and corrupt records and leftover
    /// staging files, and adopts orphaned payloads with a record pointing at
    /// `recovered/<name>`.
    pub fn repair(&self) -> Result<Reconciliation> {
        let report = self.check()?;

        for name in &report.dangling_records {
            self.fs.remove_file(&self.dir.record_path(name))?;
            info!(name = %name, "dropped record without payload");
        }
        for path in &report.corrupt_records {
            self.fs.remove_file(path)?;
            info!(record = %path.display(), "dropped corrupt record");
        }
        for path in &report.stale_staging {
            self.fs.remove_file(path)?;
            info!(file = %path.display(), "dropped interrupted record write");
        }
        for name in &report.orphaned_payloads {
            let trash_path = self.dir.payload_path(name);
            let item = TrashedItem {
                original_path: self.dir.recovered_path(name),
                size: self.fs.tree_size_lossy(&trash_path),
                deleted_at: DateTime::<Utc>::from(self.fs.now()),
                trash_path,
            };
            self.write_record(name, &item)?;
            info!(name = %name, "adopted payload without record");
        }
        Ok(report)
    }

    fn read_record(&self, path: &Path) -> Result<TrashedItem> {
        let raw = self.fs.read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|err| TrashError::serialization(path, err))
    }

    /// Writes to a temporary sibling first so a crash never leaves a half-written record.
    fn write_record(&self, trash_name: &str, item: &TrashedItem) -> Result<()> {
        let record = self.dir.record_path(trash_name);
        let raw =
            serde_json::to_string_pretty(item).map_err(|err| TrashError::serialization(&record, err))?;
        let staging = self.dir.info_dir.join(staging_file_name(trash_name));
        self.fs.write_to_string(&staging, &raw)?;
        self.fs.rename(&staging, &record)
    }
}

const STAGING_SUFFIX: &str = ".tmp";

fn staging_file_name(trash_name: &str) -> String {
    format!(".{trash_name}{METADATA_EXTENSION}{STAGING_SUFFIX}")
}

fn is_staging_file(file_name: &str) -> bool {
    file_name
        .strip_prefix('.')
        .and_then(|rest| rest.strip_suffix(STAGING_SUFFIX))
        .is_some_and(|rest| trash_name_of_record(rest).is_some())
}

fn record_trash_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    trash_name_of_record(file_name).map(str::to_string)
}
