//! Shared fixtures for store integration tests.

#![allow(dead_code)]

use rc_core::{FileSystem, RealFileSystem, TrashError};
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

/// Real filesystem with a frozen clock and switchable failures.
pub struct TestFs {
    pub clock: SystemTime,
    pub fail_writes: AtomicBool,
    pub fail_record_removal: AtomicBool,
    pub fail_record_reads: AtomicBool,
    pub fail_tree_walks: AtomicBool,
}

impl TestFs {
    /// Clock frozen at 2024-01-02T03:04:05Z.
    pub fn frozen() -> Self {
        Self {
            clock: UNIX_EPOCH + Duration::from_secs(1_704_164_645),
            fail_writes: AtomicBool::new(false),
            fail_record_removal: AtomicBool::new(false),
            fail_record_reads: AtomicBool::new(false),
            fail_tree_walks: AtomicBool::new(false),
        }
    }

    pub fn failing_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_record_removal(self) -> Self {
        self.fail_record_removal.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_record_reads(self) -> Self {
        self.fail_record_reads.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_tree_walks(self) -> Self {
        self.fail_tree_walks.store(true, Ordering::SeqCst);
        self
    }
}

fn is_record(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

fn injected(path: &Path) -> TrashError {
    TrashError::storage(path, io::Error::new(io::ErrorKind::PermissionDenied, "injected failure"))
}

impl FileSystem for TestFs {
    fn now(&self) -> SystemTime {
        self.clock
    }

    fn exists(&self, path: &Path) -> bool {
        RealFileSystem.exists(path)
    }

    fn symlink_metadata(&self, path: &Path) -> rc_core::Result<Metadata> {
        RealFileSystem.symlink_metadata(path)
    }

    fn create_dir_all(&self, path: &Path) -> rc_core::Result<()> {
        RealFileSystem.create_dir_all(path)
    }

    fn write_to_string(&self, path: &Path, content: &str) -> rc_core::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected(path));
        }
        RealFileSystem.write_to_string(path, content)
    }

    fn read_to_string(&self, path: &Path) -> rc_core::Result<String> {
        if is_record(path) && self.fail_record_reads.load(Ordering::SeqCst) {
            return Err(injected(path));
        }
        RealFileSystem.read_to_string(path)
    }

    fn remove_file(&self, path: &Path) -> rc_core::Result<()> {
        if is_record(path) && self.fail_record_removal.load(Ordering::SeqCst) {
            return Err(injected(path));
        }
        RealFileSystem.remove_file(path)
    }

    fn remove_all(&self, path: &Path) -> rc_core::Result<()> {
        RealFileSystem.remove_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> rc_core::Result<()> {
        RealFileSystem.rename(from, to)
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> rc_core::Result<()> {
        RealFileSystem.copy_tree(from, to)
    }

    fn list_dir(&self, path: &Path) -> rc_core::Result<Vec<PathBuf>> {
        RealFileSystem.list_dir(path)
    }

    fn tree_size(&self, path: &Path) -> rc_core::Result<u64> {
        if self.fail_tree_walks.load(Ordering::SeqCst) {
            return Err(injected(path));
        }
        RealFileSystem.tree_size(path)
    }
}

/// Writes `contents` to `dir/relative`, creating parents.
pub fn write_file(dir: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn trash_root(tmp: &TempDir) -> PathBuf {
    tmp.path().join("trash")
}
