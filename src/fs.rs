use crate::errors::TrashError;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Filesystem abstraction boundary for the trash store.
///
/// Keeping this trait narrow makes it easy to write deterministic tests
/// (fixed clock, injected failures) without touching the store itself.
pub trait FileSystem: Send + Sync {
    /// Returns the current time in wall-clock format.
    fn now(&self) -> SystemTime;

    /// Returns true when something occupies `path`, dangling symlinks included.
    fn exists(&self, path: &Path) -> bool;

    /// Reads symlink metadata.
    fn symlink_metadata(&self, path: &Path) -> crate::Result<Metadata>;

    /// Creates a directory and all missing parent directories.
    fn create_dir_all(&self, path: &Path) -> crate::Result<()>;

    /// Writes UTF-8 text, replacing any previous content.
    fn write_to_string(&self, path: &Path, content: &str) -> crate::Result<()>;

    /// Reads UTF-8 text.
    fn read_to_string(&self, path: &Path) -> crate::Result<String>;

    /// Removes a file.
    fn remove_file(&self, path: &Path) -> crate::Result<()>;

    /// Removes a file, symlink or whole directory tree.
    fn remove_all(&self, path: &Path) -> crate::Result<()>;

    /// Renames a path. Fails across filesystems; see [`move_path`].
    fn rename(&self, from: &Path, to: &Path) -> crate::Result<()>;

    /// Copies a file, symlink or directory tree to a destination that must not exist.
    fn copy_tree(&self, from: &Path, to: &Path) -> crate::Result<()>;

    /// Lists directory children as concrete paths.
    fn list_dir(&self, path: &Path) -> crate::Result<Vec<PathBuf>>;

    /// Sums the length of every non-directory entry below `path` (symlinks not followed).
    fn tree_size(&self, path: &Path) -> crate::Result<u64>;

    /// Like [`FileSystem::tree_size`], but entries that cannot be read are
    /// logged and left out of the sum instead of failing the whole walk.
    fn tree_size_lossy(&self, path: &Path) -> u64 {
        self.tree_size(path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "could not size entry, counting 0");
            0
        })
    }
}

/// Default filesystem implementation backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn symlink_metadata(&self, path: &Path) -> crate::Result<Metadata> {
        fs::symlink_metadata(path).map_err(|err| TrashError::storage(path, err))
    }

    #[cfg(unix)]
    fn create_dir_all(&self, path: &Path) -> crate::Result<()> {
        use std::os::unix::fs::DirBuilderExt;

        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(path)
            .map_err(|err| TrashError::storage(path, err))
    }

    #[cfg(not(unix))]
    fn create_dir_all(&self, path: &Path) -> crate::Result<()> {
        fs::create_dir_all(path).map_err(|err| TrashError::storage(path, err))
    }

    fn write_to_string(&self, path: &Path, content: &str) -> crate::Result<()> {
        fs::write(path, content).map_err(|err| TrashError::storage(path, err))
    }

    fn read_to_string(&self, path: &Path) -> crate::Result<String> {
        fs::read_to_string(path).map_err(|err| TrashError::storage(path, err))
    }

    fn remove_file(&self, path: &Path) -> crate::Result<()> {
        fs::remove_file(path).map_err(|err| TrashError::storage(path, err))
    }

    fn remove_all(&self, path: &Path) -> crate::Result<()> {
        let metadata = self.symlink_metadata(path)?;
        let removed = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        removed.map_err(|err| TrashError::storage(path, err))
    }

    fn rename(&self, from: &Path, to: &Path) -> crate::Result<()> {
        fs::rename(from, to).map_err(|err| TrashError::storage(from, err))
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> crate::Result<()> {
        // Directory modes are applied last so read-only directories can still be filled.
        let mut directories = Vec::new();

        for entry in WalkDir::new(from).follow_links(false).follow_root_links(false) {
            let entry = entry.map_err(|err| walk_error(from, err))?;
            let relative = entry.path().strip_prefix(from).unwrap_or(Path::new(""));
            let target = if relative.as_os_str().is_empty() {
                to.to_path_buf()
            } else {
                to.join(relative)
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                fs::create_dir(&target).map_err(|err| TrashError::storage(&target, err))?;
                let permissions = entry
                    .metadata()
                    .map_err(|err| walk_error(entry.path(), err))?
                    .permissions();
                directories.push((target, permissions));
            } else if file_type.is_symlink() {
                copy_symlink(entry.path(), &target)?;
            } else {
                fs::copy(entry.path(), &target).map_err(|err| TrashError::storage(&target, err))?;
            }
        }

        for (directory, permissions) in directories.into_iter().rev() {
            fs::set_permissions(&directory, permissions)
                .map_err(|err| TrashError::storage(&directory, err))?;
        }
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> crate::Result<Vec<PathBuf>> {
        fs::read_dir(path)
            .map_err(|err| TrashError::storage(path, err))?
            .map(|entry| entry.map(|v| v.path()))
            .collect::<Result<Vec<PathBuf>, io::Error>>()
            .map_err(|err| TrashError::storage(path, err))
    }

    fn tree_size(&self, path: &Path) -> crate::Result<u64> {
        sum_tree(path, Err)
    }

    fn tree_size_lossy(&self, path: &Path) -> u64 {
        sum_tree(path, |err| {
            warn!(error = %err, "skipping unreadable entry while sizing");
            Ok(())
        })
        .unwrap_or_default()
    }
}

/// Walks `path` without following symlinks, handing every walk failure to
/// `on_error`; returning `Ok` from it skips the entry.
fn sum_tree(path: &Path, mut on_error: impl FnMut(TrashError) -> crate::Result<()>) -> crate::Result<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false).follow_root_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                on_error(walk_error(path, err))?;
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        match entry.metadata() {
            Ok(metadata) => total += metadata.len(),
            Err(err) => on_error(walk_error(entry.path(), err))?,
        }
    }
    Ok(total)
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> crate::Result<()> {
    let target = fs::read_link(from).map_err(|err| TrashError::storage(from, err))?;
    std::os::unix::fs::symlink(&target, to).map_err(|err| TrashError::storage(to, err))
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, _to: &Path) -> crate::Result<()> {
    Err(TrashError::storage(
        from,
        io::Error::new(io::ErrorKind::Unsupported, "cannot copy symlinks on this platform"),
    ))
}

fn walk_error(root: &Path, err: walkdir::Error) -> TrashError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
    TrashError::storage(path, io::Error::from(err))
}

fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

/// Moves `from` to `to`, falling back to copy-then-delete when the two live on
/// different filesystems.
///
/// A failed copy removes whatever part of the destination was written and
/// leaves the source untouched. If the copy succeeds but the source cannot be
/// removed, both copies remain and the removal error is returned.
pub fn move_path<F: FileSystem + ?Sized>(fs: &F, from: &Path, to: &Path) -> crate::Result<()> {
    match fs.rename(from, to) {
        Ok(()) => Ok(()),
        Err(TrashError::Storage { source, .. }) if is_cross_device(&source) => {
            debug!(from = %from.display(), to = %to.display(), "rename crosses devices, copying");
            if let Err(err) = fs.copy_tree(from, to) {
                if let Err(cleanup) = fs.remove_all(to) {
                    if !cleanup.is_missing_entry() {
                        warn!(path = %to.display(), error = %cleanup, "partial copy left behind");
                    }
                }
                return Err(err);
            }
            fs.remove_all(from).inspect_err(|err| {
                warn!(path = %from.display(), error = %err, "copied across devices but source remains");
            })
        }
        Err(err) => Err(err),
    }
}
