//! Recycle-bin store behind the `rc` command.
//!
//! Trashed entries are moved verbatim into `<root>/files` and described by a
//! JSON sidecar in `<root>/info`. The store is synchronous and UI agnostic:
//! every operation reports through typed values and [`TrashError`].

pub mod config;
pub mod errors;
pub mod fs;
pub mod helpers;
pub mod models;
pub mod policy;
pub mod store;

pub use config::{Config, ConfigFile};
pub use errors::{Result, TrashError};
pub use fs::{move_path, FileSystem, RealFileSystem};
pub use helpers::{
    absolutize,
    format_size,
    truncate,
    DISPLAY_TIME_FORMAT,
    METADATA_EXTENSION,
    TRASH_NAME_TIME_FORMAT,
};
pub use models::{Reconciliation, Restored, TrashDirectory, TrashedItem};
pub use policy::RetentionPolicy;
pub use store::TrashStore;

/// Re-export a small stable API surface for the command layer.
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigFile},
        errors::{Result, TrashError},
        helpers::{format_size, truncate, DISPLAY_TIME_FORMAT},
        models::*,
        policy::RetentionPolicy,
        store::TrashStore,
    };
}
