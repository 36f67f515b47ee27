//! Age and size limits applied to the trash as a whole.

use crate::config::Config;
use crate::models::TrashedItem;
use chrono::{DateTime, Duration, Utc};

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age: Option<Duration>,
    pub max_size: Option<u64>,
}

impl RetentionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_age: (config.auto_empty_days > 0)
                .then(|| Duration::days(i64::from(config.auto_empty_days))),
            max_size: (config.max_trash_size_mb > 0)
                .then(|| config.max_trash_size_mb.saturating_mul(MIB)),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.max_age.is_none() && self.max_size.is_none()
    }

    pub fn exceeds_size(&self, total_size: u64) -> bool {
        self.max_size.is_some_and(|limit| total_size > limit)
    }

    /// Items to purge: everything past `max_age`, then the oldest survivors
    /// until `total_size` fits under `max_size`. Oldest first.
    pub fn select(&self, items: &[TrashedItem], total_size: u64, now: DateTime<Utc>) -> Vec<TrashedItem> {
        let mut by_age: Vec<&TrashedItem> = items.iter().collect();
        by_age.sort_by_key(|item| item.deleted_at);

        let mut remaining = total_size;
        let mut selected = Vec::new();
        for item in by_age {
            let expired = self
                .max_age
                .is_some_and(|max_age| now.signed_duration_since(item.deleted_at) > max_age);
            if expired || self.exceeds_size(remaining) {
                remaining = remaining.saturating_sub(item.size);
                selected.push(item.clone());
            }
        }
        selected
    }
}
