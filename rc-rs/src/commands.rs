//! One function per subcommand. Each reports through the [`Ui`] and returns
//! an error when the command as a whole failed.

use crate::cli::{Command, ConfigAction};
use crate::ui::Ui;
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use rc_core::prelude::*;
use std::path::PathBuf;
use tracing::debug;

pub fn run(command: Command, config_file: &ConfigFile, config: Config, ui: &mut dyn Ui) -> Result<()> {
    // Config commands never open the store, so a broken trash_dir can still be fixed.
    match command {
        Command::Config { action } => config_command(action, config_file, config, ui),
        Command::Put { paths } => put(&open_store(&config)?, &config, ui, &paths),
        Command::List => list(&open_store(&config)?, ui),
        Command::Restore { target } => restore(&open_store(&config)?, ui, target.as_deref()),
        Command::Remove { target, yes } => remove(&open_store(&config)?, &config, ui, &target, yes),
        Command::Empty { yes } => empty(&open_store(&config)?, &config, ui, yes),
        Command::Size => size(&open_store(&config)?, ui),
        Command::Prune { yes, dry_run } => prune(&open_store(&config)?, &config, ui, yes, dry_run),
        Command::Doctor { fix } => doctor(&open_store(&config)?, ui, fix),
    }
}

fn open_store(config: &Config) -> Result<TrashStore> {
    let store = TrashStore::open(&config.trash_dir).with_context(|| {
        format!("failed to initialize trash at {}", config.trash_dir.display())
    })?;
    debug!(root = %store.directory().path.display(), "trash store opened");
    Ok(store)
}

/// Resolves a trash name or original path, keeping storage failures distinct from misses.
fn lookup(store: &TrashStore, target: &str) -> Result<TrashedItem> {
    store.find(target).map_err(|err| match err {
        TrashError::NotFound(_) => anyhow!("Item not found: {target}"),
        other => anyhow!(describe(other)),
    })
}

/// Renders the full cause chain of a store error.
fn describe(err: TrashError) -> String {
    format!("{:#}", anyhow::Error::new(err))
}

fn needs_confirmation(config: &Config, yes: bool) -> bool {
    config.confirm_delete && !yes
}

fn put(store: &TrashStore, config: &Config, ui: &mut dyn Ui, paths: &[PathBuf]) -> Result<()> {
    let mut failed = 0usize;
    for path in paths {
        match store.put(path) {
            Ok(_) => ui.success(&format!("Moved to trash: {}", path.display())),
            Err(err) => {
                failed += 1;
                ui.error(&format!("Failed to trash {}: {}", path.display(), describe(err)));
            }
        }
    }

    let policy = RetentionPolicy::from_config(config);
    if let Ok(total) = store.size() {
        if policy.exceeds_size(total) {
            ui.warn(&format!(
                "Trash holds {}, over the {} MB limit; run `rc prune`",
                format_size(total),
                config.max_trash_size_mb
            ));
        }
    }

    if failed > 0 {
        bail!("{failed} of {} paths could not be trashed", paths.len());
    }
    Ok(())
}

fn list(store: &TrashStore, ui: &mut dyn Ui) -> Result<()> {
    let mut items = store.list().context("failed to list trash")?;
    items.sort_by(|a, b| a.deleted_at.cmp(&b.deleted_at).then_with(|| a.trash_name().cmp(b.trash_name())));
    ui.display_items(&items);
    Ok(())
}

fn restore(store: &TrashStore, ui: &mut dyn Ui, target: Option<&str>) -> Result<()> {
    let trash_name = match target {
        Some(target) => lookup(store, target)?.trash_name().to_string(),
        None => {
            let mut items = store.list().context("failed to list trash")?;
            if items.is_empty() {
                ui.info("Trash is empty");
                return Ok(());
            }
            items.sort_by_key(|item| item.deleted_at);
            ui.select_item(&items).context("Selection failed")?
        }
    };

    let restored = store
        .restore(&trash_name)
        .map_err(|err| anyhow!("Failed to restore: {}", describe(err)))?;
    ui.success(&format!("Restored {}", restored.item.original_path.display()));
    if let Some(err) = restored.stale_record {
        ui.warn(&format!(
            "{} is back in place but still listed in the trash: {}",
            restored.item.original_path.display(),
            describe(err)
        ));
    }
    Ok(())
}

fn remove(store: &TrashStore, config: &Config, ui: &mut dyn Ui, target: &str, yes: bool) -> Result<()> {
    let item = lookup(store, target)?;

    if needs_confirmation(config, yes)
        && !ui.confirm(&format!("Permanently delete {}?", item.original_path.display()))
    {
        ui.info("Operation cancelled");
        return Ok(());
    }

    store
        .remove(item.trash_name())
        .map_err(|err| anyhow!("Failed to remove: {}", describe(err)))?;
    ui.success(&format!("Permanently deleted {}", item.original_path.display()));
    Ok(())
}

fn empty(store: &TrashStore, config: &Config, ui: &mut dyn Ui, yes: bool) -> Result<()> {
    let items = store.list().context("failed to list trash")?;
    if items.is_empty() {
        ui.info("Trash is already empty");
        return Ok(());
    }

    if needs_confirmation(config, yes)
        && !ui.confirm(&format!("Permanently delete {} items?", items.len()))
    {
        ui.info("Operation cancelled");
        return Ok(());
    }

    store
        .empty()
        .map_err(|err| anyhow!("Failed to empty trash: {}", describe(err)))?;
    ui.success(&format!("Permanently deleted {} items", items.len()));
    Ok(())
}

fn size(store: &TrashStore, ui: &mut dyn Ui) -> Result<()> {
    let total = store
        .size()
        .map_err(|err| anyhow!("Failed to calculate size: {}", describe(err)))?;
    ui.info(&format!("Trash size: {}", format_size(total)));
    Ok(())
}

fn prune(store: &TrashStore, config: &Config, ui: &mut dyn Ui, yes: bool, dry_run: bool) -> Result<()> {
    let policy = RetentionPolicy::from_config(config);
    if policy.is_disabled() {
        ui.info("Retention limits are disabled (auto_empty_days and max_trash_size_mb are 0)");
        return Ok(());
    }

    let items = store.list().context("failed to list trash")?;
    let total = store.size().context("failed to calculate trash size")?;
    let doomed = policy.select(&items, total, Utc::now());
    if doomed.is_empty() {
        ui.info("Nothing to prune");
        return Ok(());
    }

    ui.display_items(&doomed);
    if dry_run {
        ui.info(&format!("{} items would be deleted", doomed.len()));
        return Ok(());
    }
    if needs_confirmation(config, yes)
        && !ui.confirm(&format!("Permanently delete {} items?", doomed.len()))
    {
        ui.info("Operation cancelled");
        return Ok(());
    }

    let mut freed = 0u64;
    let mut failed = 0usize;
    for item in &doomed {
        match store.remove(item.trash_name()) {
            Ok(()) => freed += item.size,
            Err(err) => {
                failed += 1;
                ui.error(&format!("Failed to remove {}: {}", item.trash_name(), describe(err)));
            }
        }
    }
    ui.success(&format!(
        "Pruned {} items, freed {}",
        doomed.len() - failed,
        format_size(freed)
    ));

    if failed > 0 {
        bail!("{failed} items could not be pruned");
    }
    Ok(())
}

fn doctor(store: &TrashStore, ui: &mut dyn Ui, fix: bool) -> Result<()> {
    let report = if fix {
        store.repair().context("failed to repair trash")?
    } else {
        store.check().context("failed to check trash")?
    };

    if report.is_consistent() {
        ui.success("Trash is consistent");
        return Ok(());
    }

    let verb = |done: &str, found: &str| if fix { done.to_string() } else { found.to_string() };
    for name in &report.orphaned_payloads {
        ui.info(&format!("{}: {name}", verb("adopted payload", "payload without record")));
    }
    for name in &report.dangling_records {
        ui.info(&format!("{}: {name}", verb("dropped record", "record without payload")));
    }
    for path in &report.corrupt_records {
        ui.info(&format!("{}: {}", verb("dropped corrupt record", "corrupt record"), path.display()));
    }
    for path in &report.stale_staging {
        ui.info(&format!("{}: {}", verb("dropped interrupted write", "interrupted write"), path.display()));
    }

    if fix {
        ui.success("Trash repaired");
    } else {
        ui.info("Run `rc doctor --fix` to repair");
    }
    Ok(())
}

fn config_command(action: Option<ConfigAction>, file: &ConfigFile, mut config: Config, ui: &mut dyn Ui) -> Result<()> {
    match action {
        None => {
            ui.print("Current configuration:");
            for key in Config::KEYS {
                let value = config.get(key).unwrap_or_default();
                ui.print(&format!("  {key}: {value}"));
            }
            ui.print(&format!("\nConfig file: {}", file.path().display()));
        }
        Some(ConfigAction::Get { key }) => {
            let value = config
                .get(&key)
                .ok_or_else(|| anyhow!("Unknown config key: {key}"))?;
            ui.print(&format!("{key}: {value}"));
        }
        Some(ConfigAction::Set { key, value }) => {
            config.set(&key, &value)?;
            file.save(&config)
                .with_context(|| format!("Failed to save config to {}", file.path().display()))?;
            let stored = config.get(&key).unwrap_or(value);
            ui.success(&format!("Set {key} = {stored}"));
        }
        Some(ConfigAction::Reset) => {
            file.reset().context("Failed to reset config")?;
            ui.success("Config reset to defaults");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Records every message and answers prompts from a script.
    #[derive(Default)]
    struct ScriptedUi {
        confirm_answer: bool,
        selection: Option<String>,
        lines: Vec<String>,
    }

    impl Ui for ScriptedUi {
        fn confirm(&mut self, message: &str) -> bool {
            self.lines.push(format!("? {message}"));
            self.confirm_answer
        }
        fn display_items(&mut self, items: &[TrashedItem]) {
            for item in items {
                self.lines.push(format!("item {}", item.original_path.display()));
            }
        }
        fn select_item(&mut self, _items: &[TrashedItem]) -> Result<String> {
            self.selection.clone().ok_or_else(|| anyhow!("selection cancelled"))
        }
        fn success(&mut self, message: &str) {
            self.lines.push(format!("ok {message}"));
        }
        fn error(&mut self, message: &str) {
            self.lines.push(format!("error {message}"));
        }
        fn info(&mut self, message: &str) {
            self.lines.push(format!("info {message}"));
        }
        fn warn(&mut self, message: &str) {
            self.lines.push(format!("warn {message}"));
        }
        fn print(&mut self, line: &str) {
            self.lines.push(line.to_string());
        }
    }

    struct Fixture {
        tmp: TempDir,
        file: ConfigFile,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let file = ConfigFile::in_home(tmp.path());
            let config = file.load().unwrap();
            Self { tmp, file, config }
        }

        fn run(&self, command: Command, ui: &mut ScriptedUi) -> Result<()> {
            run(command, &self.file, self.config.clone(), ui)
        }

        fn touch(&self, name: &str, contents: &[u8]) -> PathBuf {
            let path = self.tmp.path().join(name);
            fs::write(&path, contents).unwrap();
            path
        }

        fn store(&self) -> TrashStore {
            TrashStore::open(&self.config.trash_dir).unwrap()
        }
    }

    #[test]
    fn put_reports_each_path_and_fails_if_any_failed() {
        let fx = Fixture::new();
        let good = fx.touch("good.txt", b"1");
        let missing = fx.tmp.path().join("missing.txt");
        let mut ui = ScriptedUi::default();

        let err = fx
            .run(Command::Put { paths: vec![good, missing] }, &mut ui)
            .unwrap_err();

        assert!(err.to_string().contains("1 of 2"));
        assert!(ui.lines.iter().any(|line| line.starts_with("ok Moved to trash")));
        assert!(ui.lines.iter().any(|line| line.starts_with("error Failed to trash")));
        assert_eq!(fx.store().list().unwrap().len(), 1);
    }

    #[test]
    fn restore_by_original_path() {
        let fx = Fixture::new();
        let path = fx.touch("doc.txt", b"doc");
        fx.store().put(&path).unwrap();
        let mut ui = ScriptedUi::default();

        fx.run(Command::Restore { target: Some(path.display().to_string()) }, &mut ui)
            .unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"doc");
    }

    #[test]
    fn interactive_restore_uses_selection() {
        let fx = Fixture::new();
        let path = fx.touch("doc.txt", b"doc");
        let item = fx.store().put(&path).unwrap();
        let mut ui = ScriptedUi {
            selection: Some(item.trash_name().to_string()),
            ..Default::default()
        };

        fx.run(Command::Restore { target: None }, &mut ui).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn restore_on_empty_trash_is_informational() {
        let fx = Fixture::new();
        let mut ui = ScriptedUi::default();
        fx.run(Command::Restore { target: None }, &mut ui).unwrap();
        assert_eq!(ui.lines, vec!["info Trash is empty"]);
    }

    #[test]
    fn restore_of_named_target_on_empty_trash_is_not_found() {
        let fx = Fixture::new();
        let mut ui = ScriptedUi::default();
        let err = fx
            .run(Command::Restore { target: Some("ghost.txt".into()) }, &mut ui)
            .unwrap_err();
        assert_eq!(err.to_string(), "Item not found: ghost.txt");
        assert!(ui.lines.is_empty());
    }

    #[test]
    fn declined_confirmation_keeps_items() {
        let fx = Fixture::new();
        fx.store().put(fx.touch("a.txt", b"a")).unwrap();
        let mut ui = ScriptedUi::default();

        fx.run(Command::Empty { yes: false }, &mut ui).unwrap();

        assert!(ui.lines.contains(&"info Operation cancelled".to_string()));
        assert_eq!(fx.store().list().unwrap().len(), 1);
    }

    #[test]
    fn yes_flag_skips_confirmation() {
        let fx = Fixture::new();
        let path = fx.touch("a.txt", b"a");
        fx.store().put(&path).unwrap();
        let mut ui = ScriptedUi::default();

        fx.run(Command::Remove { target: path.display().to_string(), yes: true }, &mut ui)
            .unwrap();

        assert!(fx.store().list().unwrap().is_empty());
        assert!(!ui.lines.iter().any(|line| line.starts_with('?')));
    }

    #[test]
    fn remove_unknown_target_fails() {
        let fx = Fixture::new();
        let mut ui = ScriptedUi::default();
        let err = fx
            .run(Command::Remove { target: "nothing".into(), yes: true }, &mut ui)
            .unwrap_err();
        assert_eq!(err.to_string(), "Item not found: nothing");
    }

    #[test]
    fn prune_dry_run_deletes_nothing() {
        let mut fx = Fixture::new();
        fx.config.auto_empty_days = 0;
        fx.config.max_trash_size_mb = 0;
        let mut ui = ScriptedUi::default();
        fx.run(Command::Prune { yes: true, dry_run: true }, &mut ui).unwrap();
        assert!(ui.lines[0].starts_with("info Retention limits are disabled"));

        fx.config.auto_empty_days = 30;
        fx.store().put(fx.touch("fresh.txt", b"new")).unwrap();
        let mut ui = ScriptedUi::default();
        fx.run(Command::Prune { yes: true, dry_run: false }, &mut ui).unwrap();
        assert_eq!(ui.lines, vec!["info Nothing to prune"]);
        assert_eq!(fx.store().list().unwrap().len(), 1);
    }

    #[test]
    fn doctor_reports_then_fixes() {
        let fx = Fixture::new();
        let item = fx.store().put(fx.touch("a.txt", b"a")).unwrap();
        fs::remove_file(&item.trash_path).unwrap();

        let mut ui = ScriptedUi::default();
        fx.run(Command::Doctor { fix: false }, &mut ui).unwrap();
        assert!(ui.lines.iter().any(|line| line.contains("record without payload")));

        let mut ui = ScriptedUi::default();
        fx.run(Command::Doctor { fix: true }, &mut ui).unwrap();
        assert!(ui.lines.contains(&"ok Trash repaired".to_string()));

        let mut ui = ScriptedUi::default();
        fx.run(Command::Doctor { fix: false }, &mut ui).unwrap();
        assert_eq!(ui.lines, vec!["ok Trash is consistent"]);
    }

    #[test]
    fn config_set_persists_and_get_reads_back() {
        let fx = Fixture::new();
        let mut ui = ScriptedUi::default();
        fx.run(
            Command::Config {
                action: Some(ConfigAction::Set { key: "confirm_delete".into(), value: "no".into() }),
            },
            &mut ui,
        )
        .unwrap();
        assert_eq!(ui.lines, vec!["ok Set confirm_delete = false"]);
        assert!(!fx.file.load().unwrap().confirm_delete);

        let err = fx
            .run(
                Command::Config { action: Some(ConfigAction::Get { key: "nope".into() }) },
                &mut ui,
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown config key: nope");
    }
}
