//! Presentation capability set used by the command layer.
//!
//! `BasicUi` talks over plain line-based streams. `FancyUi` hands prompts to
//! the external `gum` tool when it is on `PATH` and falls back to `BasicUi`
//! for everything else.

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use rc_core::prelude::*;
use std::env;
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub trait Ui {
    fn confirm(&mut self, message: &str) -> bool;

    fn display_items(&mut self, items: &[TrashedItem]);

    /// Lets the user pick one item and returns its trash name.
    fn select_item(&mut self, items: &[TrashedItem]) -> Result<String>;

    fn success(&mut self, message: &str);

    fn error(&mut self, message: &str);

    fn info(&mut self, message: &str);

    fn warn(&mut self, message: &str);

    /// Plain, undecorated output line.
    fn print(&mut self, line: &str);
}

/// Builds the UI the configuration asks for.
pub fn for_config(config: &Config) -> Box<dyn Ui> {
    if config.use_fancy_ui {
        Box::new(FancyUi::new())
    } else {
        Box::new(BasicUi::stdio())
    }
}

pub struct BasicUi<R, W, E> {
    input: R,
    out: W,
    err: E,
}

impl BasicUi<BufReader<Stdin>, Stdout, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout(), io::stderr())
    }
}

impl<R: BufRead, W: Write, E: Write> BasicUi<R, W, E> {
    pub fn new(input: R, out: W, err: E) -> Self {
        Self { input, out, err }
    }

    #[cfg(test)]
    pub fn into_parts(self) -> (R, W, E) {
        (self.input, self.out, self.err)
    }

    // Output errors (closed pipes) are not worth failing a command over.
    fn write_out(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush());
    }

    fn write_err(&mut self, text: &str) {
        let _ = self.err.write_all(text.as_bytes()).and_then(|()| self.err.flush());
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        self.input.read_line(&mut line).context("failed to read input")?;
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write, E: Write> Ui for BasicUi<R, W, E> {
    fn confirm(&mut self, message: &str) -> bool {
        self.write_out(&format!("{message} (y/N): "));
        match self.read_line() {
            Ok(answer) => matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }

    fn display_items(&mut self, items: &[TrashedItem]) {
        if items.is_empty() {
            self.write_out("Trash is empty\n");
            return;
        }

        let mut table = format!("\n{:<40} {:<20} {:<15}\n{}\n", "Original Path", "Deleted At", "Size", "-".repeat(80));
        for item in items {
            let deleted_at = item.deleted_at.with_timezone(&Local).format(DISPLAY_TIME_FORMAT);
            table.push_str(&format!(
                "{:<40} {:<20} {:<15}\n",
                truncate(&item.original_path.display().to_string(), 40),
                deleted_at.to_string(),
                format_size(item.size),
            ));
        }
        table.push('\n');
        self.write_out(&table);
    }

    fn select_item(&mut self, items: &[TrashedItem]) -> Result<String> {
        if items.is_empty() {
            bail!("no items to select");
        }
        let mut menu = String::new();
        for (index, item) in items.iter().enumerate() {
            menu.push_str(&format!("{}. {}\n", index + 1, item.original_path.display()));
        }
        menu.push_str("\nSelect item number: ");
        self.write_out(&menu);

        let input = self.read_line()?;
        let selection: usize = input.parse().map_err(|_| anyhow!("invalid selection: {input:?}"))?;
        selection
            .checked_sub(1)
            .and_then(|index| items.get(index))
            .map(|item| item.trash_name().to_string())
            .ok_or_else(|| anyhow!("invalid selection: {selection}"))
    }

    fn success(&mut self, message: &str) {
        self.write_out(&format!("✓ {message}\n"));
    }

    fn error(&mut self, message: &str) {
        self.write_err(&format!("✗ Error: {message}\n"));
    }

    fn info(&mut self, message: &str) {
        self.write_out(&format!("ℹ {message}\n"));
    }

    fn warn(&mut self, message: &str) {
        self.write_err(&format!("⚠ Warning: {message}\n"));
    }

    fn print(&mut self, line: &str) {
        self.write_out(&format!("{line}\n"));
    }
}

const GUM: &str = "gum";

pub struct FancyUi {
    gum: Option<PathBuf>,
    basic: BasicUi<BufReader<Stdin>, Stdout, io::Stderr>,
}

impl FancyUi {
    pub fn new() -> Self {
        Self {
            gum: find_gum(env::var_os("PATH")),
            basic: BasicUi::stdio(),
        }
    }

    fn style(&self, gum: &Path, color: u8, text: &str, to_stderr: bool) -> bool {
        let mut command = Command::new(gum);
        command.arg("style").arg(format!("--foreground={color}")).arg(text);
        if to_stderr {
            command.stdout(Stdio::from(io::stderr()));
        }
        command.status().map(|status| status.success()).unwrap_or(false)
    }
}

impl Default for FancyUi {
    fn default() -> Self {
        Self::new()
    }
}

impl Ui for FancyUi {
    fn confirm(&mut self, message: &str) -> bool {
        match &self.gum {
            Some(gum) => Command::new(gum)
                .arg("confirm")
                .arg(message)
                .status()
                .map(|status| status.success())
                .unwrap_or(false),
            None => self.basic.confirm(message),
        }
    }

    fn display_items(&mut self, items: &[TrashedItem]) {
        if items.is_empty() {
            self.info("Trash is empty");
            return;
        }
        self.basic.display_items(items);
    }

    fn select_item(&mut self, items: &[TrashedItem]) -> Result<String> {
        if items.is_empty() {
            bail!("no items to select");
        }
        let Some(gum) = &self.gum else {
            return self.basic.select_item(items);
        };

        let options: Vec<String> = items.iter().map(choice_label).collect();
        let mut child = Command::new(gum)
            .arg("choose")
            .arg("--header=Select item to restore:")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .context("failed to start gum")?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(options.join("\n").as_bytes())
                .context("failed to send choices to gum")?;
        }
        let output = child.wait_with_output().context("gum did not finish")?;
        if !output.status.success() {
            bail!("selection cancelled");
        }

        let chosen = String::from_utf8_lossy(&output.stdout).trim().to_string();
        items
            .iter()
            .zip(&options)
            .find(|(_, label)| **label == chosen)
            .map(|(item, _)| item.trash_name().to_string())
            .ok_or_else(|| anyhow!("item not found: {chosen}"))
    }

    fn success(&mut self, message: &str) {
        let text = format!("✓ {message}");
        if !self.gum.as_ref().is_some_and(|gum| self.style(gum, 2, &text, false)) {
            self.basic.success(message);
        }
    }

    fn error(&mut self, message: &str) {
        let text = format!("✗ Error: {message}");
        if !self.gum.as_ref().is_some_and(|gum| self.style(gum, 1, &text, true)) {
            self.basic.error(message);
        }
    }

    fn info(&mut self, message: &str) {
        let text = format!("ℹ {message}");
        if !self.gum.as_ref().is_some_and(|gum| self.style(gum, 4, &text, false)) {
            self.basic.info(message);
        }
    }

    fn warn(&mut self, message: &str) {
        let text = format!("⚠ Warning: {message}");
        if !self.gum.as_ref().is_some_and(|gum| self.style(gum, 3, &text, true)) {
            self.basic.warn(message);
        }
    }

    fn print(&mut self, line: &str) {
        self.basic.print(line);
    }
}

/// Original path plus trash name, so items trashed from the same place stay distinguishable.
fn choice_label(item: &TrashedItem) -> String {
    format!("{} [{}]", item.original_path.display(), item.trash_name())
}

/// First executable `gum` on `search_path`; files without the executable bit are passed over.
fn find_gum(search_path: Option<OsString>) -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    which::which_in(GUM, search_path, cwd).ok()
}
