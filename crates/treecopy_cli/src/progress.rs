//! Console reporting: per-entry status lines plus an optional progress bar.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use treecopy_fs::{EnumSkipReason, EventCopy};

pub struct ConsoleReporter {
    progress_bar: Option<ProgressBar>,
}

impl ConsoleReporter {
    /// `n_total` sizes the bar; pass `if_show_bar = false` for plain output.
    pub fn new(n_total: u64, if_show_bar: bool) -> Self {
        let progress_bar = if_show_bar.then(|| {
            let pb = ProgressBar::new(n_total);
            pb.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} files [{elapsed_precise}<{eta}]")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });
        Self { progress_bar }
    }

    pub fn on_event(&mut self, event: &EventCopy<'_>) {
        if let Some(line) = status_line(event) {
            self.print_line(&line);
        }
        if counts_toward_total(event)
            && let Some(pb) = &self.progress_bar
        {
            pb.inc(1);
        }
    }

    pub fn finish(self) {
        if let Some(pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn print_line(&self, line: &str) {
        match &self.progress_bar {
            Some(pb) => pb.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }
}

/// Console line for one event. Hidden entries and created directories stay
/// silent; they only reach the log.
pub fn status_line(event: &EventCopy<'_>) -> Option<String> {
    match event {
        EventCopy::DirCreated { .. } => None,
        EventCopy::FileCopied { path_src, .. } => Some(format_copied(path_src)),
        EventCopy::EntrySkipped {
            reason: EnumSkipReason::Hidden,
            ..
        } => None,
        EventCopy::EntrySkipped { path, reason, .. } => {
            Some(format_skipped(reason.as_str(), path))
        }
        EventCopy::EntryFailed { error } => Some(format_skipped(&error.exception, &error.path)),
    }
}

/// Whether the event settles one of the files counted by
/// `count_copy_candidates`.
fn counts_toward_total(event: &EventCopy<'_>) -> bool {
    let b_filtered = matches!(
        event,
        EventCopy::EntrySkipped {
            reason: EnumSkipReason::Hidden | EnumSkipReason::Excluded,
            ..
        }
    );
    event.is_file_outcome() && !b_filtered
}

fn format_copied(path: &Path) -> String {
    format!("Copied: {}", path.display())
}

fn format_skipped(reason: &str, path: &Path) -> String {
    format!("Skipped ({reason}): {}", path.display())
}
