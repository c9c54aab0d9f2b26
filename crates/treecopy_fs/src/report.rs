//! Copy report models, per-entry events and the mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::spec::{EnumSkipReason, SpecCopyError};

/// One per-entry outcome, delivered to the `copy_tree_with` callback as it happens.
#[derive(Debug, Clone, Copy)]
pub enum EventCopy<'a> {
    /// A mirrored destination directory now exists.
    DirCreated { path: &'a Path },
    /// A file was written to the destination.
    FileCopied {
        path_src: &'a Path,
        path_dst: &'a Path,
        n_bytes: u64,
    },
    /// An entry was left out by policy. Hidden and excluded directories are
    /// reported once for the whole subtree.
    EntrySkipped {
        path: &'a Path,
        reason: EnumSkipReason,
        if_is_dir: bool,
    },
    /// A skippable failure; traversal goes on.
    EntryFailed { error: &'a SpecCopyError },
}

impl EventCopy<'_> {
    /// Whether this event settles one file (as opposed to a directory).
    ///
    /// When no directory-level failure occurs, the number of such events in a
    /// run equals [`count_copy_candidates`](crate::copy::count_copy_candidates)
    /// plus the files skipped as hidden or excluded. A directory whose mirror
    /// cannot be created settles its whole subtree with one directory-level
    /// event, so the run then has fewer file outcomes than the count.
    pub fn is_file_outcome(&self) -> bool {
        match self {
            Self::DirCreated { .. } => false,
            Self::FileCopied { .. } => true,
            Self::EntrySkipped { if_is_dir, .. } => !if_is_dir,
            Self::EntryFailed { error } => !error.if_is_dir,
        }
    }
}

/// Aggregate counters and diagnostics for one `copy_tree` run.
#[derive(Debug, Default, Clone)]
pub struct ReportCopy {
    /// Non-hidden files seen during traversal.
    pub cnt_scanned: u64,
    /// Scanned files that passed include/exclude filters.
    pub cnt_matched: u64,
    /// Files written to the destination.
    pub cnt_copied: u64,
    /// Entries skipped by policy (hidden, excluded, conflict, dry-run, symlink).
    pub cnt_skipped: u64,
    /// Destination directories created (or already present and reused).
    pub cnt_dirs_created: u64,
    /// Bytes written by file copies.
    pub n_bytes_copied: u64,
    /// Non-fatal warnings collected during traversal/copy.
    pub warnings: Vec<String>,
    /// Per-entry failures.
    pub errors: Vec<SpecCopyError>,
}

impl ReportCopy {
    /// Number of collected hard errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_matched".to_string(), self.cnt_matched);
        dict_counts.insert("cnt_copied".to_string(), self.cnt_copied);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_dirs_created".to_string(), self.cnt_dirs_created);
        dict_counts.insert("n_bytes_copied".to_string(), self.n_bytes_copied);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} scanned={} matched={} copied={} skipped={} dirs={} bytes={} errors={} warnings={}",
            self.cnt_scanned,
            self.cnt_matched,
            self.cnt_copied,
            self.cnt_skipped,
            self.cnt_dirs_created,
            self.n_bytes_copied,
            self.error_count(),
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[COPY]"))
    }
}

/// Mutable accumulator for copy statistics.
///
/// Every record method also forwards an [`EventCopy`] to the run's observer.
pub(crate) struct ReportCopyBuilder<'f> {
    report: ReportCopy,
    on_event: &'f mut dyn FnMut(&EventCopy<'_>),
}

impl<'f> ReportCopyBuilder<'f> {
    pub(crate) fn new(on_event: &'f mut dyn FnMut(&EventCopy<'_>)) -> Self {
        Self {
            report: ReportCopy::default(),
            on_event,
        }
    }

    pub(crate) fn add_scanned(&mut self) {
        self.report.cnt_scanned += 1;
    }

    pub(crate) fn add_matched(&mut self) {
        self.report.cnt_matched += 1;
    }

    pub(crate) fn add_dir_created(&mut self, path: &Path) {
        self.report.cnt_dirs_created += 1;
        tracing::debug!(path = %path.display(), "directory ready");
        (self.on_event)(&EventCopy::DirCreated { path });
    }

    pub(crate) fn add_copied(&mut self, path_src: &Path, path_dst: &Path, n_bytes: u64) {
        self.report.cnt_copied += 1;
        self.report.n_bytes_copied += n_bytes;
        tracing::info!(src = %path_src.display(), dst = %path_dst.display(), n_bytes, "copied");
        (self.on_event)(&EventCopy::FileCopied {
            path_src,
            path_dst,
            n_bytes,
        });
    }

    pub(crate) fn add_skipped(&mut self, path: &Path, reason: EnumSkipReason, if_is_dir: bool) {
        self.report.cnt_skipped += 1;
        tracing::info!(path = %path.display(), %reason, if_is_dir, "skipped");
        (self.on_event)(&EventCopy::EntrySkipped {
            path,
            reason,
            if_is_dir,
        });
    }

    pub(crate) fn add_warning(&mut self, warning: String) {
        tracing::warn!("{warning}");
        self.report.warnings.push(warning);
    }

    pub(crate) fn add_error(&mut self, error: SpecCopyError) {
        tracing::error!(
            path = %error.path.display(),
            kind = ?error.kind,
            "{}",
            error.exception
        );
        (self.on_event)(&EventCopy::EntryFailed { error: &error });
        self.report.errors.push(error);
    }

    /// Finalize builder into immutable report.
    pub(crate) fn build(self) -> ReportCopy {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{EventCopy, ReportCopy, ReportCopyBuilder};
    use crate::spec::{EnumCopyErrorKind, EnumSkipReason, SpecCopyError};

    #[test]
    fn report_copy_to_dict_and_format() {
        let report = ReportCopy {
            cnt_scanned: 8,
            cnt_matched: 5,
            cnt_copied: 3,
            cnt_skipped: 2,
            cnt_dirs_created: 1,
            n_bytes_copied: 42,
            warnings: vec!["w".to_string()],
            errors: vec![],
        };

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_matched"], 5);
        assert_eq!(dict_counts["cnt_scanned"], 8);
        assert_eq!(dict_counts["cnt_copied"], 3);
        assert_eq!(dict_counts["cnt_skipped"], 2);
        assert_eq!(dict_counts["n_bytes_copied"], 42);
        assert_eq!(dict_counts["cnt_errors"], 0);
        assert_eq!(dict_counts["cnt_warnings"], 1);

        let txt = report.format("[COPY]");
        assert_eq!(
            txt,
            "[COPY] scanned=8 matched=5 copied=3 skipped=2 dirs=1 bytes=42 errors=0 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }

    #[test]
    fn builder_forwards_events_in_order() {
        let mut l_seen: Vec<String> = Vec::new();
        let mut on_event = |event: &EventCopy<'_>| {
            l_seen.push(match event {
                EventCopy::DirCreated { .. } => "dir".to_string(),
                EventCopy::FileCopied { n_bytes, .. } => format!("copied:{n_bytes}"),
                EventCopy::EntrySkipped { reason, .. } => format!("skipped:{reason}"),
                EventCopy::EntryFailed { error } => format!("failed:{}", error.exception),
            });
        };

        let mut builder = ReportCopyBuilder::new(&mut on_event);
        builder.add_dir_created(&PathBuf::from("/dst/a"));
        builder.add_copied(&PathBuf::from("/src/a/f"), &PathBuf::from("/dst/a/f"), 7);
        builder.add_skipped(&PathBuf::from("/src/.git"), EnumSkipReason::Hidden, true);
        builder.add_error(SpecCopyError {
            path: PathBuf::from("/src/locked"),
            kind: EnumCopyErrorKind::PermissionDenied,
            exception: "denied".to_string(),
            if_is_dir: false,
        });
        let report = builder.build();

        assert_eq!(report.cnt_copied, 1);
        assert_eq!(report.cnt_skipped, 1);
        assert_eq!(report.n_bytes_copied, 7);
        assert_eq!(report.error_count(), 1);
        assert_eq!(
            l_seen,
            vec!["dir", "copied:7", "skipped:hidden", "failed:denied"]
        );
    }
}
