//! Copy specification models and error types.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Symlink handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopySymlinkStrategy {
    /// Follow the link and copy the target bytes/entries.
    Dereference,
    /// Create a symbolic link at destination (do not copy target bytes).
    CopySymlinks,
    /// Ignore symlink entries.
    SkipSymlinks,
}

/// Existing destination file conflict policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopyFileConflictStrategy {
    /// Keep destination file and skip current source file.
    Skip,
    /// Replace destination file with source file.
    Overwrite,
    /// Record an error and skip this file.
    Error,
}

/// Pattern matching mode for include/exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopyPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

/// Why an entry was left out of the destination without being an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSkipReason {
    /// Name starts with `.`.
    Hidden,
    /// Rejected by include/exclude patterns.
    Excluded,
    /// Destination exists and the conflict rule is `Skip`.
    DestinationExists,
    /// Dry run; nothing is written.
    DryRun,
    /// Symlink under `SkipSymlinks`.
    Symlink,
    /// Fifo, socket, device or other non-regular entry.
    SpecialFile,
}

impl EnumSkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Excluded => "excluded",
            Self::DestinationExists => "exists",
            Self::DryRun => "dry run",
            Self::Symlink => "symlink",
            Self::SpecialFile => "special file",
        }
    }
}

impl fmt::Display for EnumSkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a skippable per-entry failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopyErrorKind {
    /// Access denied on source or destination.
    PermissionDenied,
    /// Entry vanished between listing and copying.
    NotFound,
    /// Destination path would traverse or replace a symlink.
    UnsafeDestination,
    /// Symlink target does not exist.
    BrokenSymlink,
    /// Destination exists and the conflict rule is `Error`.
    DestinationExists,
    /// Any other I/O failure.
    Io,
}

impl EnumCopyErrorKind {
    pub fn from_io(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Io,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for `copy_tree`.
#[derive(Debug, Clone)]
pub struct SpecCopyOptions {
    /// Include patterns applied to file basename.
    pub patterns_include_files: Option<Vec<String>>,
    /// Exclude patterns applied to file basename.
    pub patterns_exclude_files: Option<Vec<String>>,
    /// Exclude patterns applied to directory basename.
    pub patterns_exclude_dirs: Option<Vec<String>>,
    /// File extensions (without the leading dot) that are never copied.
    ///
    /// Matched as `*.<ext>` globs regardless of `rule_pattern`.
    pub extensions_exclude: Vec<String>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumCopyPatternMode,
    /// Conflict behavior for destination files.
    pub rule_conflict_file: EnumCopyFileConflictStrategy,
    /// Symlink handling behavior.
    pub rule_symlink: EnumCopySymlinkStrategy,
    /// Drop entries whose name starts with `.`.
    pub if_skip_hidden: bool,
    /// Carry permissions, timestamps and (on Linux) xattrs over to copies.
    pub if_preserve_metadata: bool,
    /// Do not mutate filesystem; record what would happen.
    pub if_dry_run: bool,
}

impl Default for SpecCopyOptions {
    fn default() -> Self {
        Self {
            patterns_include_files: None,
            patterns_exclude_files: None,
            patterns_exclude_dirs: None,
            extensions_exclude: Vec::new(),
            rule_pattern: EnumCopyPatternMode::Glob,
            rule_conflict_file: EnumCopyFileConflictStrategy::Overwrite,
            rule_symlink: EnumCopySymlinkStrategy::Dereference,
            if_skip_hidden: true,
            if_preserve_metadata: true,
            if_dry_run: false,
        }
    }
}

impl SpecCopyOptions {
    /// Exclude files by extension (`"exe"`, `".tmp"`, `"tar.gz"`); blank items are ignored.
    pub fn with_excluded_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions_exclude.extend(
            extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty()),
        );
        self
    }
}

/// One skippable copy failure: path + classification + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCopyError {
    /// Failed source or destination path.
    pub path: PathBuf,
    /// Failure class.
    pub kind: EnumCopyErrorKind,
    /// User-facing error text.
    pub exception: String,
    /// The failure concerns a whole directory (and so its subtree).
    pub if_is_dir: bool,
}

impl SpecCopyError {
    pub fn new(path: PathBuf, kind: EnumCopyErrorKind, exception: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            exception: exception.into(),
            if_is_dir: false,
        }
    }

    pub fn from_io(path: PathBuf, error: &io::Error) -> Self {
        Self::new(path, EnumCopyErrorKind::from_io(error), error.to_string())
    }

    /// Mark the failure as covering a directory subtree.
    pub fn on_dir(mut self) -> Self {
        self.if_is_dir = true;
        self
    }
}

impl fmt::Display for SpecCopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.exception)
    }
}

/// Fatal errors: the run is aborted before anything is copied.
#[derive(Debug, Error)]
pub enum CopyTreeError {
    /// Invalid include/exclude pattern.
    #[error("{0}")]
    InvalidPattern(String),

    /// Source path does not exist.
    #[error("Source directory does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Source path is not a directory.
    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    /// Source root exists but cannot be listed.
    #[error("Failed to read source directory {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Source and destination overlap (`src` contains `dst` or vice versa).
    #[error(
        "Source and destination directories overlap: {} <-> {}",
        path_source.display(),
        path_destination.display()
    )]
    SourceDestinationOverlap {
        /// Source directory as given.
        path_source: PathBuf,
        /// Destination directory as given.
        path_destination: PathBuf,
    },

    /// Destination directory initialization failed.
    #[error("Failed to initialize destination {}: {message}", path.display())]
    DestinationInitFailed {
        /// Destination path that failed initialization.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
