//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use treecopy_fs::{
    EnumCopyFileConflictStrategy, EnumCopyPatternMode, EnumCopySymlinkStrategy, SpecCopyOptions,
};

#[derive(Parser, Debug)]
#[command(
    name = "treecopy",
    version,
    about = "Recursively copy a directory tree, skipping hidden entries",
    long_about = "treecopy mirrors SOURCE into DESTINATION, leaving out every file and \
                  folder whose name starts with '.', and keeps going when a single file \
                  cannot be copied.\n\n\
                  Run it without arguments to be prompted for the two directories and \
                  the extensions to exclude."
)]
pub struct Cli {
    /// Directory to copy from (prompted when omitted)
    #[arg(requires = "destination")]
    pub source: Option<PathBuf>,

    /// Directory to copy into (prompted when omitted)
    pub destination: Option<PathBuf>,

    /// File extensions to leave out, e.g. `exe,sys,tmp` (repeatable)
    #[arg(short = 'x', long = "exclude", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Directory names to leave out, matched with --pattern-mode (repeatable)
    #[arg(long = "exclude-dir")]
    pub exclude_dir: Vec<String>,

    /// How --exclude-dir patterns are interpreted
    #[arg(long, value_enum, default_value_t = PatternMode::Glob)]
    pub pattern_mode: PatternMode,

    /// What to do when a destination file already exists
    #[arg(long, value_enum, default_value_t = ConflictMode::Overwrite)]
    pub on_conflict: ConflictMode,

    /// How symbolic links in the source are handled
    #[arg(long, value_enum, default_value_t = SymlinkMode::Dereference)]
    pub symlinks: SymlinkMode,

    /// Do not carry permissions, timestamps or extended attributes over
    #[arg(long)]
    pub no_metadata: bool,

    /// Walk and report without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Where the per-file log is appended
    #[arg(long, default_value = "copy_log.txt")]
    pub log_file: PathBuf,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PatternMode {
    Glob,
    Regex,
    Literal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConflictMode {
    Overwrite,
    Skip,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SymlinkMode {
    Dereference,
    Copy,
    Skip,
}

impl From<PatternMode> for EnumCopyPatternMode {
    fn from(value: PatternMode) -> Self {
        match value {
            PatternMode::Glob => Self::Glob,
            PatternMode::Regex => Self::Regex,
            PatternMode::Literal => Self::Literal,
        }
    }
}

impl From<ConflictMode> for EnumCopyFileConflictStrategy {
    fn from(value: ConflictMode) -> Self {
        match value {
            ConflictMode::Overwrite => Self::Overwrite,
            ConflictMode::Skip => Self::Skip,
            ConflictMode::Error => Self::Error,
        }
    }
}

impl From<SymlinkMode> for EnumCopySymlinkStrategy {
    fn from(value: SymlinkMode) -> Self {
        match value {
            SymlinkMode::Dereference => Self::Dereference,
            SymlinkMode::Copy => Self::CopySymlinks,
            SymlinkMode::Skip => Self::SkipSymlinks,
        }
    }
}

impl Cli {
    /// Library options for this invocation; `extensions` comes from the
    /// prompt or from `--exclude`.
    pub fn copy_options(&self, extensions: &[String]) -> SpecCopyOptions {
        let spec_cp_options = SpecCopyOptions {
            patterns_exclude_dirs: (!self.exclude_dir.is_empty()).then(|| self.exclude_dir.clone()),
            rule_pattern: self.pattern_mode.into(),
            rule_conflict_file: self.on_conflict.into(),
            rule_symlink: self.symlinks.into(),
            if_preserve_metadata: !self.no_metadata,
            if_dry_run: self.dry_run,
            ..SpecCopyOptions::default()
        };
        spec_cp_options.with_excluded_extensions(extensions)
    }
}
