use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use globset::{Glob, GlobMatcher, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::spec::{
    CopyTreeError, EnumCopyErrorKind, EnumCopyFileConflictStrategy, EnumCopyPatternMode,
    SpecCopyError, SpecCopyOptions,
};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypeCopyPatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypeCopyPatternSeq {
    fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            Self::Glob(v) => v.iter().any(|p| p.is_match(value)),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

/// Compiled filters for one run.
#[derive(Debug, Clone, Default)]
pub(crate) struct SpecCopyPatterns {
    pub(crate) patterns_include_files: Option<TypeCopyPatternSeq>,
    pub(crate) patterns_exclude_files: Option<TypeCopyPatternSeq>,
    pub(crate) patterns_exclude_dirs: Option<TypeCopyPatternSeq>,
    pub(crate) globs_exclude_extensions: Option<GlobSet>,
}

impl SpecCopyPatterns {
    pub(crate) fn from_options(spec_cp_options: &SpecCopyOptions) -> Result<Self, CopyTreeError> {
        let rule_pattern = spec_cp_options.rule_pattern;
        Ok(Self {
            patterns_include_files: _compile(
                spec_cp_options.patterns_include_files.as_deref(),
                rule_pattern,
            )?,
            patterns_exclude_files: _compile(
                spec_cp_options.patterns_exclude_files.as_deref(),
                rule_pattern,
            )?,
            patterns_exclude_dirs: _compile(
                spec_cp_options.patterns_exclude_dirs.as_deref(),
                rule_pattern,
            )?,
            globs_exclude_extensions: _compile_extensions(&spec_cp_options.extensions_exclude)?,
        })
    }

    /// `true` when a file with basename `name_file` must not be copied.
    pub(crate) fn should_exclude_file(&self, name_file: &str) -> bool {
        if self
            .globs_exclude_extensions
            .as_ref()
            .is_some_and(|set| set.is_match(name_file))
        {
            return true;
        }
        let b_included = self
            .patterns_include_files
            .as_ref()
            .is_none_or(|p| p.is_match(name_file));
        let b_excluded = self
            .patterns_exclude_files
            .as_ref()
            .is_some_and(|p| p.is_match(name_file));
        !b_included || b_excluded
    }

    /// `true` when the subtree rooted at directory `name_dir` must not be copied.
    pub(crate) fn should_exclude_dir(&self, name_dir: &str) -> bool {
        self.patterns_exclude_dirs
            .as_ref()
            .is_some_and(|p| p.is_match(name_dir))
    }
}

fn _invalid_pattern(e: impl std::fmt::Display) -> CopyTreeError {
    CopyTreeError::InvalidPattern(format!("Invalid pattern in include/exclude: {e}"))
}

fn _compile(
    patterns: Option<&[String]>,
    rule_pattern: EnumCopyPatternMode,
) -> Result<Option<TypeCopyPatternSeq>, CopyTreeError> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }

    match rule_pattern {
        EnumCopyPatternMode::Literal => Ok(Some(TypeCopyPatternSeq::Literal(patterns.to_vec()))),
        EnumCopyPatternMode::Glob => {
            let l_glob = patterns
                .iter()
                .map(|pattern| {
                    Glob::new(pattern)
                        .map(|g| g.compile_matcher())
                        .map_err(_invalid_pattern)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(TypeCopyPatternSeq::Glob(l_glob)))
        }
        EnumCopyPatternMode::Regex => {
            let l_regex = patterns
                .iter()
                .map(|pattern| Regex::new(pattern).map_err(_invalid_pattern))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(TypeCopyPatternSeq::Regex(l_regex)))
        }
    }
}

fn _compile_extensions(extensions: &[String]) -> Result<Option<GlobSet>, CopyTreeError> {
    if extensions.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for ext in extensions {
        let ext = ext.trim().trim_start_matches('.');
        if ext.is_empty() {
            continue;
        }
        builder.add(Glob::new(&format!("*.{ext}")).map_err(_invalid_pattern)?);
    }
    builder.build().map(Some).map_err(_invalid_pattern)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// Resolve as much of `path` as exists, then append the missing tail.
fn _normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    let path_abs = _absolutize_path(path);
    let mut l_tail = Vec::new();
    let mut path_cursor = path_abs.as_path();
    while let Some(parent) = path_cursor.parent() {
        if let Some(name) = path_cursor.file_name() {
            l_tail.push(name.to_os_string());
        }
        if let Ok(resolved) = fs::canonicalize(parent) {
            let mut path_out = resolved;
            path_out.extend(l_tail.iter().rev());
            return path_out;
        }
        path_cursor = parent;
    }
    path_abs
}

pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = _normalize_path(src);
    let dst_resolved = _normalize_path(dst);
    dst_resolved.starts_with(&src_resolved) || src_resolved.starts_with(&dst_resolved)
}

fn _unsafe_destination(path: &Path, message: String) -> SpecCopyError {
    SpecCopyError::new(path.to_path_buf(), EnumCopyErrorKind::UnsafeDestination, message)
}

/// Refuse destination items that would be written through a symlink.
///
/// Every component between the destination root and `path_dst_item` must
/// either be missing or not be a symlink. The item itself may be a symlink
/// only when `if_allow_symlink_leaf` is set (it is unlinked, never followed).
pub(crate) fn validate_destination_path_safety(
    path_dst_item: &Path,
    path_dir_dst_root: &Path,
    if_allow_symlink_leaf: bool,
) -> Result<(), SpecCopyError> {
    let path_dir_dst_root_abs = _absolutize_path(path_dir_dst_root);
    let path_dst_item_abs = _absolutize_path(path_dst_item);

    let path_rel = path_dst_item_abs
        .strip_prefix(&path_dir_dst_root_abs)
        .map_err(|_| {
            _unsafe_destination(
                path_dst_item,
                format!(
                    "Unsafe destination path escapes destination root: {} (root={})",
                    path_dst_item.display(),
                    path_dir_dst_root.display()
                ),
            )
        })?;

    let n_parts = path_rel.components().count();
    let mut path_cursor = path_dir_dst_root_abs;
    for (n_idx, part_rel) in path_rel.components().enumerate() {
        path_cursor.push(part_rel.as_os_str());
        let b_is_leaf = n_idx + 1 == n_parts;
        match fs::symlink_metadata(&path_cursor) {
            Ok(meta_cursor) if meta_cursor.file_type().is_symlink() => {
                if b_is_leaf && if_allow_symlink_leaf {
                    break;
                }
                return Err(_unsafe_destination(
                    path_dst_item,
                    format!(
                        "Unsafe destination path traverses symlink component: {}",
                        path_cursor.display()
                    ),
                ));
            }
            Ok(_) => {}
            // Nothing below a missing component can exist either.
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => {
                return Err(SpecCopyError::new(
                    path_dst_item.to_path_buf(),
                    EnumCopyErrorKind::from_io(&e),
                    format!(
                        "Failed to inspect destination path component {} ({e})",
                        path_cursor.display()
                    ),
                ));
            }
        }
    }

    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ConflictAndCopy

/// What to do with a file whose destination may already exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EnumFileConflictOutcome {
    /// Destination is free (or will be replaced); go ahead.
    Proceed,
    /// Leave the existing destination alone.
    Skip,
    /// Record this error and leave the destination alone.
    Fail(SpecCopyError),
}

pub(crate) fn resolve_file_conflict(
    path_dst: &Path,
    rule_conflict: EnumCopyFileConflictStrategy,
) -> EnumFileConflictOutcome {
    let Ok(meta_dst) = fs::symlink_metadata(path_dst) else {
        return EnumFileConflictOutcome::Proceed;
    };
    if meta_dst.is_dir() {
        return EnumFileConflictOutcome::Fail(SpecCopyError::new(
            path_dst.to_path_buf(),
            EnumCopyErrorKind::DestinationExists,
            format!("Destination is a directory: {}", path_dst.display()),
        ));
    }

    match rule_conflict {
        EnumCopyFileConflictStrategy::Skip => EnumFileConflictOutcome::Skip,
        EnumCopyFileConflictStrategy::Error => EnumFileConflictOutcome::Fail(SpecCopyError::new(
            path_dst.to_path_buf(),
            EnumCopyErrorKind::DestinationExists,
            format!("Destination exists: {}", path_dst.display()),
        )),
        EnumCopyFileConflictStrategy::Overwrite => EnumFileConflictOutcome::Proceed,
    }
}

static N_NEXT_STAGING_ID: AtomicU64 = AtomicU64::new(0);

/// A hidden sibling of the destination that receives the bytes before they
/// replace the destination. Removed on drop unless committed.
struct StagedDestination {
    path_staged: PathBuf,
    path_final: PathBuf,
    if_committed: bool,
}

impl StagedDestination {
    fn create(path_final: &Path) -> io::Result<(Self, fs::File)> {
        let path_dir = path_final.parent().unwrap_or_else(|| Path::new("."));
        let name_final = path_final
            .file_name()
            .map(|v| v.to_string_lossy().into_owned())
            .unwrap_or_default();
        loop {
            let n_id = N_NEXT_STAGING_ID.fetch_add(1, AtomicOrdering::Relaxed);
            let path_staged = path_dir.join(format!(
                ".{name_final}.{}.{n_id}.treecopy",
                std::process::id()
            ));
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path_staged)
            {
                Ok(file) => {
                    return Ok((
                        Self {
                            path_staged,
                            path_final: path_final.to_path_buf(),
                            if_committed: false,
                        },
                        file,
                    ));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn commit(mut self) -> io::Result<()> {
        match fs::rename(&self.path_staged, &self.path_final) {
            Ok(()) => {}
            // Platforms that refuse to rename over an existing or read-only file.
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::PermissionDenied
                ) =>
            {
                remove_existing_file(&self.path_final)?;
                fs::rename(&self.path_staged, &self.path_final)?;
            }
            Err(e) => return Err(e),
        }
        self.if_committed = true;
        Ok(())
    }
}

impl Drop for StagedDestination {
    fn drop(&mut self) {
        if !self.if_committed {
            let _ = fs::remove_file(&self.path_staged);
        }
    }
}

fn remove_existing_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Copy file bytes from `path_file_src` to `path_file_dst`, replacing any
/// existing destination file. Returns the number of bytes written.
///
/// The source is opened first and the bytes land in a staged sibling that is
/// renamed over the destination only once fully written, so a failed copy
/// leaves an earlier copy untouched. Permission bits follow the source.
pub(crate) fn copy_file_contents(path_file_src: &Path, path_file_dst: &Path) -> io::Result<u64> {
    let mut file_src = fs::File::open(path_file_src)?;
    let stat_src = file_src.metadata()?;

    let (staged_dst, mut file_dst) = StagedDestination::create(path_file_dst)?;
    let n_bytes = io::copy(&mut file_src, &mut file_dst)?;
    file_dst.set_permissions(stat_src.permissions())?;
    drop(file_dst);
    staged_dst.commit()?;
    Ok(n_bytes)
}

/// Recreate the symlink `path_src` at `path_dst`, replacing an existing
/// non-directory entry.
pub(crate) fn create_symbolic_link(path_src: &Path, path_dst: &Path) -> io::Result<()> {
    let target = fs::read_link(path_src)?;
    remove_existing_file(path_dst)?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&target, path_dst)
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::{symlink_dir, symlink_file};
        if path_src.is_dir() {
            symlink_dir(&target, path_dst)
        } else {
            symlink_file(&target, path_dst)
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = target;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Symbolic links are unsupported on this platform",
        ))
    }
}

/// Apply permissions, access/modification times and (Linux) xattrs of
/// `path_file_src` to `path_file_dst`.
pub(crate) fn apply_file_metadata(path_file_src: &Path, path_file_dst: &Path) -> io::Result<()> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;

    #[cfg(target_os = "linux")]
    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(_) => return,
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            tracing::debug!(
                path = %path_file_dst.display(),
                name = ?name,
                "xattr not copied: {e}"
            );
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
