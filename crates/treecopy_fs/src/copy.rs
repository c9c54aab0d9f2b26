//! Filesystem tree traversal and copy orchestration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::report::{EventCopy, ReportCopy, ReportCopyBuilder};
use crate::spec::{
    CopyTreeError, EnumCopyErrorKind, EnumCopySymlinkStrategy, EnumSkipReason, SpecCopyError,
    SpecCopyOptions,
};
use crate::util::{
    EnumFileConflictOutcome, SpecCopyPatterns, apply_file_metadata, copy_file_contents,
    create_symbolic_link, is_overlap, resolve_file_conflict, validate_destination_path_safety,
};
use crate::walk::{SpecDirEntry, SpecFileEntry, VisitEntry, is_hidden, read_visit_entry};

struct SpecCopyContext<'f> {
    path_dir_dst: PathBuf,
    spec_cp_options: SpecCopyOptions,
    spec_cp_pats: SpecCopyPatterns,
    builder_cp_report: ReportCopyBuilder<'f>,
    /// `(dev, ino)` of every directory on the path from the source root to
    /// the directory being walked.
    l_ancestor_dirs: Vec<(u64, u64)>,
}

/// Copy a directory tree from `dir_source` to `dir_destination`.
///
/// See [`copy_tree_with`]; this variant discards per-entry events.
pub fn copy_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_cp_options: SpecCopyOptions,
) -> Result<ReportCopy, CopyTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    copy_tree_with(dir_source, dir_destination, spec_cp_options, |_| {})
}

/// Copy a directory tree from `dir_source` to `dir_destination`, calling
/// `on_event` once per entry outcome as the walk proceeds.
///
/// The walk is top-down and sequential. At each level the files are handled
/// first, then every kept subdirectory is mirrored (created under the
/// destination) and descended into. Hidden entries and entries rejected by the
/// patterns in [`SpecCopyOptions`] are never written.
///
/// Returns [`ReportCopy`] when the run completes; per-entry failures (a file
/// that cannot be read, a directory that cannot be created) are stored in the
/// report and the walk continues. Returns [`CopyTreeError`] only for setup
/// failures: missing/unreadable source root, overlap, bad patterns, or a
/// destination root that cannot be created.
pub fn copy_tree_with<P, Q, F>(
    dir_source: P,
    dir_destination: Q,
    spec_cp_options: SpecCopyOptions,
    mut on_event: F,
) -> Result<ReportCopy, CopyTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    F: FnMut(&EventCopy<'_>),
{
    let path_dir_src = dir_source.as_ref().to_path_buf();
    let path_dir_dst = dir_destination.as_ref().to_path_buf();

    let visit_entry_root = open_source_root(&path_dir_src)?;
    if is_overlap(&path_dir_src, &path_dir_dst) {
        return Err(CopyTreeError::SourceDestinationOverlap {
            path_source: path_dir_src,
            path_destination: path_dir_dst,
        });
    }
    let spec_cp_pats = SpecCopyPatterns::from_options(&spec_cp_options)?;
    init_destination_root(&path_dir_dst, spec_cp_options.if_dry_run)?;

    tracing::info!(
        src = %path_dir_src.display(),
        dst = %path_dir_dst.display(),
        dry_run = spec_cp_options.if_dry_run,
        "copy started"
    );

    let mut spec_cp_ctx = SpecCopyContext {
        path_dir_dst: path_dir_dst.clone(),
        spec_cp_options,
        spec_cp_pats,
        builder_cp_report: ReportCopyBuilder::new(&mut on_event),
        l_ancestor_dirs: Vec::new(),
    };
    if spec_cp_ctx.spec_cp_options.rule_symlink == EnumCopySymlinkStrategy::Dereference {
        spec_cp_ctx
            .l_ancestor_dirs
            .extend(dir_identity(&path_dir_src));
    }

    walk_directory(visit_entry_root, &path_dir_dst, &mut spec_cp_ctx);

    let report = spec_cp_ctx.builder_cp_report.build();
    tracing::info!("{report}");
    Ok(report)
}

/// Number of files a run with these options would settle: non-hidden files
/// (including symlinks and special files) that pass the patterns, in every
/// directory the walk would descend into.
///
/// Used to size progress displays; nothing is written. Destination-side
/// failures are not foreseen: files below a directory whose mirror cannot be
/// created are counted here, while the run settles that whole subtree with a
/// single directory-level error.
pub fn count_copy_candidates<P>(
    dir_source: P,
    spec_cp_options: &SpecCopyOptions,
) -> Result<u64, CopyTreeError>
where
    P: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref();
    let visit_entry_root = open_source_root(path_dir_src)?;
    let spec_cp_pats = SpecCopyPatterns::from_options(spec_cp_options)?;

    let mut l_ancestor_dirs = Vec::new();
    if spec_cp_options.rule_symlink == EnumCopySymlinkStrategy::Dereference {
        l_ancestor_dirs.extend(dir_identity(path_dir_src));
    }
    Ok(count_directory_helper(
        visit_entry_root,
        spec_cp_options,
        &spec_cp_pats,
        &mut l_ancestor_dirs,
    ))
}

fn count_directory_helper(
    visit_entry: VisitEntry,
    spec_cp_options: &SpecCopyOptions,
    spec_cp_pats: &SpecCopyPatterns,
    l_ancestor_dirs: &mut Vec<(u64, u64)>,
) -> u64 {
    let mut n_candidates = visit_entry
        .l_files
        .iter()
        .filter(|f| classify_file(f, spec_cp_options, spec_cp_pats).is_none())
        .count() as u64;
    n_candidates += visit_entry.l_unreadable.len() as u64;

    for spec_dir_entry in visit_entry.l_dirs {
        if classify_dir(&spec_dir_entry, spec_cp_options, spec_cp_pats).is_some() {
            continue;
        }
        if spec_dir_entry.if_is_symlink {
            match spec_cp_options.rule_symlink {
                // Recreated as a link, settled like a file.
                EnumCopySymlinkStrategy::CopySymlinks => {
                    n_candidates += 1;
                    continue;
                }
                EnumCopySymlinkStrategy::SkipSymlinks => continue,
                EnumCopySymlinkStrategy::Dereference => {}
            }
        }
        let tuple_dir_identifier = match spec_cp_options.rule_symlink {
            EnumCopySymlinkStrategy::Dereference => dir_identity(&spec_dir_entry.path_dir_src_sub),
            _ => None,
        };
        if tuple_dir_identifier.is_some_and(|t| l_ancestor_dirs.contains(&t)) {
            continue;
        }
        let Ok(visit_entry_sub) = read_visit_entry(&spec_dir_entry.path_dir_src_sub) else {
            continue;
        };

        l_ancestor_dirs.extend(tuple_dir_identifier);
        n_candidates +=
            count_directory_helper(visit_entry_sub, spec_cp_options, spec_cp_pats, l_ancestor_dirs);
        if tuple_dir_identifier.is_some() {
            l_ancestor_dirs.pop();
        }
    }
    n_candidates
}

fn open_source_root(path_dir_src: &Path) -> Result<VisitEntry, CopyTreeError> {
    match fs::metadata(path_dir_src) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(CopyTreeError::SourceNotDirectory(path_dir_src.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CopyTreeError::SourceNotFound(path_dir_src.to_path_buf()));
        }
        Err(e) => {
            return Err(CopyTreeError::SourceUnreadable {
                path: path_dir_src.to_path_buf(),
                source: e,
            });
        }
    }
    read_visit_entry(path_dir_src).map_err(|e| CopyTreeError::SourceUnreadable {
        path: path_dir_src.to_path_buf(),
        source: e,
    })
}

fn init_destination_root(path_dir_dst: &Path, if_dry_run: bool) -> Result<(), CopyTreeError> {
    let init_failed = |message: String| CopyTreeError::DestinationInitFailed {
        path: path_dir_dst.to_path_buf(),
        message,
    };

    match fs::symlink_metadata(path_dir_dst) {
        Ok(meta) if meta.file_type().is_symlink() => {
            return Err(init_failed(
                "Destination root path must not be a symbolic link.".to_string(),
            ));
        }
        Ok(meta) if !meta.is_dir() => {
            return Err(init_failed("Destination exists and is not a directory.".to_string()));
        }
        Ok(_) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(init_failed(e.to_string())),
    }

    if if_dry_run {
        return Ok(());
    }
    fs::create_dir_all(path_dir_dst).map_err(|e| init_failed(e.to_string()))
}

#[cfg(unix)]
fn dir_identity(path_dir: &Path) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path_dir).ok().map(|m| (m.dev(), m.ino()))
}

#[cfg(not(unix))]
fn dir_identity(_path_dir: &Path) -> Option<(u64, u64)> {
    None
}

fn classify_dir(
    spec_dir_entry: &SpecDirEntry,
    spec_cp_options: &SpecCopyOptions,
    spec_cp_pats: &SpecCopyPatterns,
) -> Option<EnumSkipReason> {
    if spec_cp_options.if_skip_hidden && is_hidden(&spec_dir_entry.name_dir) {
        return Some(EnumSkipReason::Hidden);
    }
    if spec_cp_pats.should_exclude_dir(&spec_dir_entry.name_dir) {
        return Some(EnumSkipReason::Excluded);
    }
    None
}

fn classify_file(
    spec_file_entry: &SpecFileEntry,
    spec_cp_options: &SpecCopyOptions,
    spec_cp_pats: &SpecCopyPatterns,
) -> Option<EnumSkipReason> {
    if spec_cp_options.if_skip_hidden && is_hidden(&spec_file_entry.name_file) {
        return Some(EnumSkipReason::Hidden);
    }
    if spec_cp_pats.should_exclude_file(&spec_file_entry.name_file) {
        return Some(EnumSkipReason::Excluded);
    }
    None
}

/// Handle one listed directory whose destination counterpart is ready.
fn walk_directory(visit_entry: VisitEntry, path_dir_dst: &Path, spec_cp_ctx: &mut SpecCopyContext) {
    let VisitEntry {
        path_dir: _,
        l_dirs,
        l_files,
        l_unreadable,
    } = visit_entry;

    for spec_error in l_unreadable {
        spec_cp_ctx.builder_cp_report.add_error(spec_error);
    }

    for spec_file_entry in l_files {
        handle_file_entry(spec_file_entry, path_dir_dst, spec_cp_ctx);
    }

    for spec_dir_entry in l_dirs {
        if let Some((visit_entry_sub, path_dir_dst_sub, tuple_dir_identifier)) =
            handle_dir_entry(spec_dir_entry, path_dir_dst, spec_cp_ctx)
        {
            spec_cp_ctx.l_ancestor_dirs.extend(tuple_dir_identifier);
            walk_directory(visit_entry_sub, &path_dir_dst_sub, spec_cp_ctx);
            if tuple_dir_identifier.is_some() {
                spec_cp_ctx.l_ancestor_dirs.pop();
            }
        }
    }
}

/// Decide whether to descend into a subdirectory. On `Some`, the source has
/// been listed and the mirrored destination directory exists (or, in dry-run
/// mode, would be created); the third item is the directory's identity for
/// the ancestor chain.
fn handle_dir_entry(
    spec_dir_entry: SpecDirEntry,
    path_dir_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext,
) -> Option<(VisitEntry, PathBuf, Option<(u64, u64)>)> {
    let path_dir_src_sub = &spec_dir_entry.path_dir_src_sub;
    if let Some(reason) = classify_dir(
        &spec_dir_entry,
        &spec_cp_ctx.spec_cp_options,
        &spec_cp_ctx.spec_cp_pats,
    ) {
        spec_cp_ctx
            .builder_cp_report
            .add_skipped(path_dir_src_sub, reason, true);
        return None;
    }

    let path_dir_dst_sub = path_dir_dst.join(path_dir_src_sub.file_name()?);
    let enum_rule_symlink = spec_cp_ctx.spec_cp_options.rule_symlink;
    let if_dry_run = spec_cp_ctx.spec_cp_options.if_dry_run;

    if spec_dir_entry.if_is_symlink {
        match enum_rule_symlink {
            EnumCopySymlinkStrategy::SkipSymlinks => {
                spec_cp_ctx.builder_cp_report.add_skipped(
                    path_dir_src_sub,
                    EnumSkipReason::Symlink,
                    true,
                );
                return None;
            }
            EnumCopySymlinkStrategy::CopySymlinks => {
                // The link itself is one entry; its target is not walked.
                copy_symlink_entry(path_dir_src_sub, &path_dir_dst_sub, spec_cp_ctx);
                return None;
            }
            EnumCopySymlinkStrategy::Dereference => {}
        }
    }

    // Only a directory that is its own ancestor is a loop; aliases elsewhere
    // in the tree are walked again.
    let tuple_dir_identifier = match enum_rule_symlink {
        EnumCopySymlinkStrategy::Dereference => dir_identity(path_dir_src_sub),
        _ => None,
    };
    if tuple_dir_identifier.is_some_and(|t| spec_cp_ctx.l_ancestor_dirs.contains(&t)) {
        spec_cp_ctx.builder_cp_report.add_warning(format!(
            "Symlink loop detected: {}",
            path_dir_src_sub.display()
        ));
        return None;
    }

    let visit_entry_sub = match read_visit_entry(path_dir_src_sub) {
        Ok(v) => v,
        Err(e) => {
            spec_cp_ctx
                .builder_cp_report
                .add_error(SpecCopyError::from_io(path_dir_src_sub.clone(), &e).on_dir());
            return None;
        }
    };

    if let Err(spec_error) =
        validate_destination_path_safety(&path_dir_dst_sub, &spec_cp_ctx.path_dir_dst, false)
    {
        spec_cp_ctx.builder_cp_report.add_error(spec_error.on_dir());
        return None;
    }

    if if_dry_run {
        spec_cp_ctx.builder_cp_report.add_skipped(
            path_dir_src_sub,
            EnumSkipReason::DryRun,
            true,
        );
    } else if let Err(e) = fs::create_dir_all(&path_dir_dst_sub) {
        spec_cp_ctx
            .builder_cp_report
            .add_error(SpecCopyError::from_io(path_dir_dst_sub, &e).on_dir());
        return None;
    } else {
        spec_cp_ctx
            .builder_cp_report
            .add_dir_created(&path_dir_dst_sub);
    }

    Some((visit_entry_sub, path_dir_dst_sub, tuple_dir_identifier))
}

fn handle_file_entry(
    spec_file_entry: SpecFileEntry,
    path_dir_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext,
) {
    let path_file_src = &spec_file_entry.path_file_src;
    match classify_file(
        &spec_file_entry,
        &spec_cp_ctx.spec_cp_options,
        &spec_cp_ctx.spec_cp_pats,
    ) {
        Some(EnumSkipReason::Hidden) => {
            spec_cp_ctx
                .builder_cp_report
                .add_skipped(path_file_src, EnumSkipReason::Hidden, false);
            return;
        }
        Some(reason) => {
            spec_cp_ctx.builder_cp_report.add_scanned();
            spec_cp_ctx
                .builder_cp_report
                .add_skipped(path_file_src, reason, false);
            return;
        }
        None => {
            spec_cp_ctx.builder_cp_report.add_scanned();
            spec_cp_ctx.builder_cp_report.add_matched();
        }
    }

    if spec_file_entry.if_is_special {
        spec_cp_ctx.builder_cp_report.add_warning(format!(
            "Special file skipped: {}",
            path_file_src.display()
        ));
        spec_cp_ctx
            .builder_cp_report
            .add_skipped(path_file_src, EnumSkipReason::SpecialFile, false);
        return;
    }

    let Some(name_file) = path_file_src.file_name() else {
        return;
    };
    let path_file_dst = path_dir_dst.join(name_file);
    let enum_rule_symlink = spec_cp_ctx.spec_cp_options.rule_symlink;

    if spec_file_entry.if_is_symlink {
        match enum_rule_symlink {
            EnumCopySymlinkStrategy::SkipSymlinks => {
                spec_cp_ctx.builder_cp_report.add_skipped(
                    path_file_src,
                    EnumSkipReason::Symlink,
                    false,
                );
                return;
            }
            EnumCopySymlinkStrategy::CopySymlinks => {
                copy_symlink_entry(path_file_src, &path_file_dst, spec_cp_ctx);
                return;
            }
            EnumCopySymlinkStrategy::Dereference => match fs::metadata(path_file_src) {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => {
                    spec_cp_ctx.builder_cp_report.add_warning(format!(
                        "Special file target skipped: {}",
                        path_file_src.display()
                    ));
                    spec_cp_ctx.builder_cp_report.add_skipped(
                        path_file_src,
                        EnumSkipReason::SpecialFile,
                        false,
                    );
                    return;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    spec_cp_ctx.builder_cp_report.add_error(SpecCopyError::new(
                        path_file_src.clone(),
                        EnumCopyErrorKind::BrokenSymlink,
                        format!("Broken symlink: {}", path_file_src.display()),
                    ));
                    return;
                }
                Err(e) => {
                    spec_cp_ctx
                        .builder_cp_report
                        .add_error(SpecCopyError::from_io(path_file_src.clone(), &e));
                    return;
                }
            },
        }
    }

    if !prepare_destination_item(path_file_src, &path_file_dst, spec_cp_ctx) {
        return;
    }

    match copy_file_contents(path_file_src, &path_file_dst) {
        Ok(n_bytes) => {
            if spec_cp_ctx.spec_cp_options.if_preserve_metadata
                && let Err(e) = apply_file_metadata(path_file_src, &path_file_dst)
            {
                spec_cp_ctx.builder_cp_report.add_warning(format!(
                    "Failed to apply metadata to {} ({e})",
                    path_file_dst.display()
                ));
            }
            spec_cp_ctx
                .builder_cp_report
                .add_copied(path_file_src, &path_file_dst, n_bytes);
        }
        Err(e) => {
            spec_cp_ctx
                .builder_cp_report
                .add_error(SpecCopyError::from_io(path_file_src.clone(), &e));
        }
    }
}

/// Run the destination safety, conflict and dry-run checks shared by every
/// write. Returns `true` when the caller should go ahead and write.
fn prepare_destination_item(
    path_src: &Path,
    path_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext,
) -> bool {
    let b_is_symlink_write = spec_cp_ctx.spec_cp_options.rule_symlink
        == EnumCopySymlinkStrategy::CopySymlinks
        && fs::symlink_metadata(path_src).is_ok_and(|m| m.file_type().is_symlink());
    if let Err(spec_error) =
        validate_destination_path_safety(path_dst, &spec_cp_ctx.path_dir_dst, b_is_symlink_write)
    {
        spec_cp_ctx.builder_cp_report.add_error(spec_error);
        return false;
    }

    let enum_rule_conflict_file = spec_cp_ctx.spec_cp_options.rule_conflict_file;
    match resolve_file_conflict(path_dst, enum_rule_conflict_file) {
        EnumFileConflictOutcome::Proceed => {}
        EnumFileConflictOutcome::Skip => {
            spec_cp_ctx.builder_cp_report.add_skipped(
                path_src,
                EnumSkipReason::DestinationExists,
                false,
            );
            return false;
        }
        EnumFileConflictOutcome::Fail(spec_error) => {
            spec_cp_ctx.builder_cp_report.add_error(spec_error);
            return false;
        }
    }

    if spec_cp_ctx.spec_cp_options.if_dry_run {
        spec_cp_ctx
            .builder_cp_report
            .add_skipped(path_src, EnumSkipReason::DryRun, false);
        return false;
    }
    true
}

fn copy_symlink_entry(path_src: &Path, path_dst: &Path, spec_cp_ctx: &mut SpecCopyContext) {
    if !prepare_destination_item(path_src, path_dst, spec_cp_ctx) {
        return;
    }
    match create_symbolic_link(path_src, path_dst) {
        Ok(()) => spec_cp_ctx.builder_cp_report.add_copied(path_src, path_dst, 0),
        Err(e) => spec_cp_ctx
            .builder_cp_report
            .add_error(SpecCopyError::from_io(path_dst.to_path_buf(), &e)),
    }
}
