//! One-level directory listing used by the top-down traversal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::spec::SpecCopyError;

/// A subdirectory found while listing a directory.
#[derive(Debug, Clone)]
pub struct SpecDirEntry {
    pub path_dir_src_sub: PathBuf,
    pub name_dir: String,
    pub if_is_symlink: bool,
}

/// A non-directory child: regular file, symlink, or special file.
#[derive(Debug, Clone)]
pub struct SpecFileEntry {
    pub path_file_src: PathBuf,
    pub name_file: String,
    pub if_is_symlink: bool,
    /// Fifo, socket, device: listed so filters and reports see it, never copied.
    pub if_is_special: bool,
}

/// One traversal step: a directory and its immediate children.
///
/// Removing an item from `l_dirs` before descending prunes that subtree.
#[derive(Debug, Clone, Default)]
pub struct VisitEntry {
    pub path_dir: PathBuf,
    pub l_dirs: Vec<SpecDirEntry>,
    pub l_files: Vec<SpecFileEntry>,
    /// Children whose entry or file type could not be read.
    pub l_unreadable: Vec<SpecCopyError>,
}

/// Hidden entries start with `.`; the same rule applies on every platform.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// List `path_dir` once, classify its children and sort each list by name.
///
/// Symlinks pointing at directories are listed as directories; every other
/// symlink (including broken ones) is listed as a file.
pub fn read_visit_entry(path_dir: &Path) -> io::Result<VisitEntry> {
    let mut visit_entry = VisitEntry {
        path_dir: path_dir.to_path_buf(),
        ..VisitEntry::default()
    };

    for entry_res in fs::read_dir(path_dir)? {
        let entry = match entry_res {
            Ok(v) => v,
            Err(e) => {
                visit_entry
                    .l_unreadable
                    .push(SpecCopyError::from_io(path_dir.to_path_buf(), &e));
                continue;
            }
        };

        let path_entry = entry.path();
        let c_name = entry.file_name().to_string_lossy().to_string();
        let cfg_file_type = match entry.file_type() {
            Ok(v) => v,
            Err(e) => {
                visit_entry
                    .l_unreadable
                    .push(SpecCopyError::from_io(path_entry, &e));
                continue;
            }
        };

        let b_is_symlink = cfg_file_type.is_symlink();
        let b_is_dir = cfg_file_type.is_dir() || (b_is_symlink && path_entry.is_dir());
        if b_is_dir {
            visit_entry.l_dirs.push(SpecDirEntry {
                path_dir_src_sub: path_entry,
                name_dir: c_name,
                if_is_symlink: b_is_symlink,
            });
        } else {
            visit_entry.l_files.push(SpecFileEntry {
                path_file_src: path_entry,
                name_file: c_name,
                if_is_symlink: b_is_symlink,
                if_is_special: !cfg_file_type.is_file() && !b_is_symlink,
            });
        }
    }

    visit_entry
        .l_dirs
        .sort_by(|a, b| a.name_dir.cmp(&b.name_dir));
    visit_entry
        .l_files
        .sort_by(|a, b| a.name_file.cmp(&b.name_file));
    Ok(visit_entry)
}
