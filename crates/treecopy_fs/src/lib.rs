//! `treecopy_fs` v1:
//! Recursive directory-tree copy engine.
//!
//! Modules:
//! - `copy`   : traversal and copy orchestration
//! - `walk`   : one-level directory listing, hidden-name rule
//! - `spec`   : enums/options/errors
//! - `report` : run-time report model and per-entry events
//! - `util`   : pattern matching, destination safety, file helpers

pub mod copy;
pub mod report;
pub mod spec;
pub mod walk;
mod util;

pub use copy::{copy_tree, copy_tree_with, count_copy_candidates};
pub use report::{EventCopy, ReportCopy};
pub use spec::{
    CopyTreeError, EnumCopyErrorKind, EnumCopyFileConflictStrategy, EnumCopyPatternMode,
    EnumCopySymlinkStrategy, EnumSkipReason, SpecCopyError, SpecCopyOptions,
};
pub use walk::{is_hidden, read_visit_entry};
