//! treecopy - copy a directory tree, skipping hidden entries.
//!
//! Usage:
//!   treecopy                          Prompt for source, destination, extensions
//!   treecopy SOURCE DESTINATION       Copy without prompting
//!   treecopy --help                   Show all flags

mod cli;
mod logging;
mod progress;
mod prompt;

use std::io;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Context, Result};

use treecopy_fs::{copy_tree_with, count_copy_candidates};

use crate::cli::Cli;
use crate::progress::ConsoleReporter;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let (path_dir_src, path_dir_dst, l_extensions_exclude) = resolve_inputs(&cli)?;

    if let Err(err) = logging::init_file_logging(&cli.log_file) {
        eprintln!("[warn] continuing without a log file: {err:#}");
    }

    println!(
        "Starting copy from {} to {} (excluding hidden files and folders)...",
        path_dir_src.display(),
        path_dir_dst.display()
    );
    tracing::info!(
        "Starting copy operation from {} to {}",
        path_dir_src.display(),
        path_dir_dst.display()
    );

    let spec_cp_options = cli.copy_options(&l_extensions_exclude);
    let n_total = count_copy_candidates(&path_dir_src, &spec_cp_options)
        .wrap_err_with(|| format!("failed to scan {}", path_dir_src.display()))?;

    let mut reporter = ConsoleReporter::new(n_total, !cli.no_progress);
    let report = copy_tree_with(&path_dir_src, &path_dir_dst, spec_cp_options, |event| {
        reporter.on_event(event)
    })
    .wrap_err_with(|| {
        format!(
            "failed to copy from {} to {}",
            path_dir_src.display(),
            path_dir_dst.display()
        )
    })?;
    reporter.finish();

    println!(
        "Copied {} files out of {}. Check '{}' for details.",
        report.cnt_copied,
        n_total,
        cli.log_file.display()
    );
    println!("Copy operation completed.");
    Ok(())
}

/// Paths and excluded extensions from the command line, or from the prompts
/// when no paths were given.
fn resolve_inputs(cli: &Cli) -> Result<(PathBuf, PathBuf, Vec<String>)> {
    if let (Some(src), Some(dst)) = (&cli.source, &cli.destination) {
        return Ok((src.clone(), dst.clone(), cli.exclude.clone()));
    }

    let answers = prompt::ask_copy_inputs(&mut io::stdin().lock(), &mut io::stdout())?;
    let mut l_extensions_exclude = answers.l_extensions_exclude;
    l_extensions_exclude.extend(cli.exclude.iter().cloned());
    Ok((
        answers.path_dir_src,
        answers.path_dir_dst,
        l_extensions_exclude,
    ))
}
