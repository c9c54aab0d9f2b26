//! Interactive questions asked when no paths are given on the command line.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use color_eyre::eyre::{Result, bail};

/// Answers collected from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptAnswers {
    pub path_dir_src: PathBuf,
    pub path_dir_dst: PathBuf,
    pub l_extensions_exclude: Vec<String>,
}

/// Ask for source, destination and excluded extensions, in that order.
pub fn ask_copy_inputs<R, W>(reader: &mut R, writer: &mut W) -> Result<PromptAnswers>
where
    R: BufRead,
    W: Write,
{
    let c_src = ask_line(reader, writer, "Enter the source directory: ")?;
    let c_dst = ask_line(reader, writer, "Enter the destination directory: ")?;
    if c_src.is_empty() {
        bail!("No source directory given");
    }
    if c_dst.is_empty() {
        bail!("No destination directory given");
    }
    let c_extensions = ask_line(
        reader,
        writer,
        "Enter file extensions to exclude (comma-separated, e.g., 'exe,sys,tmp'): ",
    )?;

    Ok(PromptAnswers {
        path_dir_src: PathBuf::from(c_src),
        path_dir_dst: PathBuf::from(c_dst),
        l_extensions_exclude: split_extensions(&c_extensions),
    })
}

/// Split a comma-separated answer; blanks are dropped, a leading `.` is kept
/// for the library to strip.
pub fn split_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
        .collect()
}

fn ask_line<R, W>(reader: &mut R, writer: &mut W, question: &str) -> io::Result<String>
where
    R: BufRead,
    W: Write,
{
    write!(writer, "{question}")?;
    writer.flush()?;

    let mut buf = String::new();
    reader.read_line(&mut buf)?;
    Ok(buf.trim().to_string())
}
