use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn write_text(path: &Path, txt: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, txt).expect("write text");
}

fn treecopy() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_treecopy"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run_with_stdin(mut cmd: Command, stdin_txt: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn treecopy");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(stdin_txt.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait treecopy")
}

#[test]
fn copies_tree_from_positional_arguments() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("a");
    let dst = tmp.path().join("dest");
    let log = tmp.path().join("copy_log.txt");
    write_text(&src.join(".git/x"), "object");
    write_text(&src.join("docs/readme.md"), "hello");
    write_text(&src.join("setup.exe"), "bin");

    let output = treecopy()
        .arg(&src)
        .arg(&dst)
        .args(["--exclude", "exe", "--no-progress", "--log-file"])
        .arg(&log)
        .output()
        .expect("run treecopy");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(excluding hidden files and folders)..."));
    assert!(stdout.contains(&format!(
        "Copied: {}",
        src.join("docs/readme.md").display()
    )));
    assert!(stdout.contains(&format!(
        "Skipped (excluded): {}",
        src.join("setup.exe").display()
    )));
    assert!(!stdout.contains(".git"));
    assert!(stdout.contains(&format!(
        "Copied 1 files out of 1. Check '{}' for details.",
        log.display()
    )));
    assert!(stdout.trim_end().ends_with("Copy operation completed."));

    assert_eq!(
        fs::read_to_string(dst.join("docs/readme.md")).expect("copied"),
        "hello"
    );
    assert!(!dst.join(".git").exists());
    assert!(!dst.join("setup.exe").exists());

    let log_txt = fs::read_to_string(&log).expect("log written");
    assert!(log_txt.contains("Starting copy operation"));
    assert!(log_txt.contains(".git"));
}

#[test]
fn prompts_for_paths_and_extensions() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let log = tmp.path().join("prompt_log.txt");
    write_text(&src.join("keep.txt"), "k");
    write_text(&src.join("drop.tmp"), "t");
    write_text(&src.join("sub/also.sys"), "s");

    let mut cmd = treecopy();
    cmd.args(["--no-progress", "--log-file"]).arg(&log);
    let stdin_txt = format!("{}\n{}\ntmp, sys\n", src.display(), dst.display());
    let output = run_with_stdin(cmd, &stdin_txt);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Enter the source directory: "));
    assert!(stdout.contains("Enter the destination directory: "));
    assert!(stdout.contains("Enter file extensions to exclude"));
    assert!(stdout.contains("Copied 1 files out of 1."));

    assert!(dst.join("keep.txt").exists());
    assert!(!dst.join("drop.tmp").exists());
    assert!(!dst.join("sub/also.sys").exists());
    assert!(dst.join("sub").is_dir());
}

#[test]
fn missing_source_exits_with_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let output = treecopy()
        .arg(tmp.path().join("nope"))
        .arg(tmp.path().join("dst"))
        .args(["--no-progress", "--log-file"])
        .arg(tmp.path().join("log.txt"))
        .output()
        .expect("run treecopy");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Source directory does not exist"), "{stderr}");
    assert!(!tmp.path().join("dst").exists());
}

#[test]
fn unwritable_log_file_does_not_stop_the_copy() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    write_text(&src.join("a.txt"), "a");

    let output = treecopy()
        .arg(&src)
        .arg(&dst)
        .args(["--no-progress", "--log-file"])
        .arg(tmp.path().join("no_such_dir/log.txt"))
        .output()
        .expect("run treecopy");

    assert!(output.status.success(), "{output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("continuing without a log file"));
    assert!(dst.join("a.txt").exists());
}

#[test]
fn dry_run_reports_without_writing() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    write_text(&src.join("a.txt"), "a");

    let output = treecopy()
        .arg(&src)
        .arg(&dst)
        .args(["--dry-run", "--no-progress", "--log-file"])
        .arg(tmp.path().join("log.txt"))
        .output()
        .expect("run treecopy");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!(
        "Skipped (dry run): {}",
        src.join("a.txt").display()
    )));
    assert!(stdout.contains("Copied 0 files out of 1."));
    assert!(!dst.exists());
}
