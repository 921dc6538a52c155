//! Derives the reported version from the git tag state

// Cargo reads instructions from stdout
#![allow(clippy::print_stdout)]

use std::path::PathBuf;
use std::process::Command;

fn main() {
    if let Some(git_dir) = git(&["rev-parse", "--git-dir"]).map(PathBuf::from) {
        watch_git_state(&git_dir);
    }

    let version = git(&["describe", "--tags"]).map_or_else(
        || env!("CARGO_PKG_VERSION").to_string(),
        |described| described.strip_prefix('v').unwrap_or(&described).to_string(),
    );
    println!("cargo:rustc-env=WKCUBER_VERSION={version}");
}

// `git describe` changes with HEAD, the branch it points to and the tags
fn watch_git_state(git_dir: &std::path::Path) {
    let head = git_dir.join("HEAD");
    let mut watched = vec![head.clone(), git_dir.join("packed-refs"), git_dir.join("refs/tags")];

    let branch = std::fs::read_to_string(&head).ok();
    if let Some(reference) = branch.as_deref().and_then(|content| content.trim().strip_prefix("ref: ")) {
        watched.push(git_dir.join(reference));
    }

    // A missing path would rerun the script on every build
    for path in watched.iter().filter(|path| path.exists()) {
        println!("cargo:rerun-if-changed={}", path.display());
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
