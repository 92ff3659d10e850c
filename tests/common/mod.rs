//! Shared helpers for CLI tests

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

/// A chipload command isolated from any config on the host
pub fn chipload(dir: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("chipload"));
    cmd.current_dir(dir.path())
        .env_remove("CHIPLOAD_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

pub fn workdir() -> TempDir {
    TempDir::new().unwrap()
}

/// Write `contents` to `name` inside the temp dir
pub fn write_file(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}
