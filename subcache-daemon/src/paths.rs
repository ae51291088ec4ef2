use std::path::{Path, PathBuf};

pub const STATUS_FILE: &str = "status.json";

pub fn subcache_root(home: &Path) -> PathBuf {
    home.join(".subcache")
}

pub fn run_dir(home: &Path) -> PathBuf {
    subcache_root(home).join("run")
}

pub fn status_path(home: &Path) -> PathBuf {
    run_dir(home).join(STATUS_FILE)
}
