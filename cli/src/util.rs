use std::{path::PathBuf, process::exit};

use judgebox_core::Config;

use crate::cmd::GlobalArgs;

pub fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("Failed to get current dir: {}", e);
        exit(1);
    })
}

/// `--config` if given, otherwise the nearest `judgebox.toml` upwards from the current dir.
pub fn load_config(global: &GlobalArgs) -> anyhow::Result<Config> {
    match &global.config {
        Some(path) => Config::from_toml_file(path.to_owned()),
        None => Config::from_file_finding_in_ancestors(self::current_dir()),
    }
}
