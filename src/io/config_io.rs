use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

/// Name of the workspace data directory
pub const DATA_DIR: &str = ".scopes";
pub const CONFIG_FILE: &str = "scopes.toml";

/// Error type for config reads and writes
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Commented template written by `scopes init`. Every key shows its default.
const DEFAULT_CONFIG: &str = r#"# scopes configuration

[history]
# snapshots kept on each of the undo and redo stacks
limit = 100

[ingest]
# headings whose plain-item children fold into one content list
heading_words = ["ingredients", "steps", "notes", "checklist"]
tab_width = 2

[generator]
# program that turns a prompt (stdin) into text (stdout)
command = "llm"
args = []
max_output = 4096

[lock]
# how long a write waits for another scopes process to finish
timeout_ms = 5000
"#;

/// Walk up from `start` looking for a `.scopes/` directory.
pub fn discover_data_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(DATA_DIR))
        .find(|candidate| candidate.is_dir())
}

/// Read `scopes.toml` from the data directory. A missing file means defaults.
pub fn read_config(data_dir: &Path) -> Result<Config, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        Err(source) => return Err(ConfigError::ReadError { path, source }),
    };
    toml::from_str(&text).map_err(|source| ConfigError::ParseError { path, source })
}

/// Write the commented default config unless one already exists.
/// Returns true if a file was written.
pub fn write_default_config(data_dir: &Path) -> Result<bool, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    if path.exists() {
        return Ok(false);
    }
    fs::write(&path, DEFAULT_CONFIG).map_err(|source| ConfigError::WriteError { path, source })?;
    Ok(true)
}
