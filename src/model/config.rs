use serde::{Deserialize, Serialize};

/// Configuration from scopes.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub lock: LockConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum snapshots kept on each of the undo and redo stacks
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Titles whose all-leaf children are collapsed into a content list by the
    /// indentation parser. Matched case-insensitively, trailing colon ignored.
    #[serde(default = "default_heading_words")]
    pub heading_words: Vec<String>,
    /// Spaces a tab expands to before indentation is measured
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            heading_words: default_heading_words(),
            tab_width: default_tab_width(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Program invoked for text generation. Receives the prompt on stdin.
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Upper bound on response size passed to the generator
    #[serde(default = "default_max_output")]
    pub max_output: usize,
    /// Extra system instructions prepended to every request
    #[serde(default)]
    pub system: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            command: default_command(),
            args: Vec::new(),
            max_output: default_max_output(),
            system: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockConfig {
    /// How long a write command waits for another writer to finish
    #[serde(default = "default_lock_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl LockConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

fn default_history_limit() -> usize {
    100
}

fn default_heading_words() -> Vec<String> {
    ["ingredients", "steps", "notes", "checklist"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_tab_width() -> usize {
    2
}

fn default_command() -> String {
    "llm".to_string()
}

fn default_max_output() -> usize {
    4096
}

fn default_lock_timeout_ms() -> u64 {
    5000
}
