use std::fs;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::blob::{BlobStore, FileBlobStore};
use crate::io::config_io::{self, DATA_DIR};
use crate::io::store::{FOREST_KEY, HISTORY_KEY};
use crate::model::forest::Forest;

/// Create `.scopes/` under `start` with the default config and an empty
/// forest. With `--force` an existing workspace is reset: the forest is
/// replaced and history is dropped, the config file is left alone.
pub fn cmd_init(start: &Path, args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = start.join(DATA_DIR);

    if data_dir.is_dir() && !args.force {
        return Err(format!(
            "scopes workspace already exists in {}/ (use --force to reset it)",
            data_dir.display()
        )
        .into());
    }

    if let Some(parent) = start.parent()
        && let Some(outer) = config_io::discover_data_dir(parent)
    {
        eprintln!("Note: enclosing workspace found at {}/", outer.display());
        eprintln!("Creating new workspace in {}/", data_dir.display());
    }

    fs::create_dir_all(&data_dir)?;
    config_io::write_default_config(&data_dir)?;

    let mut blobs = FileBlobStore::new(&data_dir);
    blobs.save_blob(FOREST_KEY, &serde_json::to_vec(&Forest::new())?)?;
    let history = blobs.path_for(HISTORY_KEY);
    if history.exists() {
        fs::remove_file(&history)?;
    }

    tracing::info!(path = %data_dir.display(), force = args.force, "workspace initialized");
    println!("Initialized scopes workspace in {}/", data_dir.display());
    Ok(())
}
