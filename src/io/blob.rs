use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Keyed byte storage behind the store. Callers own the encoding.
pub trait BlobStore {
    /// Bytes saved under `key`, or `None` if nothing was ever saved
    fn load_blob(&self, key: &str) -> io::Result<Option<Vec<u8>>>;
    fn save_blob(&mut self, key: &str, bytes: &[u8]) -> io::Result<()>;
}

/// One `<key>.json` file per blob inside a directory
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileBlobStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl BlobStore for FileBlobStore {
    fn load_blob(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save_blob(&mut self, key: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        atomic_write(&self.path_for(key), bytes)
    }
}

/// In-process blobs, for tests and throwaway sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, Vec<u8>>,
    /// When set, every save fails with a permission error
    pub fail_saves: bool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.blobs.get(key).map(Vec::as_slice)
    }
}

impl BlobStore for MemoryBlobStore {
    fn load_blob(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn save_blob(&mut self, key: &str, bytes: &[u8]) -> io::Result<()> {
        if self.fail_saves {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "saves disabled",
            ));
        }
        self.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
