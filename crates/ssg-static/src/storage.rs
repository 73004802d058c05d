//! Sinks for the files of a generated site.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};

use parking_lot::Mutex;

/// Errors that can occur when storing a file.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("destination must not be empty")]
    EmptyDestination,

    #[error("storing {path:?} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Persists the files of a generated site.
///
/// Implementations must accept concurrent calls for distinct destinations.
pub trait Storage: Send + Sync {
    /// Write everything readable from `content` to `destination`, a path
    /// relative to the storage root. Returns the number of bytes written.
    fn store(&self, destination: &Path, content: &mut dyn Read) -> Result<u64, StorageError>;
}

/// Normalize `destination` to a path below the storage root.
///
/// `..` segments cannot climb above the root and leading separators are
/// dropped, so `/../a/./b` and `a/b` name the same file.
pub fn sanitize(destination: &Path) -> Result<PathBuf, StorageError> {
    let mut clean = PathBuf::new();
    for component in destination.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::ParentDir => {
                clean.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(StorageError::EmptyDestination);
    }
    Ok(clean)
}

/// Stores files below a directory on the local file system.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Storage for FileStorage {
    fn store(&self, destination: &Path, content: &mut dyn Read) -> Result<u64, StorageError> {
        let path = self.root.join(sanitize(destination)?);
        let io_error = |source| StorageError::Io {
            path: destination.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let mut file = BufWriter::new(File::create(&path).map_err(io_error)?);
        let written = io::copy(content, &mut file).map_err(io_error)?;
        file.flush().map_err(io_error)?;

        tracing::debug!(path = %destination.display(), bytes = written, "Stored file");
        Ok(written)
    }
}

/// Keeps stored files in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of all stored files, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().keys().cloned().collect()
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.lock().get(path.as_ref()).cloned()
    }

    /// Copy of every stored file keyed by path.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        self.files.lock().clone()
    }

    pub fn clear(&self) {
        self.files.lock().clear();
    }
}

impl Storage for MemoryStorage {
    fn store(&self, destination: &Path, content: &mut dyn Read) -> Result<u64, StorageError> {
        let path = sanitize(destination)?;
        let mut data = Vec::new();
        content
            .read_to_end(&mut data)
            .map_err(|source| StorageError::Io {
                path: destination.to_path_buf(),
                source,
            })?;

        let written = data.len() as u64;
        self.files.lock().insert(path, data);
        Ok(written)
    }
}
