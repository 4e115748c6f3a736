/*
    backing.rs - Backing store contract and its file implementation

    The file store keeps three names side by side in the data directory:
    - <file>          current namespaces document
    - <file>.backup   previous document, moved aside before each write
    - <file>.tmp      in-progress write, renamed over <file> when complete
*/

use crate::persistence::document::NamespaceDocument;
use crate::persistence::errors::{PersistenceError, PersistenceResult};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a backing store keeps its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    pub directory: PathBuf,
    pub file_name: String,
}

impl StoreLocation {
    pub fn new(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        StoreLocation {
            directory: directory.into(),
            file_name: file_name.into(),
        }
    }

    pub fn data_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.directory.join(format!("{}.backup", self.file_name))
    }

    pub fn temp_path(&self) -> PathBuf {
        self.directory.join(format!("{}.tmp", self.file_name))
    }
}

/// Durable medium holding the serialized namespace forest
pub trait BackingStore: Send + Sync {
    fn location(&self) -> &StoreLocation;

    /// Read the current document; `None` when nothing has been written yet
    fn read_tree(&self) -> PersistenceResult<Option<NamespaceDocument>>;

    /// Replace the current document
    fn write_tree(&self, document: &NamespaceDocument) -> PersistenceResult<()>;

    /// Move the current document aside. Returns false when there was no
    /// current document to move.
    fn backup(&self) -> PersistenceResult<bool>;

    /// Put the backup back in place of the current document
    fn restore(&self) -> PersistenceResult<()>;
}

/// JSON document on the local file system
#[derive(Debug, Clone)]
pub struct FileBackingStore {
    location: StoreLocation,
}

impl FileBackingStore {
    /// Open a store, creating the data directory if needed
    pub fn new(directory: impl Into<PathBuf>, file_name: impl Into<String>) -> PersistenceResult<Self> {
        let location = StoreLocation::new(directory, file_name);

        if location.directory.exists() && !location.directory.is_dir() {
            return Err(PersistenceError::Malformed(format!(
                "data directory \"{}\" is not a directory",
                location.directory.display()
            )));
        }
        fs::create_dir_all(&location.directory).map_err(PersistenceError::io(&location.directory))?;

        Ok(FileBackingStore { location })
    }

    /// Rename `from` over `to`, removing any existing `to` first
    fn replace(from: &Path, to: &Path) -> PersistenceResult<()> {
        match fs::remove_file(to) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(PersistenceError::io(to)(e)),
        }
        fs::rename(from, to).map_err(PersistenceError::io(from))
    }
}

impl BackingStore for FileBackingStore {
    fn location(&self) -> &StoreLocation {
        &self.location
    }

    fn read_tree(&self) -> PersistenceResult<Option<NamespaceDocument>> {
        let path = self.location.data_path();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PersistenceError::io(&path)(e)),
        };

        // Nesting depth follows the deepest parent chain
        let mut json = serde_json::Deserializer::from_slice(&data);
        json.disable_recursion_limit();
        let document = NamespaceDocument::deserialize(serde_stacker::Deserializer::new(&mut json))?;
        json.end()?;
        debug!(
            path = %path.display(),
            namespaces = document.namespace_count(),
            "Read namespaces document"
        );
        Ok(Some(document))
    }

    fn write_tree(&self, document: &NamespaceDocument) -> PersistenceResult<()> {
        // Compact: indentation would grow with the square of the chain depth
        let data = serde_json::to_vec(document)?;

        // Write to temporary file first
        let temp_path = self.location.temp_path();
        let mut file = File::create(&temp_path).map_err(PersistenceError::io(&temp_path))?;
        file.write_all(&data).map_err(PersistenceError::io(&temp_path))?;
        file.sync_all().map_err(PersistenceError::io(&temp_path))?;
        drop(file);

        // Atomically rename to final name
        let data_path = self.location.data_path();
        fs::rename(&temp_path, &data_path).map_err(PersistenceError::io(&data_path))?;

        debug!(
            path = %data_path.display(),
            bytes = data.len(),
            "Wrote namespaces document"
        );
        Ok(())
    }

    fn backup(&self) -> PersistenceResult<bool> {
        let data_path = self.location.data_path();
        if !data_path.exists() {
            return Ok(false);
        }
        Self::replace(&data_path, &self.location.backup_path())?;
        Ok(true)
    }

    fn restore(&self) -> PersistenceResult<()> {
        Self::replace(&self.location.backup_path(), &self.location.data_path())
    }
}
