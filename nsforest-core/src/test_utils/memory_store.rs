//! In-memory backing store with switchable faults
//!
//! Mirrors the file store's primary/backup behaviour: `backup` moves the
//! current document aside, so a failed write leaves no primary document
//! until `restore` puts the backup back.

use crate::persistence::{
    BackingStore, NamespaceDocument, PersistenceError, PersistenceResult, StoreLocation,
};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Faults {
    fail_writes: AtomicBool,
    fail_restore: AtomicBool,
    fail_backup: AtomicBool,
    writes: AtomicUsize,
}

#[derive(Debug, Default)]
struct Documents {
    primary: Option<NamespaceDocument>,
    backup: Option<NamespaceDocument>,
}

/// Backing store that keeps documents in memory
pub struct MemoryBackingStore {
    location: StoreLocation,
    faults: Arc<Faults>,
    documents: Arc<Mutex<Documents>>,
}

/// Test-side handle to control and inspect a `MemoryBackingStore`
#[derive(Clone)]
pub struct FaultHandle {
    faults: Arc<Faults>,
    documents: Arc<Mutex<Documents>>,
}

impl MemoryBackingStore {
    pub fn new() -> (Self, FaultHandle) {
        Self::with_document(None)
    }

    /// Start with `document` already stored as the primary copy
    pub fn with_document(document: Option<NamespaceDocument>) -> (Self, FaultHandle) {
        let faults = Arc::new(Faults::default());
        let documents = Arc::new(Mutex::new(Documents {
            primary: document,
            backup: None,
        }));
        let store = MemoryBackingStore {
            location: StoreLocation::new("memory", "namespaces.json"),
            faults: faults.clone(),
            documents: documents.clone(),
        };
        (store, FaultHandle { faults, documents })
    }

    fn injected(&self, what: &str) -> PersistenceError {
        PersistenceError::io(&self.location.directory)(io::Error::new(
            io::ErrorKind::Other,
            format!("injected {} failure", what),
        ))
    }

    fn documents(&self) -> PersistenceResult<std::sync::MutexGuard<'_, Documents>> {
        self.documents
            .lock()
            .map_err(|_| PersistenceError::Malformed("memory store lock poisoned".to_string()))
    }
}

impl BackingStore for MemoryBackingStore {
    fn location(&self) -> &StoreLocation {
        &self.location
    }

    fn read_tree(&self) -> PersistenceResult<Option<NamespaceDocument>> {
        Ok(self.documents()?.primary.clone())
    }

    fn write_tree(&self, document: &NamespaceDocument) -> PersistenceResult<()> {
        if self.faults.fail_writes.load(Ordering::SeqCst) {
            return Err(self.injected("write"));
        }
        self.documents()?.primary = Some(document.clone());
        self.faults.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backup(&self) -> PersistenceResult<bool> {
        if self.faults.fail_backup.load(Ordering::SeqCst) {
            return Err(self.injected("backup"));
        }
        let mut documents = self.documents()?;
        match documents.primary.take() {
            Some(current) => {
                documents.backup = Some(current);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn restore(&self) -> PersistenceResult<()> {
        if self.faults.fail_restore.load(Ordering::SeqCst) {
            return Err(self.injected("restore"));
        }
        let mut documents = self.documents()?;
        match documents.backup.take() {
            Some(previous) => {
                documents.primary = Some(previous);
                Ok(())
            }
            None => Err(PersistenceError::Malformed("no backup to restore".to_string())),
        }
    }
}

impl FaultHandle {
    pub fn fail_writes(&self, enabled: bool) {
        self.faults.fail_writes.store(enabled, Ordering::SeqCst);
    }

    pub fn fail_restore(&self, enabled: bool) {
        self.faults.fail_restore.store(enabled, Ordering::SeqCst);
    }

    pub fn fail_backup(&self, enabled: bool) {
        self.faults.fail_backup.store(enabled, Ordering::SeqCst);
    }

    /// Number of successful writes so far
    pub fn writes(&self) -> usize {
        self.faults.writes.load(Ordering::SeqCst)
    }

    /// Current primary document
    pub fn primary(&self) -> Option<NamespaceDocument> {
        self.documents.lock().ok().and_then(|docs| docs.primary.clone())
    }
}
