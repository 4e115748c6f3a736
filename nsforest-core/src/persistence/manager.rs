/*
    manager.rs - Load, save and crash-safe commit of the registry

    Commit state machine:

        Stable -> BackingUp -> Writing -> Stable
        BackingUp | Writing -> Failed -> Restoring -> Stable | Inconsistent

    A failed write is rolled back by restoring the backup and reloading the
    registry from it. When that is impossible the commit ends Inconsistent:
    memory keeps the unsaved change and disk does not have it. The manager
    stays usable and the next commit starts again from Stable.
*/

use crate::namespace::NamespaceRegistry;
use crate::persistence::backing::{BackingStore, StoreLocation};
use crate::persistence::document::NamespaceDocument;
use crate::persistence::errors::{PersistenceError, PersistenceResult};
use crate::telemetry;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommitState {
    Stable,
    BackingUp,
    Writing,
    Failed,
    Restoring,
    Inconsistent,
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitState::Stable => "stable",
            CommitState::BackingUp => "backing-up",
            CommitState::Writing => "writing",
            CommitState::Failed => "failed",
            CommitState::Restoring => "restoring",
            CommitState::Inconsistent => "inconsistent",
        };
        f.write_str(name)
    }
}

/// A commit that did not reach disk
#[derive(Debug)]
pub struct CommitFailure {
    /// Terminal state: `Stable` if rolled back, `Inconsistent` otherwise
    pub state: CommitState,
    pub had_backup: bool,
    /// Why the write failed
    pub cause: PersistenceError,
    /// Why the rollback failed, if it was attempted and failed
    pub recovery_error: Option<String>,
}

pub struct PersistenceManager {
    backing: Box<dyn BackingStore>,
    state: CommitState,
}

impl PersistenceManager {
    pub fn new(backing: Box<dyn BackingStore>) -> Self {
        PersistenceManager {
            backing,
            state: CommitState::Stable,
        }
    }

    pub fn location(&self) -> &StoreLocation {
        self.backing.location()
    }

    /// Terminal state of the most recent commit
    pub fn state(&self) -> CommitState {
        self.state
    }

    /// Replace the registry contents with what the backing store holds.
    /// On error the registry is left untouched.
    pub fn load(&self, registry: &mut NamespaceRegistry) -> PersistenceResult<()> {
        let loaded = match self.backing.read_tree()? {
            Some(document) => document.into_registry()?,
            None => NamespaceRegistry::new(),
        };

        registry.clear();
        *registry = loaded;
        debug!(namespaces = registry.len(), "Loaded namespaces");
        Ok(())
    }

    /// Write every root namespace and its descendants
    pub fn save(&self, registry: &NamespaceRegistry) -> PersistenceResult<()> {
        let document = NamespaceDocument::from_registry(registry)?;
        self.backing.write_tree(&document)
    }

    /// Save with backup and rollback. On failure `registry` has been
    /// reloaded from the restored backup unless the result is Inconsistent.
    pub fn commit(&mut self, registry: &mut NamespaceRegistry) -> Result<(), CommitFailure> {
        self.transition(CommitState::BackingUp);
        let had_backup = match self.backing.backup() {
            Ok(moved) => moved,
            Err(e) => {
                warn!(error = %e, "Could not back up namespaces data; rollback will not be possible");
                false
            }
        };

        self.transition(CommitState::Writing);
        let cause = match self.save(registry) {
            Ok(()) => {
                self.transition(CommitState::Stable);
                telemetry::record_commit(CommitState::Stable, false);
                return Ok(());
            }
            Err(e) => e,
        };

        self.transition(CommitState::Failed);
        error!(
            error = %cause,
            path = %self.location().data_path().display(),
            "Saving namespaces data to persistent storage failed"
        );

        if !had_backup {
            error!(
                "Namespaces data in memory is out of sync with persistent storage \
                 because a backup file is not available"
            );
            return Err(self.fail_inconsistent(had_backup, cause, None));
        }

        self.transition(CommitState::Restoring);
        let recovered = self
            .backing
            .restore()
            .and_then(|()| self.load(registry));

        match recovered {
            Ok(()) => {
                info!("Successfully reloaded namespaces data from backup file");
                self.transition(CommitState::Stable);
                telemetry::record_commit(CommitState::Stable, true);
                Err(CommitFailure {
                    state: CommitState::Stable,
                    had_backup,
                    cause,
                    recovery_error: None,
                })
            }
            Err(recovery) => {
                error!(
                    error = %recovery,
                    "Namespaces data in memory is out of sync with persistent storage \
                     because restoring the backup file failed"
                );
                Err(self.fail_inconsistent(had_backup, cause, Some(recovery.to_string())))
            }
        }
    }

    fn fail_inconsistent(
        &mut self,
        had_backup: bool,
        cause: PersistenceError,
        recovery_error: Option<String>,
    ) -> CommitFailure {
        self.transition(CommitState::Inconsistent);
        telemetry::record_commit(CommitState::Inconsistent, false);
        CommitFailure {
            state: CommitState::Inconsistent,
            had_backup,
            cause,
            recovery_error,
        }
    }

    fn transition(&mut self, next: CommitState) {
        trace!(from = %self.state, to = %next, "Commit state change");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::NamespaceNode;
    use crate::persistence::FileBackingStore;
    use crate::test_utils::fixtures::sample_registry;
    use crate::test_utils::MemoryBackingStore;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_file_store() {
        let dir = tempdir().unwrap();
        let backing = FileBackingStore::new(dir.path(), "namespaces.json").unwrap();
        let manager = PersistenceManager::new(Box::new(backing));

        let registry = sample_registry();
        manager.save(&registry).unwrap();

        let mut loaded = NamespaceRegistry::new();
        manager.load(&mut loaded).unwrap();
        assert_eq!(loaded, registry);
    }

    #[test]
    fn test_load_missing_file_gives_empty_registry() {
        let dir = tempdir().unwrap();
        let backing = FileBackingStore::new(dir.path(), "namespaces.json").unwrap();
        let manager = PersistenceManager::new(Box::new(backing));

        let mut registry = sample_registry();
        manager.load(&mut registry).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failed_load_leaves_registry_untouched() {
        let dir = tempdir().unwrap();
        let backing = FileBackingStore::new(dir.path(), "namespaces.json").unwrap();
        std::fs::write(backing.location().data_path(), b"garbage").unwrap();
        let manager = PersistenceManager::new(Box::new(backing));

        let mut registry = sample_registry();
        assert!(manager.load(&mut registry).is_err());
        assert_eq!(registry, sample_registry());
    }

    #[test]
    fn test_commit_success_keeps_backup_of_previous_state() {
        let dir = tempdir().unwrap();
        let backing = FileBackingStore::new(dir.path(), "namespaces.json").unwrap();
        let location = backing.location().clone();
        let mut manager = PersistenceManager::new(Box::new(backing));

        let mut registry = NamespaceRegistry::new();
        registry.create(NamespaceNode::new("First", "", None)).unwrap();
        manager.commit(&mut registry).unwrap();
        assert!(!location.backup_path().exists());

        registry.create(NamespaceNode::new("Second", "", None)).unwrap();
        manager.commit(&mut registry).unwrap();
        assert!(location.backup_path().exists());
        assert_eq!(manager.state(), CommitState::Stable);
    }

    #[test]
    fn test_commit_failure_rolls_back() {
        let (backing, faults) = MemoryBackingStore::new();
        let mut manager = PersistenceManager::new(Box::new(backing));

        let mut registry = NamespaceRegistry::new();
        registry.create(NamespaceNode::new("Kept", "", None)).unwrap();
        manager.commit(&mut registry).unwrap();

        registry.create(NamespaceNode::new("Lost", "", None)).unwrap();
        faults.fail_writes(true);
        let failure = manager.commit(&mut registry).unwrap_err();

        assert_eq!(failure.state, CommitState::Stable);
        assert!(failure.had_backup);
        assert!(registry.contains("Kept"));
        assert!(!registry.contains("Lost"));
        assert_eq!(manager.state(), CommitState::Stable);
    }

    #[test]
    fn test_commit_failure_without_backup_is_inconsistent() {
        let (backing, faults) = MemoryBackingStore::new();
        let mut manager = PersistenceManager::new(Box::new(backing));

        let mut registry = NamespaceRegistry::new();
        registry.create(NamespaceNode::new("Only", "", None)).unwrap();
        faults.fail_writes(true);

        let failure = manager.commit(&mut registry).unwrap_err();
        assert_eq!(failure.state, CommitState::Inconsistent);
        assert!(!failure.had_backup);
        assert!(registry.contains("Only"));
        assert_eq!(manager.state(), CommitState::Inconsistent);
    }

    #[test]
    fn test_commit_failure_with_failed_restore_is_inconsistent() {
        let (backing, faults) = MemoryBackingStore::new();
        let mut manager = PersistenceManager::new(Box::new(backing));

        let mut registry = NamespaceRegistry::new();
        registry.create(NamespaceNode::new("Kept", "", None)).unwrap();
        manager.commit(&mut registry).unwrap();

        registry.create(NamespaceNode::new("Unsaved", "", None)).unwrap();
        faults.fail_writes(true);
        faults.fail_restore(true);

        let failure = manager.commit(&mut registry).unwrap_err();
        assert_eq!(failure.state, CommitState::Inconsistent);
        assert!(failure.recovery_error.is_some());
        assert!(registry.contains("Unsaved"));

        // The manager is still usable once the fault clears
        faults.fail_writes(false);
        faults.fail_restore(false);
        manager.commit(&mut registry).unwrap();
        assert_eq!(manager.state(), CommitState::Stable);
    }

    #[test]
    fn test_backup_failure_is_tolerated_when_write_succeeds() {
        let (backing, faults) = MemoryBackingStore::new();
        let mut manager = PersistenceManager::new(Box::new(backing));

        let mut registry = sample_registry();
        faults.fail_backup(true);
        manager.commit(&mut registry).unwrap();
        assert_eq!(faults.primary().unwrap().namespace_count(), registry.len());
    }
}
