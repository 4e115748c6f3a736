/*
    archive.rs - Timestamped copies of the data file

    Copies are named <file>.<phase>.<unix millis> in the archive directory.
    Archiving never fails the operation that asked for it; problems are
    logged and the copy is skipped.
*/

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error};

/// Lifecycle point at which a copy is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchivePhase {
    /// The store was opened
    Init,
    /// A namespace is about to be deleted
    Delete,
    /// The store is shutting down
    Term,
}

impl ArchivePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchivePhase::Init => "init",
            ArchivePhase::Delete => "delete",
            ArchivePhase::Term => "term",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Archiver {
    archive_dir: Option<PathBuf>,
}

impl Archiver {
    pub fn new(archive_dir: Option<PathBuf>) -> Self {
        Archiver { archive_dir }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.archive_dir.is_some()
    }

    /// Copy `source` into the archive. Returns the copy's path when one
    /// was written.
    pub fn archive(&self, source: &Path, phase: ArchivePhase) -> Option<PathBuf> {
        let dir = self.archive_dir.as_ref()?;

        if !source.exists() {
            debug!(source = %source.display(), phase = phase.as_str(), "Nothing to archive");
            return None;
        }

        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "namespaces".to_string());
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or(0);
        let target = dir.join(format!("{}.{}.{}", file_name, phase.as_str(), millis));

        let copied = fs::create_dir_all(dir).and_then(|()| fs::copy(source, &target));
        match copied {
            Ok(bytes) => {
                debug!(target = %target.display(), bytes, "Archived namespaces data file");
                Some(target)
            }
            Err(e) => {
                error!(
                    error = %e,
                    source = %source.display(),
                    target = %target.display(),
                    "Error copying namespaces data file"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_disabled_archiver_does_nothing() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("namespaces.json");
        std::fs::write(&source, b"{}").unwrap();

        assert!(Archiver::disabled().archive(&source, ArchivePhase::Init).is_none());
    }

    #[test]
    fn test_archive_copies_with_phase_in_name() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("namespaces.json");
        std::fs::write(&source, b"{\"format_version\":1}").unwrap();
        let archiver = Archiver::new(Some(dir.path().join("archive")));

        let copy = archiver.archive(&source, ArchivePhase::Delete).unwrap();
        let name = copy.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("namespaces.json.delete."));
        assert_eq!(std::fs::read(&copy).unwrap(), std::fs::read(&source).unwrap());
    }

    #[test]
    fn test_missing_source_is_skipped() {
        let dir = tempdir().unwrap();
        let archiver = Archiver::new(Some(dir.path().join("archive")));

        assert!(archiver
            .archive(&dir.path().join("absent.json"), ArchivePhase::Term)
            .is_none());
    }
}
