/*
    persistence - Durable storage for the namespace forest

    The store depends only on a tree contract: namespaces with a name and
    description, their variables, and their nested child namespaces.

    Architecture:
    - BackingStore trait for reading and writing that tree
    - JSON file implementation with atomic temp-then-rename writes
    - PersistenceManager driving backup / write / restore on every commit
    - Archiver for timestamped copies at lifecycle phases
*/

pub mod archive;
pub mod backing;
pub mod document;
pub mod errors;
pub mod manager;

pub use archive::{ArchivePhase, Archiver};
pub use backing::{BackingStore, FileBackingStore, StoreLocation};
pub use document::{NamespaceDocument, NamespaceElement, VariableElement, FORMAT_VERSION};
pub use errors::{PersistenceError, PersistenceResult};
pub use manager::{CommitFailure, CommitState, PersistenceManager};
