pub mod config;
pub mod logging;
pub mod namespace;
pub mod persistence;
pub mod telemetry;
pub mod test_utils;

pub use config::{Config, ConfigError, LoggingConfig, StoreConfig};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogLevel, LoggingError};
pub use namespace::{
    DeleteTarget, ErrorKind, ListRequest, ListResult, ModifyRequest, NamespaceError,
    NamespaceNode, NamespaceRegistry, NamespaceResult, NamespaceStore, Parent, QueryResult,
    StorageState, Variable, VariableTable,
};
pub use persistence::{
    Archiver, BackingStore, CommitState, FileBackingStore, PersistenceError, PersistenceManager,
};
