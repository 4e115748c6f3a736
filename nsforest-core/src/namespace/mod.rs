/*
    namespace - Hierarchical namespace store

    Named namespaces hold key/value variables and form a forest through
    parent references. Lookups fall back to ancestors when a namespace
    does not define a key.

    Handles:
    - Case-insensitive variable tables
    - Namespace nodes and the registry that owns them
    - The store facade that serializes every operation and commits it
*/

pub mod errors;
pub mod node;
pub mod registry;
pub mod store;
pub mod types;
pub mod variables;

pub use errors::{ErrorKind, NamespaceError, NamespaceResult, StorageState};
pub use node::NamespaceNode;
pub use registry::{Lineage, NamespaceRegistry};
pub use store::NamespaceStore;
pub use types::{
    DeleteTarget, ListRequest, ListResult, ModifyRequest, NamespaceInfo, Parent, QueryInfo,
    QueryResult, Settings, TreeNode, VariableInfo,
};
pub use variables::{Variable, VariableTable};

/// Word accepted in place of a parent name to mean "no parent".
pub const ROOT_SENTINEL: &str = "NONE";

/// Canonical lookup form of a namespace name or variable key.
pub fn canonical(name: &str) -> String {
    name.to_uppercase()
}
