//! Test fixtures for building namespace forests
//!
//! The builder writes both sides of every parent/child link the same way
//! the store does, so registries it produces pass `check_links`.

use crate::namespace::{NamespaceNode, NamespaceRegistry};

/// Builder for registries used in tests
#[derive(Debug, Default)]
pub struct TestForestBuilder {
    registry: NamespaceRegistry,
}

impl TestForestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace. The parent must already have been added.
    pub fn with_namespace(mut self, name: &str, description: &str, parent: Option<&str>) -> Self {
        let parent_name = parent.map(|p| {
            let parent_node = self
                .registry
                .get_mut(p)
                .unwrap_or_else(|| panic!("fixture parent '{}' not added yet", p));
            parent_node.add_child(name);
            parent_node.name().to_string()
        });
        self.registry
            .create(NamespaceNode::new(name, description, parent_name))
            .unwrap_or_else(|e| panic!("fixture namespace '{}': {}", name, e));
        self
    }

    pub fn with_var(mut self, namespace: &str, key: &str, value: &str) -> Self {
        self.registry
            .get_mut(namespace)
            .unwrap_or_else(|| panic!("fixture namespace '{}' not added yet", namespace))
            .variables_mut()
            .set(key, value);
        self
    }

    pub fn build(self) -> NamespaceRegistry {
        self.registry
    }
}

/// Two trees with inherited and shadowed variables:
///
/// ```text
/// Proj (Env=prod, Owner=ops)
/// ├── Sub (Env=test)
/// │   └── Leaf (Level=3)
/// └── Other
/// Standalone (Env=dev)
/// ```
pub fn sample_registry() -> NamespaceRegistry {
    TestForestBuilder::new()
        .with_namespace("Proj", "project", None)
        .with_namespace("Sub", "sub project", Some("Proj"))
        .with_namespace("Leaf", "leaf", Some("Sub"))
        .with_namespace("Other", "sibling", Some("Proj"))
        .with_namespace("Standalone", "separate tree", None)
        .with_var("Proj", "Env", "prod")
        .with_var("Proj", "Owner", "ops")
        .with_var("Sub", "ENV", "test")
        .with_var("Leaf", "Level", "3")
        .with_var("Standalone", "Env", "dev")
        .build()
}
