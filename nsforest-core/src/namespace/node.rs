/*
    node.rs - A single namespace

    The parent is held by name, never by reference. The children set is
    adjacency data kept in step with the children's parent fields by the
    store on every structural change.
*/

use crate::namespace::canonical;
use crate::namespace::variables::VariableTable;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceNode {
    name: String,
    key: String,
    description: String,
    parent: Option<String>,
    /// Uppercase child name -> display name
    children: BTreeMap<String, String>,
    variables: VariableTable,
}

impl NamespaceNode {
    /// Create a node; `parent` of `None` makes it a root
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parent: Option<String>,
    ) -> Self {
        let name = name.into();
        NamespaceNode {
            key: canonical(&name),
            name,
            description: description.into(),
            parent,
            children: BTreeMap::new(),
            variables: VariableTable::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Uppercase registry key
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn set_parent(&mut self, parent: Option<String>) {
        self.parent = parent;
    }

    /// Child display names in uppercase order
    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.children.values().map(String::as_str)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.contains_key(&canonical(name))
    }

    pub fn add_child(&mut self, name: &str) {
        self.children.insert(canonical(name), name.to_string());
    }

    /// Returns false if `name` was not a child
    pub fn remove_child(&mut self, name: &str) -> bool {
        self.children.remove(&canonical(name)).is_some()
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut VariableTable {
        &mut self.variables
    }
}
