//! Request and result types for the namespace store
//!
//! Results are plain serializable values. They never borrow from the live
//! registry, so callers can hold them after the store lock is released.

use crate::namespace::node::NamespaceNode;
use crate::namespace::ROOT_SENTINEL;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

/// Target parent for a MODIFY request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    /// Detach from any parent
    Root,
    Namespace(String),
}

impl Parent {
    /// Interpret caller input, where the root sentinel means "no parent"
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case(ROOT_SENTINEL) {
            Parent::Root
        } else {
            Parent::Namespace(value.to_string())
        }
    }
}

/// Changes requested by MODIFY; at least one field must be set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifyRequest {
    pub description: Option<String>,
    pub parent: Option<Parent>,
}

impl ModifyRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn parent(mut self, parent: Parent) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.parent.is_none()
    }
}

/// What a DELETE request removes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    /// The whole namespace; its children move up to its parent
    Namespace,
    /// Only the listed variable keys
    Variables(Vec<String>),
}

/// The three forms of LIST
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRequest {
    Namespaces,
    Variables { namespace: String, only: bool },
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceInfo {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl From<&NamespaceNode> for NamespaceInfo {
    fn from(node: &NamespaceNode) -> Self {
        NamespaceInfo {
            name: node.name().to_string(),
            description: node.description().to_string(),
            parent: node.parent().map(str::to_string),
        }
    }
}

/// A variable in a LIST result, tagged with the namespace defining it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableInfo {
    pub key: String,
    pub value: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub directory: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ListResult {
    Namespaces(Vec<NamespaceInfo>),
    Variables(Vec<VariableInfo>),
    Settings(Settings),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryInfo {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub children: Vec<String>,
}

/// One level of a QUERY TREE result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of nodes in this subtree, itself included
    pub fn size(&self) -> usize {
        let mut size = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            size += 1;
            pending.extend(node.children.iter());
        }
        size
    }

    /// Length of the longest path from this node to a leaf, in nodes
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((node, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(node.children.iter().map(|child| (child, depth + 1)));
        }
        deepest
    }
}

impl Serialize for TreeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || {
            let mut state = serializer.serialize_struct("TreeNode", 2)?;
            state.serialize_field("name", &self.name)?;
            state.serialize_field("children", &self.children)?;
            state.end()
        })
    }
}

impl Drop for TreeNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    Namespace(QueryInfo),
    Tree(TreeNode),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_parse_sentinel() {
        assert_eq!(Parent::parse("none"), Parent::Root);
        assert_eq!(Parent::parse("NONE"), Parent::Root);
        assert_eq!(
            Parent::parse("Proj"),
            Parent::Namespace("Proj".to_string())
        );
    }

    #[test]
    fn test_modify_request_builder() {
        assert!(ModifyRequest::new().is_empty());
        let request = ModifyRequest::new().description("d").parent(Parent::Root);
        assert_eq!(request.description.as_deref(), Some("d"));
        assert_eq!(request.parent, Some(Parent::Root));
    }

    #[test]
    fn test_root_info_omits_parent() {
        let node = NamespaceNode::new("Proj", "d", None);
        let json = serde_json::to_value(NamespaceInfo::from(&node)).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Proj", "description": "d"}));
    }

    #[test]
    fn test_tree_size() {
        let tree = TreeNode {
            name: "A".into(),
            children: vec![
                TreeNode { name: "B".into(), children: vec![] },
                TreeNode {
                    name: "C".into(),
                    children: vec![TreeNode { name: "D".into(), children: vec![] }],
                },
            ],
        };
        assert_eq!(tree.size(), 4);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_tree_serializes_nested_children() {
        let tree = TreeNode {
            name: "A".into(),
            children: vec![TreeNode { name: "B".into(), children: vec![] }],
        };
        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            serde_json::json!({"name": "A", "children": [{"name": "B", "children": []}]})
        );
    }

    #[test]
    fn test_deep_tree_serializes_and_drops() {
        let mut tree = TreeNode { name: "L9999".into(), children: vec![] };
        for i in (0..9_999).rev() {
            tree = TreeNode { name: format!("L{}", i), children: vec![tree] };
        }
        assert_eq!(tree.size(), 10_000);
        assert_eq!(tree.depth(), 10_000);

        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.starts_with(r#"{"name":"L0","children":[{"name":"L1""#));
    }
}
