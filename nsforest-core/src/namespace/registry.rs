/*
    registry.rs - Catalog of all namespaces

    Keyed by uppercase name. The registry owns every node and is the only
    authority on whether a namespace exists.
*/

use crate::namespace::canonical;
use crate::namespace::errors::{NamespaceError, NamespaceResult};
use crate::namespace::node::NamespaceNode;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceRegistry {
    nodes: BTreeMap<String, NamespaceNode>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node under its uppercase name
    pub fn create(&mut self, node: NamespaceNode) -> NamespaceResult<()> {
        if self.nodes.contains_key(node.key()) {
            return Err(NamespaceError::AlreadyExists(format!(
                "Namespace '{}' already exists",
                node.name()
            )));
        }
        self.nodes.insert(node.key().to_string(), node);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&NamespaceNode> {
        self.nodes.get(&canonical(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut NamespaceNode> {
        self.nodes.get_mut(&canonical(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(&canonical(name))
    }

    pub fn delete(&mut self, name: &str) -> Option<NamespaceNode> {
        self.nodes.remove(&canonical(name))
    }

    /// All nodes ordered by uppercase name
    pub fn snapshot(&self) -> Vec<&NamespaceNode> {
        self.nodes.values().collect()
    }

    /// Root nodes ordered by uppercase name
    pub fn roots(&self) -> impl Iterator<Item = &NamespaceNode> {
        self.nodes.values().filter(|node| node.is_root())
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The named node followed by each of its ancestors up to the root
    pub fn lineage(&self, name: &str) -> Lineage<'_> {
        Lineage {
            registry: self,
            next: self.get(name),
            remaining: self.nodes.len(),
        }
    }

    /// Build a value for the subtree under `root` bottom-up. `build` gets
    /// each node together with its children's values in child order. Walks
    /// with an explicit stack, so chain depth is bounded by memory only.
    pub fn fold_subtree<T>(
        &self,
        root: &NamespaceNode,
        mut build: impl FnMut(&NamespaceNode, Vec<T>) -> T,
    ) -> Result<T, String> {
        let mut stack = vec![Frame::new(root)];
        while let Some(mut frame) = stack.pop() {
            if let Some(child_name) = frame.pending.pop() {
                let child = self.get(child_name).ok_or_else(|| {
                    format!(
                        "namespace '{}' lists child '{}' which is not registered",
                        frame.node.name(),
                        child_name
                    )
                })?;
                if stack.len() + 1 >= self.nodes.len() {
                    return Err(format!("'{}' is part of a child cycle", child.name()));
                }
                stack.push(frame);
                stack.push(Frame::new(child));
                continue;
            }

            let value = build(frame.node, frame.done);
            match stack.last_mut() {
                Some(parent) => parent.done.push(value),
                None => return Ok(value),
            }
        }
        Err(format!("subtree walk of '{}' ended without a result", root.name()))
    }

    /// Check the bidirectional parent/children links and acyclicity.
    /// Returns a description of the first violation found.
    pub fn check_links(&self) -> Result<(), String> {
        for node in self.nodes.values() {
            if let Some(parent) = node.parent() {
                let parent_node = self
                    .get(parent)
                    .ok_or_else(|| format!("'{}' has missing parent '{}'", node.name(), parent))?;
                if !parent_node.has_child(node.name()) {
                    return Err(format!(
                        "'{}' is not listed as a child of its parent '{}'",
                        node.name(),
                        parent_node.name()
                    ));
                }
            }

            for child in node.children() {
                let child_node = self
                    .get(child)
                    .ok_or_else(|| format!("'{}' lists missing child '{}'", node.name(), child))?;
                let points_back = child_node
                    .parent()
                    .map(|p| canonical(p) == node.key())
                    .unwrap_or(false);
                if !points_back {
                    return Err(format!(
                        "child '{}' of '{}' has a different parent",
                        child_node.name(),
                        node.name()
                    ));
                }
            }

            let depth = self.lineage(node.name()).count();
            let reaches_root = self
                .lineage(node.name())
                .last()
                .map(NamespaceNode::is_root)
                .unwrap_or(false);
            if !reaches_root || depth > self.nodes.len() {
                return Err(format!("'{}' is part of a parent cycle", node.name()));
            }
        }
        Ok(())
    }
}

/// One open node of a `fold_subtree` walk
struct Frame<'a, T> {
    node: &'a NamespaceNode,
    /// Children not visited yet, last child first
    pending: Vec<&'a str>,
    done: Vec<T>,
}

impl<'a, T> Frame<'a, T> {
    fn new(node: &'a NamespaceNode) -> Self {
        let mut pending: Vec<&str> = node.children().collect();
        pending.reverse();
        Frame {
            node,
            done: Vec::with_capacity(pending.len()),
            pending,
        }
    }
}

/// Iterator over a node and its ancestors. Bounded by the registry size so
/// a corrupted parent chain cannot loop forever.
pub struct Lineage<'a> {
    registry: &'a NamespaceRegistry,
    next: Option<&'a NamespaceNode>,
    remaining: usize,
}

impl<'a> Iterator for Lineage<'a> {
    type Item = &'a NamespaceNode;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.next?;
        self.remaining -= 1;
        self.next = node.parent().and_then(|parent| self.registry.get(parent));
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::ErrorKind;

    fn chain() -> NamespaceRegistry {
        let mut registry = NamespaceRegistry::new();
        let mut root = NamespaceNode::new("Root", "", None);
        root.add_child("Mid");
        let mut mid = NamespaceNode::new("Mid", "", Some("Root".into()));
        mid.add_child("Leaf");
        let leaf = NamespaceNode::new("Leaf", "", Some("Mid".into()));
        registry.create(root).unwrap();
        registry.create(mid).unwrap();
        registry.create(leaf).unwrap();
        registry
    }

    #[test]
    fn test_create_rejects_duplicate_any_casing() {
        let mut registry = NamespaceRegistry::new();
        registry.create(NamespaceNode::new("Proj", "", None)).unwrap();

        let err = registry
            .create(NamespaceNode::new("PROJ", "other", None))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("proj").unwrap().description(), "");
    }

    #[test]
    fn test_get_and_delete_case_insensitive() {
        let mut registry = chain();
        assert!(registry.contains("mid"));
        assert_eq!(registry.get("LEAF").unwrap().name(), "Leaf");

        let removed = registry.delete("leaf").unwrap();
        assert_eq!(removed.name(), "Leaf");
        assert!(!registry.contains("Leaf"));
        assert!(registry.delete("leaf").is_none());
    }

    #[test]
    fn test_snapshot_sorted_by_uppercase_name() {
        let mut registry = NamespaceRegistry::new();
        for name in ["beta", "Alpha", "GAMMA"] {
            registry.create(NamespaceNode::new(name, "", None)).unwrap();
        }

        let names: Vec<&str> = registry.snapshot().iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["Alpha", "beta", "GAMMA"]);
    }

    #[test]
    fn test_lineage_walks_to_root() {
        let registry = chain();
        let names: Vec<&str> = registry.lineage("leaf").map(|n| n.name()).collect();
        assert_eq!(names, vec!["Leaf", "Mid", "Root"]);

        assert_eq!(registry.lineage("missing").count(), 0);
    }

    #[test]
    fn test_roots_and_clear() {
        let mut registry = chain();
        let roots: Vec<&str> = registry.roots().map(|n| n.name()).collect();
        assert_eq!(roots, vec!["Root"]);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_check_links_accepts_consistent_chain() {
        assert!(chain().check_links().is_ok());
    }

    #[test]
    fn test_check_links_detects_one_sided_link() {
        let mut registry = chain();
        registry.get_mut("Mid").unwrap().remove_child("Leaf");
        assert!(registry.check_links().is_err());
    }

    #[test]
    fn test_check_links_detects_cycle() {
        let mut registry = NamespaceRegistry::new();
        let mut a = NamespaceNode::new("A", "", Some("B".into()));
        a.add_child("B");
        let mut b = NamespaceNode::new("B", "", Some("A".into()));
        b.add_child("A");
        registry.create(a).unwrap();
        registry.create(b).unwrap();

        assert!(registry.check_links().is_err());
        assert_eq!(registry.lineage("A").count(), 2);
    }

    #[test]
    fn test_fold_subtree_visits_children_in_order() {
        let mut registry = chain();
        registry.get_mut("Mid").unwrap().add_child("Alt");
        registry
            .create(NamespaceNode::new("Alt", "", Some("Mid".into())))
            .unwrap();

        let rendered = registry
            .fold_subtree(registry.get("root").unwrap(), |node, children: Vec<String>| {
                if children.is_empty() {
                    node.name().to_string()
                } else {
                    format!("{}({})", node.name(), children.join(","))
                }
            })
            .unwrap();
        assert_eq!(rendered, "Root(Mid(Alt,Leaf))");
    }

    #[test]
    fn test_fold_subtree_reports_missing_child() {
        let mut registry = chain();
        registry.delete("Leaf");

        let err = registry
            .fold_subtree(registry.get("Root").unwrap(), |_, _: Vec<()>| ())
            .unwrap_err();
        assert!(err.contains("Leaf"));
    }

    #[test]
    fn test_fold_subtree_stops_on_child_cycle() {
        let mut registry = NamespaceRegistry::new();
        let mut a = NamespaceNode::new("A", "", None);
        a.add_child("B");
        let mut b = NamespaceNode::new("B", "", Some("A".into()));
        b.add_child("A");
        registry.create(a).unwrap();
        registry.create(b).unwrap();

        assert!(registry
            .fold_subtree(registry.get("A").unwrap(), |_, _: Vec<()>| ())
            .is_err());
    }

    #[test]
    fn test_fold_subtree_handles_deep_chain() {
        let depth = 20_000;
        let mut registry = NamespaceRegistry::new();
        for i in 0..depth {
            let parent = (i > 0).then(|| format!("L{}", i - 1));
            let mut node = NamespaceNode::new(format!("L{}", i), "", parent);
            if i + 1 < depth {
                node.add_child(&format!("L{}", i + 1));
            }
            registry.create(node).unwrap();
        }

        let counted = registry
            .fold_subtree(registry.get("L0").unwrap(), |_, children: Vec<usize>| {
                1 + children.iter().sum::<usize>()
            })
            .unwrap();
        assert_eq!(counted, depth);
    }
}
