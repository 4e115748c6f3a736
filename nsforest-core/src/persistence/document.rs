/*
    document.rs - Serialized form of the namespace forest

    A document lists the root namespaces. Each element nests its variables
    and its child namespaces, so parent links are implied by nesting and
    never stored explicitly.
*/

use crate::namespace::{NamespaceNode, NamespaceRegistry};
use crate::persistence::errors::{PersistenceError, PersistenceResult};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::mem;

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// Stack left free before serializing one more nesting level
const STACK_RED_ZONE: usize = 64 * 1024;
/// Size of each extra stack segment when the red zone is reached
const STACK_SEGMENT: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDocument {
    pub format_version: u32,
    #[serde(default)]
    pub namespaces: Vec<NamespaceElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamespaceElement {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variables: Vec<VariableElement>,
    #[serde(default)]
    pub namespaces: Vec<NamespaceElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableElement {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl Default for NamespaceDocument {
    fn default() -> Self {
        NamespaceDocument {
            format_version: FORMAT_VERSION,
            namespaces: Vec::new(),
        }
    }
}

impl NamespaceDocument {
    /// Build a document from every root namespace and its descendants
    pub fn from_registry(registry: &NamespaceRegistry) -> PersistenceResult<Self> {
        let namespaces = registry
            .roots()
            .map(|root| {
                registry
                    .fold_subtree(root, element_for)
                    .map_err(PersistenceError::Malformed)
            })
            .collect::<PersistenceResult<Vec<_>>>()?;

        Ok(NamespaceDocument {
            format_version: FORMAT_VERSION,
            namespaces,
        })
    }

    /// Rebuild a registry, restoring parent, children and variables
    pub fn into_registry(self) -> PersistenceResult<NamespaceRegistry> {
        if self.format_version != FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: self.format_version,
                expected: FORMAT_VERSION,
            });
        }

        let mut registry = NamespaceRegistry::new();
        // Depth-first, so elements land in document order
        let mut pending: Vec<(NamespaceElement, Option<String>)> =
            self.namespaces.into_iter().rev().map(|element| (element, None)).collect();

        while let Some((mut element, parent)) = pending.pop() {
            let name = mem::take(&mut element.name);
            if name.trim().is_empty() {
                return Err(PersistenceError::Malformed(
                    "namespace element without a name".to_string(),
                ));
            }
            if registry.contains(&name) {
                return Err(PersistenceError::DuplicateName(name));
            }

            let mut node = NamespaceNode::new(name.clone(), mem::take(&mut element.description), parent);
            for var in mem::take(&mut element.variables) {
                node.variables_mut().set(var.key, var.value);
            }
            let children = mem::take(&mut element.namespaces);
            for child in &children {
                node.add_child(&child.name);
            }
            registry
                .create(node)
                .map_err(|_| PersistenceError::DuplicateName(name.clone()))?;

            pending.extend(
                children
                    .into_iter()
                    .rev()
                    .map(|child| (child, Some(name.clone()))),
            );
        }
        Ok(registry)
    }

    /// Total number of namespace elements at any depth
    pub fn namespace_count(&self) -> usize {
        let mut count = 0;
        let mut pending: Vec<&NamespaceElement> = self.namespaces.iter().collect();
        while let Some(element) = pending.pop() {
            count += 1;
            pending.extend(element.namespaces.iter());
        }
        count
    }
}

impl Serialize for NamespaceElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // One call per nesting level; grow the stack instead of overflowing it
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            let fields = 2
                + usize::from(!self.variables.is_empty())
                + usize::from(!self.namespaces.is_empty());
            let mut state = serializer.serialize_struct("NamespaceElement", fields)?;
            state.serialize_field("name", &self.name)?;
            state.serialize_field("description", &self.description)?;
            if self.variables.is_empty() {
                state.skip_field("variables")?;
            } else {
                state.serialize_field("variables", &self.variables)?;
            }
            if self.namespaces.is_empty() {
                state.skip_field("namespaces")?;
            } else {
                state.serialize_field("namespaces", &self.namespaces)?;
            }
            state.end()
        })
    }
}

impl Drop for NamespaceElement {
    fn drop(&mut self) {
        // Flatten nested children so dropping a deep chain does not recurse
        let mut pending = mem::take(&mut self.namespaces);
        while let Some(mut element) = pending.pop() {
            pending.append(&mut element.namespaces);
        }
    }
}

fn element_for(node: &NamespaceNode, namespaces: Vec<NamespaceElement>) -> NamespaceElement {
    let variables = node
        .variables()
        .iter()
        .map(|var| VariableElement {
            key: var.key().to_string(),
            value: var.value().to_string(),
        })
        .collect();

    NamespaceElement {
        name: node.name().to_string(),
        description: node.description().to_string(),
        variables,
        namespaces,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::sample_registry;

    #[test]
    fn test_document_round_trip_preserves_forest() {
        let registry = sample_registry();
        let document = NamespaceDocument::from_registry(&registry).unwrap();

        assert_eq!(document.namespace_count(), registry.len());

        let rebuilt = document.into_registry().unwrap();
        assert_eq!(rebuilt, registry);
        assert!(rebuilt.check_links().is_ok());
    }

    #[test]
    fn test_only_roots_at_top_level() {
        let registry = sample_registry();
        let document = NamespaceDocument::from_registry(&registry).unwrap();

        let top: Vec<&str> = document.namespaces.iter().map(|e| e.name.as_str()).collect();
        let roots: Vec<&str> = registry.roots().map(|n| n.name()).collect();
        assert_eq!(top, roots);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let json = r#"{
            "format_version": 1,
            "namespaces": [
                {"name": "Proj", "namespaces": [{"name": "PROJ"}]}
            ]
        }"#;
        let document: NamespaceDocument = serde_json::from_str(json).unwrap();

        let err = document.into_registry().unwrap_err();
        assert!(matches!(err, PersistenceError::DuplicateName(name) if name == "PROJ"));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let document = NamespaceDocument {
            format_version: 99,
            namespaces: vec![],
        };
        assert!(matches!(
            document.into_registry(),
            Err(PersistenceError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"format_version": 1, "namespaces": [{"name": "Bare"}]}"#;
        let document: NamespaceDocument = serde_json::from_str(json).unwrap();
        let registry = document.into_registry().unwrap();

        let node = registry.get("bare").unwrap();
        assert_eq!(node.description(), "");
        assert!(node.variables().is_empty());
        assert!(node.is_root());
    }

    #[test]
    fn test_nested_parents_restored() {
        let json = r#"{
            "format_version": 1,
            "namespaces": [{
                "name": "Proj",
                "description": "d",
                "variables": [{"key": "K1", "value": "V1"}],
                "namespaces": [{"name": "Sub", "description": "d2"}]
            }]
        }"#;
        let document: NamespaceDocument = serde_json::from_str(json).unwrap();
        let registry = document.into_registry().unwrap();

        let sub = registry.get("sub").unwrap();
        assert_eq!(sub.parent(), Some("Proj"));
        assert!(registry.get("proj").unwrap().has_child("Sub"));
        assert_eq!(
            registry.get("proj").unwrap().variables().get("k1").unwrap(),
            "V1"
        );
    }
}
