/*
    store.rs - The namespace store facade

    Every operation, reads included, runs under one mutex and follows the
    same shape: validate against the registry, mutate in memory, commit.
    A failed commit has already rolled the registry back by the time the
    error reaches the caller, unless the error is flagged inconsistent.
*/

use crate::config::StoreConfig;
use crate::namespace::errors::{NamespaceError, NamespaceResult, StorageState};
use crate::namespace::node::NamespaceNode;
use crate::namespace::registry::NamespaceRegistry;
use crate::namespace::types::{
    DeleteTarget, ListRequest, ListResult, ModifyRequest, NamespaceInfo, Parent, QueryInfo,
    QueryResult, Settings, TreeNode, VariableInfo,
};
use crate::namespace::{canonical, ROOT_SENTINEL};
use crate::persistence::{
    ArchivePhase, Archiver, BackingStore, CommitState, FileBackingStore, PersistenceManager,
};
use crate::telemetry::{self, Timer};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

struct StoreInner {
    registry: NamespaceRegistry,
    persistence: PersistenceManager,
    archiver: Archiver,
}

impl StoreInner {
    fn commit(&mut self) -> NamespaceResult<()> {
        let result = self.persistence.commit(&mut self.registry);
        telemetry::record_namespace_count(self.registry.len());
        result.map_err(NamespaceError::from)
    }

    fn archive(&self, phase: ArchivePhase) {
        self.archiver
            .archive(&self.persistence.location().data_path(), phase);
    }

    fn node(&self, name: &str) -> NamespaceResult<&NamespaceNode> {
        self.registry
            .get(name)
            .ok_or_else(|| NamespaceError::namespace_missing(name))
    }

    fn node_mut(&mut self, name: &str) -> NamespaceResult<&mut NamespaceNode> {
        self.registry
            .get_mut(name)
            .ok_or_else(|| NamespaceError::namespace_missing(name))
    }

    fn settings(&self) -> Settings {
        let location = self.persistence.location();
        Settings {
            directory: location.directory.display().to_string(),
            file_name: location.file_name.clone(),
        }
    }

    fn tree(&self, node: &NamespaceNode) -> NamespaceResult<TreeNode> {
        self.registry
            .fold_subtree(node, |node, children| TreeNode {
                name: node.name().to_string(),
                children,
            })
            .map_err(|message| NamespaceError::Storage {
                message,
                state: StorageState::Consistent,
            })
    }
}

/// Durable namespace forest shared by any number of callers
pub struct NamespaceStore {
    inner: Mutex<StoreInner>,
}

impl NamespaceStore {
    /// Open the JSON data file described by `config`, loading whatever it
    /// already holds
    pub fn open(config: &StoreConfig) -> NamespaceResult<Self> {
        let backing = FileBackingStore::new(&config.data_dir, &config.file_name)?;
        Self::with_backing(Box::new(backing), Archiver::new(config.archive_dir.clone()))
    }

    pub fn with_backing(backing: Box<dyn BackingStore>, archiver: Archiver) -> NamespaceResult<Self> {
        let persistence = PersistenceManager::new(backing);
        let mut registry = NamespaceRegistry::new();
        persistence.load(&mut registry)?;

        let inner = StoreInner {
            registry,
            persistence,
            archiver,
        };
        inner.archive(ArchivePhase::Init);
        telemetry::record_namespace_count(inner.registry.len());
        info!(
            namespaces = inner.registry.len(),
            path = %inner.persistence.location().data_path().display(),
            "Namespace store opened"
        );

        Ok(NamespaceStore {
            inner: Mutex::new(inner),
        })
    }

    /// Register a new namespace, under `parent` or as a root
    pub fn create(&self, name: &str, description: &str, parent: Option<&str>) -> NamespaceResult<()> {
        self.run("create", |inner| {
            validate_name(name)?;
            if inner.registry.contains(name) {
                return Err(NamespaceError::AlreadyExists(format!(
                    "Namespace '{}' already exists",
                    name
                )));
            }

            let parent_name = match parent {
                Some(parent) => Some(
                    inner
                        .registry
                        .get(parent)
                        .ok_or_else(|| NamespaceError::parent_missing(parent))?
                        .name()
                        .to_string(),
                ),
                None => None,
            };

            inner
                .registry
                .create(NamespaceNode::new(name, description, parent_name.clone()))?;
            if let Some(parent_name) = &parent_name {
                inner.node_mut(parent_name)?.add_child(name);
            }

            inner.commit()?;
            info!(namespace = name, parent = ?parent_name, "Created namespace");
            Ok(())
        })
    }

    /// Change the description and/or the parent of a namespace
    pub fn modify(&self, name: &str, request: ModifyRequest) -> NamespaceResult<()> {
        self.run("modify", |inner| {
            if request.is_empty() {
                return Err(NamespaceError::InvalidValue(
                    "MODIFY requires a description or a parent".to_string(),
                ));
            }
            let node = inner.node(name)?;
            let node_name = node.name().to_string();
            let node_key = node.key().to_string();
            let old_parent = node.parent().map(str::to_string);

            // Outer None: parent unchanged. Inner None: becomes a root.
            let new_parent = match &request.parent {
                None => None,
                Some(Parent::Root) => Some(None),
                Some(Parent::Namespace(candidate)) => {
                    let parent_node = inner
                        .registry
                        .get(candidate)
                        .ok_or_else(|| NamespaceError::parent_missing(candidate))?;
                    if inner
                        .registry
                        .lineage(candidate)
                        .any(|ancestor| ancestor.key() == node_key)
                    {
                        return Err(NamespaceError::InvalidValue(format!(
                            "Parent namespace '{}' is invalid due to a cyclic dependency.",
                            candidate
                        )));
                    }
                    Some(Some(parent_node.name().to_string()))
                }
            };

            if let Some(description) = &request.description {
                inner.node_mut(name)?.set_description(description.as_str());
            }
            if let Some(new_parent) = new_parent {
                if let Some(old) = &old_parent {
                    inner.node_mut(old)?.remove_child(&node_name);
                }
                if let Some(new) = &new_parent {
                    inner.node_mut(new)?.add_child(&node_name);
                }
                inner.node_mut(name)?.set_parent(new_parent);
            }

            inner.commit()?;
            info!(namespace = %node_name, "Modified namespace");
            Ok(())
        })
    }

    /// Remove a namespace, or some of its variables
    pub fn delete(&self, name: &str, target: DeleteTarget) -> NamespaceResult<()> {
        self.run("delete", |inner| match target {
            DeleteTarget::Namespace => {
                inner.node(name)?;
                inner.archive(ArchivePhase::Delete);

                let removed = inner
                    .registry
                    .delete(name)
                    .ok_or_else(|| NamespaceError::namespace_missing(name))?;
                let grandparent = removed.parent().map(str::to_string);

                if let Some(parent) = &grandparent {
                    inner.node_mut(parent)?.remove_child(removed.name());
                }
                for child in removed.children() {
                    inner.node_mut(child)?.set_parent(grandparent.clone());
                    if let Some(parent) = &grandparent {
                        inner.node_mut(parent)?.add_child(child);
                    }
                }

                inner.commit()?;
                info!(
                    namespace = removed.name(),
                    reparented = removed.child_count(),
                    "Deleted namespace"
                );
                Ok(())
            }
            DeleteTarget::Variables(keys) => {
                if keys.is_empty() {
                    return Err(NamespaceError::InvalidValue(
                        "DELETE requires at least one variable key".to_string(),
                    ));
                }
                let mut seen = HashSet::new();
                let keys: Vec<String> = keys
                    .into_iter()
                    .filter(|key| seen.insert(canonical(key)))
                    .collect();

                let node = inner.node(name)?;
                if let Some(missing) = keys.iter().find(|key| !node.variables().has(key)) {
                    return Err(NamespaceError::variable_missing(missing));
                }

                let variables = inner.node_mut(name)?.variables_mut();
                for key in &keys {
                    variables.delete(key)?;
                }

                inner.commit()?;
                info!(namespace = name, removed = keys.len(), "Deleted variables");
                Ok(())
            }
        })
    }

    pub fn list(&self, request: ListRequest) -> NamespaceResult<ListResult> {
        self.run("list", |inner| match request {
            ListRequest::Namespaces => Ok(ListResult::Namespaces(
                inner
                    .registry
                    .snapshot()
                    .into_iter()
                    .map(NamespaceInfo::from)
                    .collect(),
            )),
            ListRequest::Variables { namespace, only } => {
                let node = inner.node(&namespace)?;
                let scope: Vec<&NamespaceNode> = if only {
                    vec![node]
                } else {
                    inner.registry.lineage(&namespace).collect()
                };

                let mut seen = HashSet::new();
                let mut variables = Vec::new();
                for owner in scope {
                    for variable in owner.variables().iter() {
                        if seen.insert(canonical(variable.key())) {
                            variables.push(VariableInfo {
                                key: variable.key().to_string(),
                                value: variable.value().to_string(),
                                namespace: owner.name().to_string(),
                            });
                        }
                    }
                }
                debug!(namespace = %namespace, only, count = variables.len(), "Listed variables");
                Ok(ListResult::Variables(variables))
            }
            ListRequest::Settings => Ok(ListResult::Settings(inner.settings())),
        })
    }

    /// Describe one namespace, or with `tree` its whole subtree
    pub fn query(&self, name: &str, tree: bool) -> NamespaceResult<QueryResult> {
        self.run("query", |inner| {
            let node = inner.node(name)?;
            if tree {
                return inner.tree(node).map(QueryResult::Tree);
            }
            Ok(QueryResult::Namespace(QueryInfo {
                name: node.name().to_string(),
                description: node.description().to_string(),
                parent: node.parent().map(str::to_string),
                children: node.children().map(str::to_string).collect(),
            }))
        })
    }

    /// Write variables into the namespace's own table
    pub fn set<I, K, V>(&self, name: &str, variables: I) -> NamespaceResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        // Keys are stored trimmed, so " K " and "K" name one variable
        let variables: Vec<(String, String)> = variables
            .into_iter()
            .map(|(key, value)| (key.into().trim().to_string(), value.into()))
            .collect();

        self.run("set", |inner| {
            if variables.is_empty() {
                return Err(NamespaceError::InvalidValue(
                    "SET requires at least one variable".to_string(),
                ));
            }
            if variables.iter().any(|(key, _)| key.is_empty()) {
                return Err(NamespaceError::InvalidValue(
                    "Variable key must not be empty".to_string(),
                ));
            }

            let table = inner.node_mut(name)?.variables_mut();
            for (key, value) in &variables {
                table.set(key.as_str(), value.as_str());
            }

            inner.commit()?;
            info!(namespace = name, count = variables.len(), "Set variables");
            Ok(())
        })
    }

    /// Resolve `key` from `name` upward; the closest definition wins
    pub fn get(&self, name: &str, key: &str) -> NamespaceResult<String> {
        self.run("get", |inner| {
            inner.node(name)?;
            inner
                .registry
                .lineage(name)
                .find_map(|node| node.variables().lookup(key))
                .map(|variable| variable.value().to_string())
                .ok_or_else(|| NamespaceError::variable_missing(key))
        })
    }

    pub fn settings(&self) -> NamespaceResult<Settings> {
        Ok(self.lock()?.settings())
    }

    /// Terminal state of the most recent commit
    pub fn last_commit_state(&self) -> NamespaceResult<CommitState> {
        Ok(self.lock()?.persistence.state())
    }

    /// Independent copy of the current forest
    pub fn registry_snapshot(&self) -> NamespaceResult<NamespaceRegistry> {
        Ok(self.lock()?.registry.clone())
    }

    /// Take the closing archive copy
    pub fn shutdown(&self) -> NamespaceResult<()> {
        let inner = self.lock()?;
        inner.archive(ArchivePhase::Term);
        info!(namespaces = inner.registry.len(), "Namespace store shut down");
        Ok(())
    }

    fn run<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut StoreInner) -> NamespaceResult<T>,
    ) -> NamespaceResult<T> {
        let timer = Timer::start(op);
        let result = self.lock().and_then(|mut inner| f(&mut *inner));
        if let Err(err) = &result {
            debug!(op, kind = %err.kind(), error = %err.message(), "Operation failed");
        }
        telemetry::record_operation(op, &result);
        timer.stop();
        result
    }

    fn lock(&self) -> NamespaceResult<MutexGuard<'_, StoreInner>> {
        self.inner.lock().map_err(|_| NamespaceError::Storage {
            message: "Namespace store lock poisoned by a panicked operation".to_string(),
            state: StorageState::Inconsistent,
        })
    }
}

fn validate_name(name: &str) -> NamespaceResult<()> {
    if name.trim().is_empty() {
        return Err(NamespaceError::InvalidValue(
            "Namespace name must not be empty".to_string(),
        ));
    }
    if name.eq_ignore_ascii_case(ROOT_SENTINEL) {
        return Err(NamespaceError::InvalidValue(format!(
            "Namespace name '{}' is reserved",
            name
        )));
    }
    Ok(())
}
