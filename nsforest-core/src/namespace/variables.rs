/*
    variables.rs - Per-namespace variable table

    Keys are matched case-insensitively. The casing used when a key is
    first stored is kept for the life of the entry; later writes with a
    different casing only replace the value.
*/

use crate::namespace::canonical;
use crate::namespace::errors::{NamespaceError, NamespaceResult};
use serde::Serialize;
use std::collections::btree_map::{BTreeMap, Entry};

/// A single key/value pair with its display-case key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    key: String,
    value: String,
}

impl Variable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Variable {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Case-insensitive variable container, ordered by uppercase key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    entries: BTreeMap<String, Variable>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a variable
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        match self.entries.entry(canonical(&key)) {
            Entry::Occupied(mut slot) => slot.get_mut().value = value,
            Entry::Vacant(slot) => {
                slot.insert(Variable { key, value });
            }
        }
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> NamespaceResult<&str> {
        self.lookup(key)
            .map(Variable::value)
            .ok_or_else(|| NamespaceError::variable_missing(key))
    }

    /// The stored variable for `key`, if any
    pub fn lookup(&self, key: &str) -> Option<&Variable> {
        self.entries.get(&canonical(key))
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(&canonical(key))
    }

    /// Remove and return the variable stored under `key`
    pub fn delete(&mut self, key: &str) -> NamespaceResult<Variable> {
        self.entries
            .remove(&canonical(key))
            .ok_or_else(|| NamespaceError::variable_missing(key))
    }

    /// Independent copy, safe to hand out for enumeration
    pub fn copy(&self) -> VariableTable {
        self.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
