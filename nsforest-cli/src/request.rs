//! Caller-level validation of command-line requests
//!
//! The store expects these checks to have happened before a request
//! reaches it, so every failure here is reported as `InvalidValue`.

use nsforest_core::namespace::{DeleteTarget, ListRequest, ModifyRequest, Parent};
use nsforest_core::{NamespaceError, NamespaceResult};

/// Split `KEY=VALUE` at the first '='; the value may itself contain '='
pub fn parse_assignment(assignment: &str) -> NamespaceResult<(String, String)> {
    assignment
        .split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| NamespaceError::InvalidValue("Variable format must be Key=Value".to_string()))
}

pub fn parse_assignments(assignments: &[String]) -> NamespaceResult<Vec<(String, String)>> {
    assignments.iter().map(|a| parse_assignment(a)).collect()
}

/// Parent for CREATE, where the root sentinel means "no parent"
pub fn create_parent(parent: Option<&str>) -> Option<&str> {
    parent.filter(|p| Parent::parse(p) != Parent::Root)
}

pub fn modify_request(description: Option<String>, parent: Option<&str>) -> NamespaceResult<ModifyRequest> {
    let request = ModifyRequest {
        description,
        parent: parent.map(Parent::parse),
    };
    if request.is_empty() {
        return Err(NamespaceError::InvalidValue(
            "MODIFY requires DESCRIPTION or PARENT".to_string(),
        ));
    }
    Ok(request)
}

pub fn delete_target(vars: Vec<String>, confirm: bool) -> NamespaceResult<DeleteTarget> {
    match (vars.is_empty(), confirm) {
        (false, false) => Ok(DeleteTarget::Variables(vars)),
        (true, true) => Ok(DeleteTarget::Namespace),
        (true, false) => Err(NamespaceError::InvalidValue(
            "DELETE requires VAR or CONFIRM".to_string(),
        )),
        (false, true) => Err(NamespaceError::InvalidValue(
            "DELETE accepts either VAR or CONFIRM, not both".to_string(),
        )),
    }
}

pub fn list_request(namespace: Option<String>, only: bool, settings: bool) -> NamespaceResult<ListRequest> {
    match (namespace, settings) {
        (Some(_), true) => Err(NamespaceError::InvalidValue(
            "LIST SETTINGS does not take a namespace".to_string(),
        )),
        (None, true) => Ok(ListRequest::Settings),
        (Some(namespace), false) => Ok(ListRequest::Variables { namespace, only }),
        (None, false) if only => Err(NamespaceError::InvalidValue(
            "ONLY requires a namespace".to_string(),
        )),
        (None, false) => Ok(ListRequest::Namespaces),
    }
}
