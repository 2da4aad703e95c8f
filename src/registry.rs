//! Resolution Registry
//!
//! Maps raw group names to resolved groups. The resolver threads one
//! registry value through its recursive walk: every call receives the
//! registry built so far and hands it back extended.
//!
//! A name is *claimed* when its definition starts and *completed* when the
//! group is fully resolved. Aliases only resolve to completed groups.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{GeneratorError, Result};
use crate::schema::Group;

/// Resolved groups, in completion order (nested groups before their parents)
#[derive(Debug, Default)]
pub struct Registry {
    groups: IndexMap<String, Rc<Group>>,
    /// Qualified type name -> raw name that claimed it
    type_names: HashMap<String, String>,
    /// Names whose definition is in progress, outermost first
    resolving: Vec<String>,
    /// First name ever claimed
    root: Option<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `name` and its qualified type name for a definition starting
    /// at `line`
    pub fn claim(&mut self, name: &str, type_name: &str, line: usize) -> Result<()> {
        if let Some(existing) = self.type_names.get(type_name) {
            return Err(GeneratorError::NameCollision {
                name: name.to_string(),
                type_name: type_name.to_string(),
                existing: existing.clone(),
                line,
            });
        }

        self.type_names.insert(type_name.to_string(), name.to_string());
        self.resolving.push(name.to_string());
        if self.root.is_none() {
            self.root = Some(name.to_string());
        }
        Ok(())
    }

    /// Store a fully resolved group, returning the shared handle
    pub fn complete(&mut self, group: Group) -> Rc<Group> {
        if let Some(pos) = self.resolving.iter().rposition(|n| *n == group.name) {
            self.resolving.remove(pos);
        }

        let name = group.name.clone();
        let group = Rc::new(group);
        self.groups.insert(name, Rc::clone(&group));
        group
    }

    /// Whether `name` is claimed but not yet complete
    pub fn is_resolving(&self, name: &str) -> bool {
        self.resolving.iter().any(|n| n == name)
    }

    /// Resolve an alias found at `path` (line `line`)
    pub fn lookup_alias(&self, alias: &str, path: &str, line: usize) -> Result<Rc<Group>> {
        if let Some(group) = self.groups.get(alias) {
            return Ok(Rc::clone(group));
        }

        if self.is_resolving(alias) {
            return Err(GeneratorError::RecursiveAlias {
                alias: alias.to_string(),
                path: path.to_string(),
                line,
            });
        }

        Err(GeneratorError::UnresolvedAlias {
            alias: alias.to_string(),
            path: path.to_string(),
            line,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Rc<Group>> {
        self.groups.get(name)
    }

    /// The group resolved from the document root
    pub fn root(&self) -> Option<&Rc<Group>> {
        self.root.as_deref().and_then(|name| self.groups.get(name))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in completion order
    pub fn groups(&self) -> impl Iterator<Item = &Rc<Group>> {
        self.groups.values()
    }

    /// Groups sorted by qualified type name
    pub fn sorted(&self) -> Vec<&Rc<Group>> {
        let mut groups: Vec<_> = self.groups.values().collect();
        groups.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        groups
    }
}

impl Serialize for Registry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.groups.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_and_complete() {
        let mut registry = Registry::new();
        registry.claim("style", "StyleProperty", 1).unwrap();
        assert!(registry.is_resolving("style"));
        assert!(registry.get("style").is_none());

        let group = registry.complete(Group::new("style", "StyleProperty", None));
        assert!(!registry.is_resolving("style"));
        assert!(Rc::ptr_eq(registry.get("style").unwrap(), &group));
        assert!(Rc::ptr_eq(registry.root().unwrap(), &group));
    }

    #[test]
    fn test_type_name_collision() {
        let mut registry = Registry::new();
        registry.claim("corner", "CornerProperty", 3).unwrap();
        registry.complete(Group::new("corner", "CornerProperty", None));

        let err = registry.claim("Corner", "CornerProperty", 9).unwrap_err();
        match err {
            GeneratorError::NameCollision { name, existing, line, .. } => {
                assert_eq!(name, "Corner");
                assert_eq!(existing, "corner");
                assert_eq!(line, 9);
            }
            other => panic!("Expected NameCollision, got {:?}", other),
        }
    }

    #[test]
    fn test_alias_to_group_in_progress() {
        let mut registry = Registry::new();
        registry.claim("style", "StyleProperty", 1).unwrap();
        let err = registry.lookup_alias("style", "style.self", 4).unwrap_err();
        assert!(matches!(err, GeneratorError::RecursiveAlias { .. }));
    }

    #[test]
    fn test_alias_to_unknown_group() {
        let registry = Registry::new();
        let err = registry.lookup_alias("missing", "style.x", 2).unwrap_err();
        assert!(matches!(err, GeneratorError::UnresolvedAlias { line: 2, .. }));
    }

    #[test]
    fn test_sorted_by_type_name() {
        let mut registry = Registry::new();
        for name in ["text", "border", "layout"] {
            let type_name = crate::codegen::names::qualify(name, "Property");
            registry.claim(name, &type_name, 1).unwrap();
            registry.complete(Group::new(name, &type_name, None));
        }
        let names: Vec<_> = registry.sorted().iter().map(|g| g.type_name.as_str()).collect();
        assert_eq!(names, vec!["BorderProperty", "LayoutProperty", "TextProperty"]);
    }
}
