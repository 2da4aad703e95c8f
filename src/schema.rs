//! Property schema model
//!
//! Groups and properties as resolved from the schema document. A group
//! referenced from several places is one `Rc<Group>`, never a copy.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Include tokens per artifact identifier
pub type IncludeMap = BTreeMap<String, BTreeSet<String>>;

// =============================================================================
// Extra Code
// =============================================================================

/// Hand-written code injected into an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExtraCode {
    /// One fragment for the whole artifact
    Fragment(String),
    /// Named fragments, one per hook the template exposes
    Hooks(IndexMap<String, String>),
}

impl ExtraCode {
    /// Fragment for a named hook (a plain fragment has no hooks)
    pub fn hook(&self, name: &str) -> Option<&str> {
        match self {
            ExtraCode::Fragment(_) => None,
            ExtraCode::Hooks(hooks) => hooks.get(name).map(String::as_str),
        }
    }
}

// =============================================================================
// Group
// =============================================================================

/// A named, reusable cluster of properties
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// Raw schema name (anchor name if the mapping had one, else its key)
    pub name: String,
    /// Qualified type name, the base name of every artifact of this group
    pub type_name: String,
    /// Raw name of the group this one was defined in
    #[serde(rename = "parent_group")]
    pub parent: Option<String>,
    /// Properties in declaration order
    pub properties: Vec<Property>,
    pub system_includes: IncludeMap,
    pub local_includes: IncludeMap,
    pub extra_code: BTreeMap<String, ExtraCode>,
    pub documentation: String,
    /// Schema line the group is defined on
    #[serde(skip)]
    pub line: usize,
}

impl Group {
    pub fn new(name: &str, type_name: &str, parent: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            parent: parent.map(str::to_string),
            properties: Vec::new(),
            system_includes: IncludeMap::new(),
            local_includes: IncludeMap::new(),
            extra_code: BTreeMap::new(),
            documentation: String::new(),
            line: 0,
        }
    }

    /// Find a property by name
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Sorted system includes for one artifact
    pub fn system_includes_for(&self, artifact: &str) -> Vec<&str> {
        includes_for(&self.system_includes, artifact)
    }

    /// Sorted local includes for one artifact
    pub fn local_includes_for(&self, artifact: &str) -> Vec<&str> {
        includes_for(&self.local_includes, artifact)
    }
}

fn includes_for<'a>(map: &'a IncludeMap, artifact: &str) -> Vec<&'a str> {
    map.get(artifact)
        .map(|set| set.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

// =============================================================================
// Property
// =============================================================================

/// One named value of a group
#[derive(Debug, Clone, Serialize)]
pub struct Property {
    pub name: String,
    /// Scalar type token, or the qualified name of `type_object`
    #[serde(rename = "type")]
    pub type_name: String,
    /// The group this property holds, for group-typed properties
    pub type_object: Option<Rc<Group>>,
    /// Raw name of the declaring group
    pub group: String,
}

impl Property {
    pub fn scalar(name: &str, type_name: &str, group: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            type_object: None,
            group: group.to_string(),
        }
    }

    pub fn grouped(name: &str, type_object: Rc<Group>, group: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_object.type_name.clone(),
            type_object: Some(type_object),
            group: group.to_string(),
        }
    }

    pub fn is_group(&self) -> bool {
        self.type_object.is_some()
    }
}

impl PartialEq for Property {
    /// Shared groups compare by identity
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.type_name == other.type_name
            && self.group == other.group
            && match (&self.type_object, &other.type_object) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_includes_for_missing_artifact_is_empty() {
        let group = Group::new("size", "SizeProperty", None);
        assert!(group.system_includes_for("property.h.j2").is_empty());
        assert!(group.local_includes_for("property.h.j2").is_empty());
    }

    #[test]
    fn test_grouped_property_takes_type_name() {
        let size = Rc::new(Group::new("size", "SizeProperty", Some("layout")));
        let prop = Property::grouped("padding", size.clone(), "layout");
        assert_eq!(prop.type_name, "SizeProperty");
        assert!(prop.is_group());
        assert!(Rc::ptr_eq(prop.type_object.as_ref().unwrap(), &size));
    }

    #[test]
    fn test_serialized_property_uses_type_key() {
        let prop = Property::scalar("width", "qreal", "layout");
        let json = serde_json::to_value(&prop).unwrap();
        assert_eq!(json["type"], "qreal");
        assert!(json["type_object"].is_null());
    }

    #[test]
    fn test_extra_code_hooks() {
        let mut hooks = IndexMap::new();
        hooks.insert("members".to_string(), "int x;".to_string());
        let code = ExtraCode::Hooks(hooks);
        assert_eq!(code.hook("members"), Some("int x;"));
        assert_eq!(ExtraCode::Fragment("x".into()).hook("members"), None);
        assert_eq!(serde_json::to_value(&code).unwrap()["members"], "int x;");
    }
}
