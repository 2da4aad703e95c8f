//! Schema Resolution
//!
//! Walks the composed schema document depth-first and builds the registry of
//! groups. Per mapping entry:
//! - `_extra_code`: hand-written code per artifact, merged into the group
//! - `_extra_system_includes`: extra system includes per artifact
//! - anything else: a property, declared inline, by alias or as a scalar
//!
//! Preconditions on the document:
//! - an alias must come after the definition it refers to (document order)
//! - an alias may not refer to a group that encloses it
//! - no two groups may share a qualified type name

use indexmap::IndexMap;
use std::rc::Rc;
use tracing::debug;

use crate::codegen::classify::IncludeClassifier;
use crate::codegen::names::{self, DEFAULT_TYPE_SUFFIX};
use crate::config::GeneratorConfig;
use crate::document::{Alias, Entry, Mapping, Node, Scalar};
use crate::error::{GeneratorError, Result};
use crate::registry::Registry;
use crate::schema::{ExtraCode, Group, Property};

/// Key holding hand-written code fragments
pub const EXTRA_CODE_KEY: &str = "_extra_code";

/// Key holding additional system includes
pub const EXTRA_SYSTEM_INCLUDES_KEY: &str = "_extra_system_includes";

/// Comment lines starting with this are dropped from documentation
pub const DEFAULT_LICENSE_PREFIX: &str = "SPDX";

// =============================================================================
// Declaration
// =============================================================================

/// How a property is declared
#[derive(Debug, Clone, Copy)]
enum Declaration<'a> {
    /// A nested mapping defining a new group
    Inline(&'a Mapping),
    /// A reference to an already defined group
    Alias(&'a Alias),
    /// A scalar type token
    Scalar(&'a Scalar),
}

impl<'a> Declaration<'a> {
    fn from_node(node: &'a Node, path: &str) -> Result<Self> {
        match node {
            Node::Mapping(mapping) => Ok(Self::Inline(mapping)),
            Node::Alias(alias) => Ok(Self::Alias(alias)),
            Node::Scalar(scalar) => Ok(Self::Scalar(scalar)),
            Node::Sequence(_) => Err(structural(node, path, "a mapping, alias or type name")),
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves a schema document into a [`Registry`]
#[derive(Debug, Clone)]
pub struct Resolver {
    type_suffix: String,
    license_prefix: String,
    classifier: IncludeClassifier,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_TYPE_SUFFIX, DEFAULT_LICENSE_PREFIX, IncludeClassifier::default())
    }
}

impl Resolver {
    pub fn new(type_suffix: &str, license_prefix: &str, classifier: IncludeClassifier) -> Self {
        Self {
            type_suffix: type_suffix.to_string(),
            license_prefix: license_prefix.to_string(),
            classifier,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(
            &config.naming.type_suffix,
            &config.schema.license_prefix,
            config.classifier(),
        )
    }

    /// Resolve a whole document, naming its root group `root_name`
    pub fn resolve(&self, document: &Node, root_name: &str) -> Result<Registry> {
        let (root, registry) = self.resolve_group(document, root_name, None, root_name, Registry::new())?;
        debug!(root = %root.type_name, groups = registry.len(), "resolved schema");
        Ok(registry)
    }

    /// Resolve `node` as the group `name`, returning it and the extended registry
    fn resolve_group(
        &self,
        node: &Node,
        name: &str,
        parent: Option<&str>,
        path: &str,
        registry: Registry,
    ) -> Result<(Rc<Group>, Registry)> {
        let Node::Mapping(mapping) = node else {
            return Err(structural(node, path, "a mapping"));
        };
        self.resolve_mapping(mapping, name, parent, path, registry)
    }

    fn resolve_mapping(
        &self,
        mapping: &Mapping,
        name: &str,
        parent: Option<&str>,
        path: &str,
        mut registry: Registry,
    ) -> Result<(Rc<Group>, Registry)> {
        let type_name = names::qualify(name, &self.type_suffix);
        registry.claim(name, &type_name, mapping.mark.line)?;

        let mut group = Group::new(name, &type_name, parent);
        group.line = mapping.mark.line;
        group.documentation = self.documentation(&mapping.comment);

        for entry in &mapping.entries {
            let entry_path = format!("{}.{}", path, entry.key);
            match entry.key.as_str() {
                EXTRA_CODE_KEY => extra_code(&mut group, &entry.value, &entry_path)?,
                EXTRA_SYSTEM_INCLUDES_KEY => extra_system_includes(&mut group, &entry.value, &entry_path)?,
                _ => {
                    let (property, extended) = self.resolve_property(name, entry, &entry_path, registry)?;
                    registry = extended;
                    if property.is_group() {
                        self.classifier.apply_group(&mut group, &property.type_name);
                    } else {
                        self.classifier.apply(&mut group, &property.type_name);
                    }
                    group.properties.push(property);
                }
            }
        }

        debug!(
            group = %group.type_name,
            properties = group.properties.len(),
            "resolved group"
        );

        let group = registry.complete(group);
        Ok((group, registry))
    }

    fn resolve_property(
        &self,
        owner: &str,
        entry: &Entry,
        path: &str,
        registry: Registry,
    ) -> Result<(Property, Registry)> {
        match Declaration::from_node(&entry.value, path)? {
            Declaration::Inline(mapping) => {
                let name = mapping.anchor.as_deref().unwrap_or(&entry.key);
                let (group, registry) = self.resolve_mapping(mapping, name, Some(owner), path, registry)?;
                Ok((Property::grouped(&entry.key, group, owner), registry))
            }
            Declaration::Alias(alias) => {
                let group = registry.lookup_alias(&alias.name, path, alias.mark.line)?;
                Ok((Property::grouped(&entry.key, group, owner), registry))
            }
            Declaration::Scalar(scalar) => {
                let token = scalar.value.trim();
                if token.is_empty() {
                    return Err(GeneratorError::EmptyType {
                        path: path.to_string(),
                        line: entry.mark.line,
                    });
                }
                Ok((Property::scalar(&entry.key, token, owner), registry))
            }
        }
    }

    /// Documentation text from a mapping's leading comment lines
    fn documentation(&self, comment: &[String]) -> String {
        let mut documentation = String::new();
        for line in comment {
            let text = line.trim().trim_start_matches(['#', ' ']);
            if text.starts_with(&self.license_prefix) {
                continue;
            }
            documentation.push_str(text);
            documentation.push('\n');
        }
        documentation
    }
}

// =============================================================================
// Metadata Keys
// =============================================================================

fn extra_code(group: &mut Group, node: &Node, path: &str) -> Result<()> {
    let artifacts = expect_mapping(node, path)?;

    for artifact in &artifacts.entries {
        let code = match &artifact.value {
            Node::Scalar(fragment) => ExtraCode::Fragment(fragment.value.clone()),
            Node::Mapping(hooks) => {
                let mut fragments = IndexMap::with_capacity(hooks.len());
                for hook in &hooks.entries {
                    let hook_path = format!("{}.{}.{}", path, artifact.key, hook.key);
                    let fragment = expect_scalar(&hook.value, &hook_path)?;
                    fragments.insert(hook.key.clone(), fragment.value.clone());
                }
                ExtraCode::Hooks(fragments)
            }
            other => {
                let artifact_path = format!("{}.{}", path, artifact.key);
                return Err(structural(other, &artifact_path, "a code fragment or a mapping of fragments"));
            }
        };
        group.extra_code.insert(artifact.key.clone(), code);
    }

    Ok(())
}

fn extra_system_includes(group: &mut Group, node: &Node, path: &str) -> Result<()> {
    let artifacts = expect_mapping(node, path)?;

    for artifact in &artifacts.entries {
        let artifact_path = format!("{}.{}", path, artifact.key);
        let Node::Sequence(includes) = &artifact.value else {
            return Err(structural(&artifact.value, &artifact_path, "a sequence of includes"));
        };

        let set = group.system_includes.entry(artifact.key.clone()).or_default();
        for include in &includes.items {
            set.insert(expect_scalar(include, &artifact_path)?.value.clone());
        }
    }

    Ok(())
}

fn expect_mapping<'a>(node: &'a Node, path: &str) -> Result<&'a Mapping> {
    node.as_mapping().ok_or_else(|| structural(node, path, "a mapping"))
}

fn expect_scalar<'a>(node: &'a Node, path: &str) -> Result<&'a Scalar> {
    node.as_scalar().ok_or_else(|| structural(node, path, "a scalar"))
}

fn structural(node: &Node, path: &str, expected: &'static str) -> GeneratorError {
    GeneratorError::Structural {
        path: path.to_string(),
        line: node.mark().line,
        expected,
        found: node.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::classify::DECLARATION_ARTIFACT;
    use crate::document::compose;

    fn resolve(text: &str) -> Result<Registry> {
        Resolver::default().resolve(&compose(text)?, "style")
    }

    fn property_names(group: &Group) -> Vec<&str> {
        group.properties.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_single_scalar_group() {
        let registry = Resolver::default()
            .resolve(&compose("{size: qreal}").unwrap(), "size")
            .unwrap();

        assert_eq!(registry.len(), 1);
        let size = registry.get("size").unwrap();
        assert_eq!(size.type_name, "SizeProperty");
        assert_eq!(size.properties.len(), 1);
        assert_eq!(size.properties[0].name, "size");
        assert_eq!(size.properties[0].type_name, "qreal");
        assert!(size.properties[0].type_object.is_none());
        assert!(size.system_includes.is_empty());
        assert!(size.local_includes.is_empty());
    }

    #[test]
    fn test_nested_group() {
        let registry = resolve("border:\n  width: qreal\n  color: QColor\n").unwrap();

        let border = registry.get("border").unwrap();
        assert_eq!(border.type_name, "BorderProperty");
        assert_eq!(border.parent.as_deref(), Some("style"));
        assert_eq!(property_names(border), vec!["width", "color"]);
        assert_eq!(border.properties[0].type_name, "qreal");
        assert_eq!(border.system_includes_for(DECLARATION_ARTIFACT), vec!["QColor"]);
        assert!(border.local_includes.is_empty());

        let style = registry.root().unwrap();
        let prop = style.property("border").unwrap();
        assert_eq!(prop.type_name, "BorderProperty");
        assert!(Rc::ptr_eq(prop.type_object.as_ref().unwrap(), border));
        assert_eq!(style.local_includes_for(DECLARATION_ARTIFACT), vec!["BorderProperty.h"]);
    }

    #[test]
    fn test_nested_group_flow_syntax() {
        let registry = resolve("{border: {width: qreal, color: QColor}}").unwrap();

        let order: Vec<_> = registry.groups().map(|g| g.name.as_str()).collect();
        assert_eq!(order, vec!["border", "style"]);
        let border = registry.get("border").unwrap();
        assert_eq!(property_names(border), vec!["width", "color"]);
        assert_eq!(border.system_includes_for(DECLARATION_ARTIFACT), vec!["QColor"]);

        let style = registry.root().unwrap();
        assert!(Rc::ptr_eq(style.property("border").unwrap().type_object.as_ref().unwrap(), border));
        assert_eq!(style.local_includes_for(DECLARATION_ARTIFACT), vec!["BorderProperty.h"]);
    }

    #[test]
    fn test_group_named_like_framework_type_is_local() {
        let registry = resolve("quality:\n  level: int\n").unwrap();

        let style = registry.root().unwrap();
        assert!(style.system_includes_for(DECLARATION_ARTIFACT).is_empty());
        assert_eq!(style.local_includes_for(DECLARATION_ARTIFACT), vec!["QualityProperty.h"]);
    }

    #[test]
    fn test_documentation_above_key_after_nested_sibling() {
        let text = "\
layout:
  padding:
    left: qreal
  # Margin docs
  margins:
    top: qreal
";
        let registry = resolve(text).unwrap();
        assert_eq!(registry.get("padding").unwrap().documentation, "");
        assert_eq!(registry.get("margins").unwrap().documentation, "Margin docs\n");
    }

    #[test]
    fn test_alias_shares_group() {
        let text = "\
corners:
  topLeft: &corner
    radius: qreal
  topRight: *corner
border:
  corner: *corner
";
        let registry = resolve(text).unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.groups().filter(|g| g.name == "corner").count(), 1);

        let corner = registry.get("corner").unwrap();
        assert_eq!(corner.type_name, "CornerProperty");
        assert_eq!(corner.parent.as_deref(), Some("corners"));

        let corners = registry.get("corners").unwrap();
        let border = registry.get("border").unwrap();
        let top_right = corners.property("topRight").unwrap();
        let border_corner = border.property("corner").unwrap();

        assert!(Rc::ptr_eq(top_right.type_object.as_ref().unwrap(), corner));
        assert!(Rc::ptr_eq(border_corner.type_object.as_ref().unwrap(), corner));
        assert_eq!(border_corner.type_name, "CornerProperty");
        assert_eq!(border_corner.group, "border");
    }

    #[test]
    fn test_anchor_names_the_group() {
        let registry = resolve("layout:\n  padding: &size\n    left: qreal\n  margins: *size\n").unwrap();
        let layout = registry.get("layout").unwrap();
        assert_eq!(layout.property("padding").unwrap().type_name, "SizeProperty");
        assert_eq!(layout.property("margins").unwrap().type_name, "SizeProperty");
        assert!(registry.get("padding").is_none());
        assert_eq!(layout.local_includes_for(DECLARATION_ARTIFACT), vec!["SizeProperty.h"]);
    }

    #[test]
    fn test_completion_order_is_dependencies_first() {
        let registry = resolve("layout:\n  padding: &size\n    left: qreal\ntext:\n  font: QFont\n").unwrap();
        let order: Vec<_> = registry.groups().map(|g| g.name.as_str()).collect();
        assert_eq!(order, vec!["size", "layout", "text", "style"]);
    }

    #[test]
    fn test_unresolved_alias() {
        let err = resolve("border:\n  corner: *corner\n").unwrap_err();
        match err {
            GeneratorError::UnresolvedAlias { alias, path, line } => {
                assert_eq!(alias, "corner");
                assert_eq!(path, "style.border.corner");
                assert_eq!(line, 2);
            }
            other => panic!("Expected UnresolvedAlias, got {:?}", other),
        }
    }

    #[test]
    fn test_forward_alias_is_unresolved() {
        let text = "\
border:
  corner: *corner
corners:
  topLeft: &corner
    radius: qreal
";
        assert!(matches!(resolve(text), Err(GeneratorError::UnresolvedAlias { .. })));
    }

    #[test]
    fn test_alias_to_enclosing_group() {
        let err = resolve("layout:\n  inner:\n    outer: *layout\n").unwrap_err();
        assert!(matches!(err, GeneratorError::RecursiveAlias { line: 3, .. }));
    }

    #[test]
    fn test_name_collision() {
        let text = "\
outline:
  line:
    width: qreal
border:
  line:
    width: qreal
";
        match resolve(text).unwrap_err() {
            GeneratorError::NameCollision { type_name, line, .. } => {
                assert_eq!(type_name, "LineProperty");
                assert_eq!(line, 5);
            }
            other => panic!("Expected NameCollision, got {:?}", other),
        }
    }

    #[test]
    fn test_order_ignores_metadata_keys() {
        let text = "\
a: qreal
_extra_code:
  property.h.j2: \"// extra\"
b: int
_extra_system_includes:
  property.cpp.j2: [QDebug]
c: QColor
";
        let registry = resolve(text).unwrap();
        let style = registry.root().unwrap();
        assert_eq!(property_names(style), vec!["a", "b", "c"]);
        assert_eq!(
            style.extra_code.get("property.h.j2"),
            Some(&ExtraCode::Fragment("// extra".to_string()))
        );
        assert_eq!(style.system_includes_for("property.cpp.j2"), vec!["QDebug"]);
        assert_eq!(style.system_includes_for(DECLARATION_ARTIFACT), vec!["QColor"]);
    }

    #[test]
    fn test_extra_code_hooks() {
        let text = "\
text:
  font: QFont
  _extra_code:
    property.cpp.j2:
      members: |
        int cached = 0;
      methods: \"void touch();\"
";
        let registry = resolve(text).unwrap();
        let text_group = registry.get("text").unwrap();
        let code = &text_group.extra_code["property.cpp.j2"];
        assert_eq!(code.hook("members"), Some("int cached = 0;\n"));
        assert_eq!(code.hook("methods"), Some("void touch();"));
    }

    #[test]
    fn test_documentation_skips_license_lines() {
        let text = "\
# SPDX-License-Identifier: MIT
# SPDX-FileCopyrightText: 2024 Someone
# The root style group.
layout:
  # Layout of an element.
  #
  # Covers sizes and spacing.
  width: qreal
";
        let registry = resolve(text).unwrap();
        assert_eq!(registry.root().unwrap().documentation, "The root style group.\n");
        assert_eq!(
            registry.get("layout").unwrap().documentation,
            "Layout of an element.\n\nCovers sizes and spacing.\n"
        );
    }

    #[test]
    fn test_root_must_be_mapping() {
        let err = resolve("qreal\n").unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::Structural { expected: "a mapping", found: "a scalar", .. }
        ));
    }

    #[test]
    fn test_malformed_metadata() {
        assert!(matches!(
            resolve("_extra_code: nope\n"),
            Err(GeneratorError::Structural { .. })
        ));
        assert!(matches!(
            resolve("_extra_system_includes:\n  property.h.j2: QDebug\n"),
            Err(GeneratorError::Structural { expected: "a sequence of includes", .. })
        ));
        assert!(matches!(
            resolve("list:\n  - a\n"),
            Err(GeneratorError::Structural { .. })
        ));
    }

    #[test]
    fn test_empty_type() {
        let err = resolve("layout:\n  width:\n  height: qreal\n").unwrap_err();
        assert!(matches!(err, GeneratorError::EmptyType { line: 2, .. }));
    }

    #[test]
    fn test_every_type_is_set() {
        let text = "\
layout:
  padding: &size
    left: qreal
    right: qreal
  margins: *size
  alignment:
    horizontal: Qt::Alignment
text:
  font: QFont
  color: QColor
";
        let registry = resolve(text).unwrap();
        for group in registry.groups() {
            for property in &group.properties {
                assert!(!property.type_name.is_empty(), "{}.{}", group.name, property.name);
            }
        }
    }
}
