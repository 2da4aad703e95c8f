//! Include Classification
//!
//! Decides which include a property type needs in the declaration artifact:
//! - bare primitives need none
//! - framework types need a system include (`<QColor>`)
//! - project types need a local include (`"SizeProperty.h"`)
//!
//! Rules are evaluated in declaration order and the first match wins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::schema::Group;

/// Artifact whose includes are filled by classification
pub const DECLARATION_ARTIFACT: &str = "property.h.j2";

/// Extension appended to locally generated type names
pub const DEFAULT_HEADER_EXTENSION: &str = ".h";

// =============================================================================
// Rules
// =============================================================================

/// Where an include goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeBucket {
    /// No include needed
    None,
    /// `#include <...>`
    System,
    /// `#include "..."`
    Local,
}

/// One classification rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeRule {
    /// Prefix (or exact token, see `exact`) the type must match
    pub pattern: String,

    /// Match the whole token instead of a prefix
    #[serde(default)]
    pub exact: bool,

    pub bucket: IncludeBucket,

    /// Fixed include. When absent a system include is the token itself and a
    /// local include is the token plus the header extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
}

impl IncludeRule {
    pub fn exact(pattern: &str, bucket: IncludeBucket) -> Self {
        Self {
            pattern: pattern.to_string(),
            exact: true,
            bucket,
            include: None,
        }
    }

    pub fn prefix(pattern: &str, bucket: IncludeBucket, include: Option<&str>) -> Self {
        Self {
            pattern: pattern.to_string(),
            exact: false,
            bucket,
            include: include.map(str::to_string),
        }
    }

    pub fn matches(&self, token: &str) -> bool {
        if self.exact {
            token == self.pattern
        } else {
            token.starts_with(&self.pattern)
        }
    }
}

/// Rules used when the configuration does not provide any
pub fn default_rules() -> Vec<IncludeRule> {
    vec![
        IncludeRule::exact("qreal", IncludeBucket::None),
        IncludeRule::exact("int", IncludeBucket::None),
        IncludeRule::exact("bool", IncludeBucket::None),
        IncludeRule::prefix("Qt::", IncludeBucket::System, Some("QtGlobal")),
        IncludeRule::prefix("Q", IncludeBucket::System, None),
        IncludeRule::prefix("Union::Properties::", IncludeBucket::Local, Some("../PropertiesTypes.h")),
        IncludeRule::prefix("", IncludeBucket::Local, None),
    ]
}

// =============================================================================
// Classification
// =============================================================================

/// Result of classifying one type token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub bucket: IncludeBucket,
    pub include: Option<String>,
}

impl Classification {
    fn none() -> Self {
        Self {
            bucket: IncludeBucket::None,
            include: None,
        }
    }
}

/// Ordered include rules plus the settings they need
#[derive(Debug, Clone)]
pub struct IncludeClassifier {
    rules: Vec<IncludeRule>,
    header_extension: String,
    artifact: String,
}

impl Default for IncludeClassifier {
    fn default() -> Self {
        Self::new(default_rules(), DEFAULT_HEADER_EXTENSION, DECLARATION_ARTIFACT)
    }
}

impl IncludeClassifier {
    pub fn new(rules: Vec<IncludeRule>, header_extension: &str, artifact: &str) -> Self {
        Self {
            rules,
            header_extension: header_extension.to_string(),
            artifact: artifact.to_string(),
        }
    }

    /// Classify a type token. Tokens no rule matches need no include.
    pub fn classify(&self, token: &str) -> Classification {
        let Some(rule) = self.rules.iter().find(|r| r.matches(token)) else {
            return Classification::none();
        };

        let include = match rule.bucket {
            IncludeBucket::None => None,
            IncludeBucket::System => Some(rule.include.clone().unwrap_or_else(|| token.to_string())),
            IncludeBucket::Local => Some(
                rule.include
                    .clone()
                    .unwrap_or_else(|| format!("{}{}", token, self.header_extension)),
            ),
        };

        Classification {
            bucket: rule.bucket,
            include,
        }
    }

    /// Record a classification into the group's include sets
    pub fn record(&self, group: &mut Group, classification: Classification) {
        let Some(include) = classification.include else {
            return;
        };

        let target = match classification.bucket {
            IncludeBucket::None => return,
            IncludeBucket::System => &mut group.system_includes,
            IncludeBucket::Local => &mut group.local_includes,
        };

        target
            .entry(self.artifact.clone())
            .or_insert_with(BTreeSet::new)
            .insert(include);
    }

    /// Classify and record in one step
    pub fn apply(&self, group: &mut Group, token: &str) {
        let classification = self.classify(token);
        self.record(group, classification);
    }

    /// Record the header of a generated group type
    ///
    /// Group types never go through the rules: their qualified name may
    /// start like a framework type (`QualityProperty`).
    pub fn apply_group(&self, group: &mut Group, type_name: &str) {
        self.record(
            group,
            Classification {
                bucket: IncludeBucket::Local,
                include: Some(format!("{}{}", type_name, self.header_extension)),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(token: &str) -> (IncludeBucket, Option<String>) {
        let c = IncludeClassifier::default().classify(token);
        (c.bucket, c.include)
    }

    #[test]
    fn test_primitives_need_no_include() {
        assert_eq!(classify("qreal"), (IncludeBucket::None, None));
        assert_eq!(classify("int"), (IncludeBucket::None, None));
        assert_eq!(classify("bool"), (IncludeBucket::None, None));
    }

    #[test]
    fn test_namespaced_enum_uses_global_header() {
        assert_eq!(
            classify("Qt::Alignment"),
            (IncludeBucket::System, Some("QtGlobal".to_string()))
        );
    }

    #[test]
    fn test_framework_type_includes_itself() {
        assert_eq!(classify("QColor"), (IncludeBucket::System, Some("QColor".to_string())));
    }

    #[test]
    fn test_internal_namespace_maps_to_types_header() {
        assert_eq!(
            classify("Union::Properties::LineStyle"),
            (IncludeBucket::Local, Some("../PropertiesTypes.h".to_string()))
        );
    }

    #[test]
    fn test_fallback_is_local_header() {
        assert_eq!(
            classify("SizeProperty"),
            (IncludeBucket::Local, Some("SizeProperty.h".to_string()))
        );
    }

    #[test]
    fn test_first_match_wins() {
        // "Qt::" is declared before "Q", so the global header wins
        let rules = vec![
            IncludeRule::prefix("Q", IncludeBucket::System, None),
            IncludeRule::prefix("Qt::", IncludeBucket::System, Some("QtGlobal")),
        ];
        let reordered = IncludeClassifier::new(rules, ".h", DECLARATION_ARTIFACT);
        assert_eq!(reordered.classify("Qt::Alignment").include.as_deref(), Some("Qt::Alignment"));
        assert_eq!(classify("Qt::Alignment").1.as_deref(), Some("QtGlobal"));
    }

    #[test]
    fn test_exact_rules_do_not_match_prefixes() {
        assert_eq!(
            classify("integerValue"),
            (IncludeBucket::Local, Some("integerValue.h".to_string()))
        );
    }

    #[test]
    fn test_record_into_group() {
        let classifier = IncludeClassifier::default();
        let mut group = Group::new("border", "BorderProperty", None);

        classifier.apply(&mut group, "QColor");
        classifier.apply(&mut group, "QColor");
        classifier.apply(&mut group, "qreal");
        classifier.apply(&mut group, "LineProperty");

        let system = &group.system_includes[DECLARATION_ARTIFACT];
        assert_eq!(system.iter().collect::<Vec<_>>(), vec!["QColor"]);
        let local = &group.local_includes[DECLARATION_ARTIFACT];
        assert_eq!(local.iter().collect::<Vec<_>>(), vec!["LineProperty.h"]);
    }

    #[test]
    fn test_group_types_are_always_local() {
        let classifier = IncludeClassifier::default();
        let mut group = Group::new("style", "StyleProperty", None);

        classifier.apply_group(&mut group, "QualityProperty");

        assert!(group.system_includes.is_empty());
        let local = &group.local_includes[DECLARATION_ARTIFACT];
        assert_eq!(local.iter().collect::<Vec<_>>(), vec!["QualityProperty.h"]);
    }
}
