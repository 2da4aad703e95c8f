//! Code Generation
//!
//! Turns a resolved [`Registry`] into generated files.
//!
//! Architecture:
//! - RenderContext: pure projection of one Group, scoped to one artifact
//! - CollectionContext: projection of the whole registry for collection artifacts
//! - Renderer: template environment producing text from either context
//! - Generator: walks the output plan and renders every artifact in memory
//!
//! The key constraint: templates NEVER see the registry or the schema document,
//! only context fields. Every file is rendered before anything is written.

pub mod classify;
pub mod names;
pub mod output;
pub mod render;

use serde::Serialize;
use std::borrow::Cow;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::registry::Registry;
use crate::schema::{ExtraCode, Group, Property};

pub use output::{
    Artifact, ArtifactScope, BuildTarget, DriftReport, OutputDir, OutputLayout, ARTIFACTS,
    QUICK_FILE_SUFFIX,
};
pub use render::Renderer;

// =============================================================================
// RenderContext
// =============================================================================

/// A RenderContext is a pure projection of one Group for one artifact.
///
/// Include sets and extra code are narrowed to the artifact being rendered;
/// everything else is borrowed from the Group as is.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext<'a> {
    pub name: &'a str,
    pub type_name: &'a str,
    pub parent_group: Option<&'a str>,
    pub properties: &'a [Property],
    pub documentation: &'a str,

    /// Extra code for this artifact; an empty fragment when there is none
    pub extra_code: Cow<'a, ExtraCode>,

    /// Sorted system includes for this artifact
    pub system_includes: Vec<&'a str>,

    /// Sorted local includes for this artifact
    pub local_includes: Vec<&'a str>,
}

impl<'a> RenderContext<'a> {
    /// Project `group` for `artifact`
    pub fn project(group: &'a Group, artifact: &str) -> Self {
        let extra_code = match group.extra_code.get(artifact) {
            Some(code) => Cow::Borrowed(code),
            None => Cow::Owned(ExtraCode::Fragment(String::new())),
        };

        Self {
            name: &group.name,
            type_name: &group.type_name,
            parent_group: group.parent.as_deref(),
            properties: &group.properties,
            documentation: &group.documentation,
            extra_code,
            system_includes: group.system_includes_for(artifact),
            local_includes: group.local_includes_for(artifact),
        }
    }
}

// =============================================================================
// CollectionContext
// =============================================================================

/// One line of the stylesheet defaults listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StylesheetEntry {
    /// Hyphenated path of display names from the root group
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Context for artifacts covering every group
#[derive(Debug, Clone, Serialize)]
pub struct CollectionContext<'a> {
    /// All groups, sorted by qualified type name
    pub types: Vec<&'a Group>,
    pub target_name: &'a str,
    pub file_suffix: &'a str,
    /// Every scalar reachable from the root group
    pub stylesheet: Vec<StylesheetEntry>,
}

impl<'a> CollectionContext<'a> {
    pub fn new(registry: &'a Registry, target_name: &'a str, file_suffix: &'a str) -> Self {
        let mut stylesheet = Vec::new();
        if let Some(root) = registry.root() {
            collect_stylesheet(root, &mut Vec::new(), &mut stylesheet);
        }

        Self {
            types: registry.sorted().into_iter().map(|g| g.as_ref()).collect(),
            target_name,
            file_suffix,
            stylesheet,
        }
    }
}

fn collect_stylesheet(group: &Group, path: &mut Vec<String>, entries: &mut Vec<StylesheetEntry>) {
    for property in &group.properties {
        path.push(names::display_name(&property.name));
        match &property.type_object {
            Some(nested) => collect_stylesheet(nested, path, entries),
            None => entries.push(StylesheetEntry {
                name: path.join("-"),
                type_name: property.type_name.clone(),
            }),
        }
        path.pop();
    }
}

// =============================================================================
// Generator
// =============================================================================

/// One rendered file, not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Absolute path under the output root
    pub path: PathBuf,
    /// Template it was rendered from
    pub template: &'static str,
    pub contents: String,
}

/// Renders every planned artifact for a registry
pub struct Generator {
    layout: OutputLayout,
    renderer: Renderer,
    core_target: String,
    quick_target: String,
}

impl Generator {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        Ok(Self {
            layout: OutputLayout::from_config(config),
            renderer: Renderer::new(config.templates_dir().as_deref())?,
            core_target: config.targets.core.clone(),
            quick_target: config.targets.quick.clone(),
        })
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Render every artifact in memory. The first template error aborts.
    pub fn render_all(&self, registry: &Registry) -> Result<Vec<GeneratedFile>> {
        let mut files = Vec::new();

        for group in registry.groups() {
            for artifact in ARTIFACTS.iter().filter(|a| a.scope == ArtifactScope::Group) {
                let context = RenderContext::project(group, artifact.template);
                let contents = self.renderer.render_group(artifact.template, context)?;
                let path = self.layout.group_file(artifact, &group.type_name);
                debug!(path = %path.display(), template = artifact.template, "rendered");
                files.push(GeneratedFile {
                    path,
                    template: artifact.template,
                    contents,
                });
            }
        }

        for artifact in ARTIFACTS.iter().filter(|a| a.scope == ArtifactScope::Collection) {
            let (target, suffix) = match artifact.target {
                BuildTarget::Core => (self.core_target.as_str(), ""),
                BuildTarget::Quick => (self.quick_target.as_str(), QUICK_FILE_SUFFIX),
            };
            let context = CollectionContext::new(registry, target, suffix);
            let contents = self.renderer.render_collection(artifact.template, &context)?;
            let path = self.layout.collection_file(artifact);
            debug!(path = %path.display(), template = artifact.template, "rendered");
            files.push(GeneratedFile {
                path,
                template: artifact.template,
                contents,
            });
        }

        info!(files = files.len(), groups = registry.len(), "rendered all artifacts");
        Ok(files)
    }
}
