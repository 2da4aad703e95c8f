//! Template rendering
//!
//! A `minijinja` environment holding the artifact templates. The built-in
//! templates are compiled into the binary; a template directory can override
//! any of them by file name.

use include_dir::{include_dir, Dir};
use indexmap::IndexMap;
use minijinja::Environment;
use serde::Serialize;
use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

use super::names;
use super::{CollectionContext, RenderContext};
use crate::error::Result;
use crate::schema::ExtraCode;

static TEMPLATES: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Renders artifacts from their contexts
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    /// Create a renderer, optionally overriding built-in templates from `template_dir`
    pub fn new(template_dir: Option<&Path>) -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        register_filters(&mut env);

        for file in TEMPLATES.files() {
            let (Some(name), Some(source)) = (file.path().to_str(), file.contents_utf8()) else {
                continue;
            };
            if template_dir.is_some_and(|dir| dir.join(name).is_file()) {
                debug!(template = name, "using template override");
                continue;
            }
            env.add_template(name, source)?;
        }

        if let Some(dir) = template_dir {
            env.set_loader(minijinja::path_loader(dir));
        }

        Ok(Self { env })
    }

    /// Render a per-group artifact
    ///
    /// Extra-code fragments may use template syntax; they are rendered against
    /// the same context before the artifact template sees them.
    pub fn render_group(&self, template: &str, mut context: RenderContext<'_>) -> Result<String> {
        let rendered = self.render_extra_code(&context.extra_code, &context)?;
        context.extra_code = Cow::Owned(rendered);
        self.render(template, &context)
    }

    /// Render a collection artifact
    pub fn render_collection(&self, template: &str, context: &CollectionContext<'_>) -> Result<String> {
        self.render(template, context)
    }

    fn render<S: Serialize>(&self, template: &str, context: &S) -> Result<String> {
        let template = self.env.get_template(template)?;
        Ok(template.render(context)?)
    }

    fn render_extra_code(&self, code: &ExtraCode, context: &RenderContext<'_>) -> Result<ExtraCode> {
        Ok(match code {
            ExtraCode::Fragment(fragment) if fragment.is_empty() => code.clone(),
            ExtraCode::Fragment(fragment) => ExtraCode::Fragment(self.env.render_str(fragment, context)?),
            ExtraCode::Hooks(hooks) => {
                let mut rendered = IndexMap::with_capacity(hooks.len());
                for (hook, fragment) in hooks {
                    rendered.insert(hook.clone(), self.env.render_str(fragment, context)?);
                }
                ExtraCode::Hooks(rendered)
            }
        })
    }
}

fn register_filters(env: &mut Environment<'static>) {
    env.add_filter("ucfirst", |value: String| names::ucfirst(&value));
    env.add_filter("lcfirst", |value: String| names::lcfirst(&value));
    env.add_filter("css_name", |value: String| names::display_name(&value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ARTIFACTS;
    use crate::document::compose;
    use crate::error::GeneratorError;
    use crate::registry::Registry;
    use crate::resolver::Resolver;

    fn registry(text: &str) -> Registry {
        Resolver::default().resolve(&compose(text).unwrap(), "style").unwrap()
    }

    #[test]
    fn test_builtin_templates_present() {
        let renderer = Renderer::new(None).unwrap();
        for artifact in ARTIFACTS {
            assert!(
                renderer.env.get_template(artifact.template).is_ok(),
                "missing template {}",
                artifact.template
            );
        }
    }

    #[test]
    fn test_filters() {
        let renderer = Renderer::new(None).unwrap();
        let out = renderer
            .env
            .render_str(
                "{{ 'topLeft' | ucfirst }} {{ 'Color' | lcfirst }} {{ 'borderWidth2' | css_name }}",
                minijinja::context! {},
            )
            .unwrap();
        assert_eq!(out, "TopLeft color border-width-2");
    }

    #[test]
    fn test_extra_code_fragment_is_rendered_with_context() {
        let registry = registry(
            "\
width: qreal
_extra_code:
  property.h.j2: \"// {{ type_name }} has {{ properties | length }} properties\"
",
        );
        let renderer = Renderer::new(None).unwrap();
        let context = RenderContext::project(registry.root().unwrap(), "property.h.j2");
        let out = renderer.render_group("property.h.j2", context).unwrap();
        assert!(out.contains("// StyleProperty has 1 properties"));
    }

    #[test]
    fn test_template_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("property.h.j2"),
            "override {{ type_name }}{% for p in properties %} {{ p.name }}{% endfor %}",
        )
        .unwrap();

        let registry = registry("width: qreal\nheight: qreal\n");
        let renderer = Renderer::new(Some(dir.path())).unwrap();
        let group = registry.root().unwrap();

        let out = renderer
            .render_group("property.h.j2", RenderContext::project(group, "property.h.j2"))
            .unwrap();
        assert_eq!(out, "override StyleProperty width height");

        let cpp = renderer
            .render_group("property.cpp.j2", RenderContext::project(group, "property.cpp.j2"))
            .unwrap();
        assert!(cpp.contains("StyleProperty::StyleProperty()"));
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let registry = registry("width: qreal\n");
        let renderer = Renderer::new(None).unwrap();
        let context = RenderContext::project(registry.root().unwrap(), "nope.j2");
        let err = renderer.render_group("nope.j2", context).unwrap_err();
        assert!(matches!(err, GeneratorError::Template(_)));
    }
}
