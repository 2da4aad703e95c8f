//! Style Property Generator
//!
//! Generates the C++ property classes of a style engine from one declarative
//! schema. The schema describes named values ("properties") organized in
//! nested, reusable groups:
//!
//! ```yaml
//! layout:
//!   padding: &size
//!     left: qreal
//!     right: qreal
//!   margins: *size
//! text:
//!   color: QColor
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! schema text ──compose──▶ Node tree ──resolve──▶ Registry ──render──▶ files
//!   (document)              anchors, aliases,     (resolver)  groups in     (codegen)
//!                           comments kept                     completion order
//! ```
//!
//! A group defined once and referenced by alias is one shared `Rc<Group>`.
//! All artifacts are rendered in memory before any output is touched.

pub mod codegen;
pub mod config;
pub mod document;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod schema;

pub use codegen::{CollectionContext, GeneratedFile, Generator, RenderContext};
pub use config::GeneratorConfig;
pub use error::{GeneratorError, Result};
pub use registry::Registry;
pub use resolver::Resolver;
pub use schema::{ExtraCode, Group, Property};

/// Read, compose and resolve the configured schema file
pub fn load_schema(config: &GeneratorConfig) -> Result<Registry> {
    let text = std::fs::read_to_string(config.schema_path())?;
    let document = document::compose(&text)?;
    config.resolver().resolve(&document, &config.schema.root_name)
}
