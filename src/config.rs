//! Configuration management for the property generator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (propgen.toml)
//! - Environment variables (PROPGEN__*)
//!
//! ## Example config file (propgen.toml):
//! ```toml
//! [schema]
//! path = "tools/propertygenerator/properties.yml"
//! root_name = "style"
//!
//! [naming]
//! type_suffix = "Property"
//!
//! [output]
//! root = "."
//! source_dir = "src/properties"
//!
//! [[includes.rules]]
//! pattern = "Qt::"
//! bucket = "system"
//! include = "QtGlobal"
//!
//! [targets]
//! core = "Union"
//! quick = "UnionQuickImpl"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codegen::classify::{
    default_rules, IncludeClassifier, IncludeRule, DECLARATION_ARTIFACT, DEFAULT_HEADER_EXTENSION,
};
use crate::codegen::names::DEFAULT_TYPE_SUFFIX;
use crate::resolver::{Resolver, DEFAULT_LICENSE_PREFIX};

/// Main configuration for the generator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Schema input settings
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Naming settings
    #[serde(default)]
    pub naming: NamingConfig,

    /// Include classification
    #[serde(default)]
    pub includes: IncludesConfig,

    /// Output layout
    #[serde(default)]
    pub output: OutputConfig,

    /// Template settings
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// Build target names
    #[serde(default)]
    pub targets: TargetsConfig,
}

/// Schema input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Schema file, relative to the output root unless absolute
    #[serde(default = "default_schema_path")]
    pub path: PathBuf,

    /// Raw name given to the document's root group
    #[serde(default = "default_root_name")]
    pub root_name: String,

    /// Comment lines starting with this are left out of documentation
    #[serde(default = "default_license_prefix")]
    pub license_prefix: String,
}

/// Naming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Suffix of every qualified type name
    #[serde(default = "default_type_suffix")]
    pub type_suffix: String,

    /// Extension of local headers derived from type names
    #[serde(default = "default_header_extension")]
    pub header_extension: String,
}

/// Include classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncludesConfig {
    /// Artifact classified includes are recorded under
    #[serde(default = "default_declaration_artifact")]
    pub artifact: String,

    /// Ordered rules, first match wins
    #[serde(default = "default_rules")]
    pub rules: Vec<IncludeRule>,
}

/// Output layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Project root all other output paths are relative to
    #[serde(default = "default_output_root")]
    pub root: PathBuf,

    /// Data-class sources, formatter and core build manifest
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Unit tests and their build manifest
    #[serde(default = "default_tests_dir")]
    pub tests_dir: PathBuf,

    /// UI-binding classes and their build manifest
    #[serde(default = "default_quick_dir")]
    pub quick_dir: PathBuf,

    /// Directory holding the stylesheet defaults
    #[serde(default = "default_stylesheet_dir")]
    pub stylesheet_dir: PathBuf,

    /// Generated stylesheet file name
    #[serde(default = "default_stylesheet_file")]
    pub stylesheet_file: String,
}

/// Template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory with templates overriding the built-in ones
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Build target names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetsConfig {
    /// Target built from the source directory
    #[serde(default = "default_core_target")]
    pub core: String,

    /// Target built from the quick directory
    #[serde(default = "default_quick_target")]
    pub quick: String,
}

// Default value functions
fn default_schema_path() -> PathBuf {
    PathBuf::from("tools/propertygenerator/properties.yml")
}

fn default_root_name() -> String {
    "style".to_string()
}

fn default_license_prefix() -> String {
    DEFAULT_LICENSE_PREFIX.to_string()
}

fn default_type_suffix() -> String {
    DEFAULT_TYPE_SUFFIX.to_string()
}

fn default_header_extension() -> String {
    DEFAULT_HEADER_EXTENSION.to_string()
}

fn default_declaration_artifact() -> String {
    DECLARATION_ARTIFACT.to_string()
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src/properties")
}

fn default_tests_dir() -> PathBuf {
    PathBuf::from("autotests/properties")
}

fn default_quick_dir() -> PathBuf {
    PathBuf::from("src/output/qtquick/plugin/properties")
}

fn default_stylesheet_dir() -> PathBuf {
    PathBuf::from("src/input/css/defaults")
}

fn default_stylesheet_file() -> String {
    "generated-properties.css".to_string()
}

fn default_core_target() -> String {
    "Union".to_string()
}

fn default_quick_target() -> String {
    "UnionQuickImpl".to_string()
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: default_schema_path(),
            root_name: default_root_name(),
            license_prefix: default_license_prefix(),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            type_suffix: default_type_suffix(),
            header_extension: default_header_extension(),
        }
    }
}

impl Default for IncludesConfig {
    fn default() -> Self {
        Self {
            artifact: default_declaration_artifact(),
            rules: default_rules(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
            source_dir: default_source_dir(),
            tests_dir: default_tests_dir(),
            quick_dir: default_quick_dir(),
            stylesheet_dir: default_stylesheet_dir(),
            stylesheet_file: default_stylesheet_file(),
        }
    }
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            core: default_core_target(),
            quick: default_quick_target(),
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["propgen.toml", ".propgen.toml", "config/propgen.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("org", "kde", "propgen") {
            let xdg_config = config_dir.config_dir().join("propgen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (PROPGEN__SECTION__KEY)
        builder = builder.add_source(
            Environment::with_prefix("PROPGEN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get the output root (resolves relative paths)
    pub fn output_root(&self) -> PathBuf {
        if self.output.root.is_absolute() {
            self.output.root.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.output.root)
        }
    }

    /// Get the schema path (relative paths are taken from the output root)
    pub fn schema_path(&self) -> PathBuf {
        resolve_under(&self.output_root(), &self.schema.path)
    }

    /// Get the template override directory, if any
    pub fn templates_dir(&self) -> Option<PathBuf> {
        self.templates
            .dir
            .as_ref()
            .map(|dir| resolve_under(&self.output_root(), dir))
    }

    /// Include classifier built from the naming and include settings
    pub fn classifier(&self) -> IncludeClassifier {
        IncludeClassifier::new(
            self.includes.rules.clone(),
            &self.naming.header_extension,
            &self.includes.artifact,
        )
    }

    /// Resolver built from this configuration
    pub fn resolver(&self) -> Resolver {
        Resolver::from_config(self)
    }
}

fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
