//! Output Layout
//!
//! Where each artifact goes, writing a full render to disk, and comparing a
//! render against what is already there.

use serde::Serialize;
use similar::TextDiff;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::GeneratedFile;
use crate::config::GeneratorConfig;
use crate::error::Result;

/// File-name suffix of the UI-binding classes
pub const QUICK_FILE_SUFFIX: &str = "Group";

// =============================================================================
// Artifacts
// =============================================================================

/// Whether an artifact is rendered once per group or once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactScope {
    Group,
    Collection,
}

/// Output directory an artifact is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputDir {
    Source,
    Tests,
    Quick,
    Stylesheet,
}

/// Build target named by a collection artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildTarget {
    Core,
    Quick,
}

/// One entry of the output plan
#[derive(Debug, Clone, Copy)]
pub struct Artifact {
    /// Template name, also the artifact identifier
    pub template: &'static str,
    pub scope: ArtifactScope,
    pub dir: OutputDir,
    /// File name; in group artifacts `{}` stands for the qualified type name
    pub file_name: &'static str,
    pub target: BuildTarget,
}

const fn group(template: &'static str, dir: OutputDir, file_name: &'static str) -> Artifact {
    Artifact {
        template,
        scope: ArtifactScope::Group,
        dir,
        file_name,
        target: BuildTarget::Core,
    }
}

const fn collection(
    template: &'static str,
    dir: OutputDir,
    file_name: &'static str,
    target: BuildTarget,
) -> Artifact {
    Artifact {
        template,
        scope: ArtifactScope::Collection,
        dir,
        file_name,
        target,
    }
}

/// The output plan
pub const ARTIFACTS: &[Artifact] = &[
    group("property.h.j2", OutputDir::Source, "{}.h"),
    group("property.cpp.j2", OutputDir::Source, "{}.cpp"),
    group("autotest.cpp.j2", OutputDir::Tests, "Test{}.cpp"),
    group("qml_group.h.j2", OutputDir::Quick, "{}Group.h"),
    group("qml_group.cpp.j2", OutputDir::Quick, "{}Group.cpp"),
    collection("formatter.h.j2", OutputDir::Source, "Formatter.h", BuildTarget::Core),
    collection("CreateTestInstances.h.j2", OutputDir::Tests, "CreateTestInstances.h", BuildTarget::Core),
    collection("CMakeLists.txt.j2", OutputDir::Source, "CMakeLists.txt", BuildTarget::Core),
    collection("CMakeLists.tests.txt.j2", OutputDir::Tests, "CMakeLists.txt", BuildTarget::Core),
    collection("CMakeLists.txt.j2", OutputDir::Quick, "CMakeLists.txt", BuildTarget::Quick),
    // File name comes from the configuration
    collection("properties.css.j2", OutputDir::Stylesheet, "", BuildTarget::Core),
];

// =============================================================================
// OutputLayout
// =============================================================================

/// Absolute output paths
#[derive(Debug, Clone)]
pub struct OutputLayout {
    source_dir: PathBuf,
    tests_dir: PathBuf,
    quick_dir: PathBuf,
    stylesheet_dir: PathBuf,
    stylesheet_file: String,
}

impl OutputLayout {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        let root = config.output_root();
        Self {
            source_dir: root.join(&config.output.source_dir),
            tests_dir: root.join(&config.output.tests_dir),
            quick_dir: root.join(&config.output.quick_dir),
            stylesheet_dir: root.join(&config.output.stylesheet_dir),
            stylesheet_file: config.output.stylesheet_file.clone(),
        }
    }

    pub fn dir(&self, dir: OutputDir) -> &Path {
        match dir {
            OutputDir::Source => &self.source_dir,
            OutputDir::Tests => &self.tests_dir,
            OutputDir::Quick => &self.quick_dir,
            OutputDir::Stylesheet => &self.stylesheet_dir,
        }
    }

    /// Path of a per-group artifact
    pub fn group_file(&self, artifact: &Artifact, type_name: &str) -> PathBuf {
        self.dir(artifact.dir)
            .join(artifact.file_name.replace("{}", type_name))
    }

    /// Path of a collection artifact
    pub fn collection_file(&self, artifact: &Artifact) -> PathBuf {
        match artifact.dir {
            OutputDir::Stylesheet => self.stylesheet_path(),
            dir => self.dir(dir).join(artifact.file_name),
        }
    }

    pub fn stylesheet_path(&self) -> PathBuf {
        self.stylesheet_dir.join(&self.stylesheet_file)
    }

    /// Directories owned entirely by the generator
    pub fn generated_dirs(&self) -> [&Path; 3] {
        [&self.source_dir, &self.tests_dir, &self.quick_dir]
    }

    /// Replace the generated output with `files`
    ///
    /// The generated directories are removed and recreated, so files no longer
    /// produced disappear. The stylesheet directory is shared with hand-written
    /// files; only the generated stylesheet is removed from it.
    pub fn write(&self, files: &[GeneratedFile]) -> Result<()> {
        for dir in self.generated_dirs() {
            remove_if_exists(dir, |p| fs::remove_dir_all(p))?;
        }
        remove_if_exists(&self.stylesheet_path(), |p| fs::remove_file(p))?;

        for dir in self.generated_dirs() {
            fs::create_dir_all(dir)?;
        }
        fs::create_dir_all(&self.stylesheet_dir)?;

        for file in files {
            if let Some(parent) = file.path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&file.path, &file.contents)?;
        }

        info!(files = files.len(), "wrote generated files");
        Ok(())
    }

    /// Compare `files` against the output on disk
    pub fn check(&self, files: &[GeneratedFile]) -> Result<DriftReport> {
        let mut report = DriftReport::default();
        let planned: HashSet<&Path> = files.iter().map(|f| f.path.as_path()).collect();

        for file in files {
            match fs::read_to_string(&file.path) {
                Ok(existing) if existing == file.contents => {}
                Ok(existing) => {
                    let label = file.path.display().to_string();
                    let diff = TextDiff::from_lines(&existing, &file.contents)
                        .unified_diff()
                        .header(&label, &label)
                        .to_string();
                    report.changed.push(ChangedFile {
                        path: file.path.clone(),
                        diff,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => report.missing.push(file.path.clone()),
                Err(e) => return Err(e.into()),
            }
        }

        for dir in self.generated_dirs() {
            if !dir.exists() {
                continue;
            }
            for entry in WalkDir::new(dir).sort_by_file_name() {
                let entry = entry.map_err(io::Error::from)?;
                if entry.file_type().is_file() && !planned.contains(entry.path()) {
                    report.stale.push(entry.path().to_path_buf());
                }
            }
        }

        if !report.is_clean() {
            warn!(
                changed = report.changed.len(),
                missing = report.missing.len(),
                stale = report.stale.len(),
                "generated output is out of date"
            );
        }
        Ok(report)
    }
}

fn remove_if_exists(path: &Path, remove: fn(&Path) -> io::Result<()>) -> Result<()> {
    match remove(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

// =============================================================================
// Drift
// =============================================================================

/// A file whose contents differ from a fresh render
#[derive(Debug, Clone, Serialize)]
pub struct ChangedFile {
    pub path: PathBuf,
    /// Unified diff from the file on disk to the fresh render
    pub diff: String,
}

/// Differences between a fresh render and the output on disk
#[derive(Debug, Clone, Default, Serialize)]
pub struct DriftReport {
    pub changed: Vec<ChangedFile>,
    /// Planned files not on disk
    pub missing: Vec<PathBuf>,
    /// Files in generated directories that are no longer produced
    pub stale: Vec<PathBuf>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.changed.is_empty() && self.missing.is_empty() && self.stale.is_empty()
    }
}
