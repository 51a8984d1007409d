//! Compile manifests
//!
//! A manifest is a TOML file listing templates to compile:
//!
//! ```toml
//! indent_unit = "\t"
//!
//! [[compile]]
//! template = "templates/config.json.tmpl"
//! resources = "resources"
//! output = "build/config.json"
//! ```
//!
//! Relative paths are taken relative to the directory holding the manifest.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::compiler::TemplateSpec;

/// Errors that can occur when loading a manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse manifest TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("manifest does not list any [[compile]] jobs")]
    Empty,
}

/// A set of compile jobs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Default indentation unit for every job
    pub indent_unit: Option<String>,
    #[serde(default, rename = "compile")]
    pub jobs: Vec<Job>,
}

/// One template to compile
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Job {
    pub template: PathBuf,
    pub resources: PathBuf,
    pub output: PathBuf,
    /// Overrides the manifest-wide unit
    pub indent_unit: Option<String>,
}

impl Manifest {
    /// Load manifest from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load manifest from TOML string
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content)?;
        if manifest.jobs.is_empty() {
            return Err(ManifestError::Empty);
        }
        Ok(manifest)
    }

    /// Resolve every job against `base` into a spec and its destination
    pub fn specs(&self, base: &Path) -> Vec<(TemplateSpec, PathBuf)> {
        self.jobs
            .iter()
            .map(|job| {
                let mut spec = TemplateSpec::new(base.join(&job.template), base.join(&job.resources));
                if let Some(unit) = job.indent_unit.as_ref().or(self.indent_unit.as_ref()) {
                    spec = spec.with_indent_unit(unit.clone());
                }
                (spec, base.join(&job.output))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
indent_unit = "  "

[[compile]]
template = "t/one.tmpl"
resources = "res"
output = "out/one.json"

[[compile]]
template = "/abs/two.tmpl"
resources = "res"
output = "out/two.json"
indent_unit = "\t"
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::from_str(MANIFEST).unwrap();
        assert_eq!(manifest.indent_unit.as_deref(), Some("  "));
        assert_eq!(manifest.jobs.len(), 2);
        assert_eq!(manifest.jobs[0].template, PathBuf::from("t/one.tmpl"));
        assert_eq!(manifest.jobs[1].indent_unit.as_deref(), Some("\t"));
    }

    #[test]
    fn test_specs_resolve_against_base() {
        let manifest = Manifest::from_str(MANIFEST).unwrap();
        let specs = manifest.specs(Path::new("/project"));

        let (one, one_out) = &specs[0];
        assert_eq!(one.template_path, PathBuf::from("/project/t/one.tmpl"));
        assert_eq!(one.resource_root, PathBuf::from("/project/res"));
        assert_eq!(one.indent_unit, "  ");
        assert_eq!(one_out, &PathBuf::from("/project/out/one.json"));

        let (two, _) = &specs[1];
        assert_eq!(two.template_path, PathBuf::from("/abs/two.tmpl"));
        assert_eq!(two.indent_unit, "\t");
    }

    #[test]
    fn test_default_indent_unit() {
        let manifest = Manifest::from_str(
            r#"
[[compile]]
template = "a"
resources = "b"
output = "c"
"#,
        )
        .unwrap();
        let specs = manifest.specs(Path::new("."));
        assert_eq!(specs[0].0.indent_unit, "\t");
    }

    #[test]
    fn test_empty_manifest() {
        assert!(matches!(Manifest::from_str(""), Err(ManifestError::Empty)));
    }

    #[test]
    fn test_unknown_field() {
        let result = Manifest::from_str(
            r#"
[[compile]]
template = "a"
resources = "b"
output = "c"
colour = "red"
"#,
        );
        assert!(matches!(result, Err(ManifestError::ParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Manifest::from_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ManifestError::IoError(_))));
    }
}
