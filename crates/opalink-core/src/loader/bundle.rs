//! Packaged bundle loading.
//!
//! A bundle is a self-contained directory: an optional `.manifest`, any number
//! of `.rego` modules, and data documents named `data.json` / `data.yaml` /
//! `data.yml` placed by their directory. Bundles are curated upstream, so the
//! ignore filter is not applied.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{OpaLinkError, Result};
use crate::loader::{dir_prefix, module_key, module_package, parse_data, DataFormat, SourceSet};

const MANIFEST_FILE: &str = ".manifest";
const SIGNATURES_FILE: &str = ".signatures.json";

/// Bundle `.manifest` contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    #[serde(default)]
    pub revision: String,
    /// Path prefixes (slash separated) this bundle owns. `None` means everything.
    #[serde(default)]
    pub roots: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl BundleManifest {
    /// Whether `path` (slash separated, relative to `data`) lies under a declared root.
    pub fn owns(&self, path: &str) -> bool {
        let Some(roots) = &self.roots else {
            return true;
        };
        roots.iter().any(|root| {
            let root = root.trim_matches('/');
            root.is_empty()
                || path == root
                || path
                    .strip_prefix(root)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Load one bundle directory into `out`.
pub(crate) fn load_bundle(dir: &Path, out: &mut SourceSet) -> Result<()> {
    let manifest = read_manifest(dir)?;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| OpaLinkError::Load(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();

        if name == MANIFEST_FILE || name == SIGNATURES_FILE {
            continue;
        }

        if name.ends_with(".rego") {
            let source = fs::read_to_string(path)
                .map_err(|e| OpaLinkError::Load(format!("{}: {e}", path.display())))?;
            let package = module_package(path, &source)?;
            if !manifest.owns(&package.replace('.', "/")) {
                return Err(OpaLinkError::Load(format!(
                    "{}: package {package} is outside the bundle roots",
                    path.display()
                )));
            }
            out.add_module(module_key(dir, path), source)?;
            continue;
        }

        let format = match &*name {
            "data.json" => DataFormat::Json,
            "data.yaml" | "data.yml" => DataFormat::Yaml,
            _ => {
                tracing::trace!(path = %path.display(), "bundle file ignored");
                continue;
            }
        };

        let prefix = dir_prefix(dir, path);
        let doc = parse_data(path, format)?;
        check_data_roots(&manifest, &prefix, &doc, path)?;
        out.merge_data(&prefix, doc, path)?;
    }

    tracing::debug!(bundle = %dir.display(), revision = %manifest.revision, "bundle loaded");
    out.push_bundle(manifest);
    Ok(())
}

fn read_manifest(dir: &Path) -> Result<BundleManifest> {
    if !dir.is_dir() {
        return Err(OpaLinkError::Load(format!(
            "{}: bundle path is not a directory",
            dir.display()
        )));
    }
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(BundleManifest::default());
    }
    let s = fs::read_to_string(&path)
        .map_err(|e| OpaLinkError::Load(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&s)
        .map_err(|e| OpaLinkError::Load(format!("{}: invalid manifest: {e}", path.display())))
}

/// Every top-level key a data document contributes must lie under a root.
fn check_data_roots(
    manifest: &BundleManifest,
    prefix: &[String],
    doc: &serde_json::Value,
    origin: &Path,
) -> Result<()> {
    if manifest.roots.is_none() {
        return Ok(());
    }
    let base = prefix.join("/");
    let leaves: Vec<String> = match doc.as_object() {
        Some(obj) => obj
            .keys()
            .map(|k| if base.is_empty() { k.clone() } else { format!("{base}/{k}") })
            .collect(),
        _ => vec![base],
    };
    for leaf in leaves {
        if !manifest.owns(&leaf) {
            return Err(OpaLinkError::Load(format!(
                "{}: data path {leaf} is outside the bundle roots",
                origin.display()
            )));
        }
    }
    Ok(())
}
