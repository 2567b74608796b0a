//! Source tree loading.
//!
//! Walks data paths (filtered) and bundle directories (unfiltered) and
//! assembles a [`SourceSet`]. Loading is all-or-nothing: the set is built in
//! scratch space and only handed back when every file loaded cleanly.

pub mod bundle;
mod source_set;

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{OpaLinkError, Result};
use crate::filter::PathFilter;

pub use bundle::BundleManifest;
pub use source_set::SourceSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DataFormat {
    Json,
    Yaml,
}

/// Load policy modules and data documents.
///
/// - `data_paths`: files or directories, walked recursively; `filter` is
///   consulted for every visited entry and excluded directories are pruned.
/// - `bundle_paths`: bundle directories, loaded without filtering.
pub fn load<P, B, F>(data_paths: &[P], bundle_paths: &[B], filter: &F) -> Result<SourceSet>
where
    P: AsRef<Path>,
    B: AsRef<Path>,
    F: PathFilter + ?Sized,
{
    let mut set = SourceSet::new();

    for root in data_paths {
        load_tree(root.as_ref(), filter, &mut set)?;
    }

    for dir in bundle_paths {
        bundle::load_bundle(dir.as_ref(), &mut set)?;
    }

    tracing::debug!(
        modules = set.module_count(),
        bundles = set.bundles().len(),
        "sources loaded"
    );
    Ok(set)
}

fn load_tree<F>(root: &Path, filter: &F, out: &mut SourceSet) -> Result<()>
where
    F: PathFilter + ?Sized,
{
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let skip = filter.excluded(e.path(), e.file_type().is_dir(), e.depth());
            if skip {
                tracing::trace!(path = %e.path().display(), "excluded by ignore pattern");
            }
            !skip
        });

    for entry in walker {
        let entry = entry.map_err(|e| OpaLinkError::Load(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();

        match classify(path) {
            Some(FileKind::Module) => {
                let source = fs::read_to_string(path)
                    .map_err(|e| OpaLinkError::Load(format!("{}: {e}", path.display())))?;
                module_package(path, &source)?;
                out.add_module(module_key(root, path), source)?;
            }
            Some(FileKind::Data(format)) => {
                let prefix = dir_prefix(root, path);
                let doc = parse_data(path, format)?;
                out.merge_data(&prefix, doc, path)?;
            }
            None => continue,
        }
        tracing::debug!(path = %path.display(), "loaded");
    }
    Ok(())
}

enum FileKind {
    Module,
    Data(DataFormat),
}

fn classify(path: &Path) -> Option<FileKind> {
    match path.extension()?.to_str()? {
        "rego" => Some(FileKind::Module),
        "json" => Some(FileKind::Data(DataFormat::Json)),
        "yaml" | "yml" => Some(FileKind::Data(DataFormat::Yaml)),
        _ => None,
    }
}

/// Slash-separated path of `path` below `root`, so artifacts do not depend on
/// where the tree is checked out. A file given directly as root keys by its name.
pub(crate) fn module_key(root: &Path, path: &Path) -> String {
    let rel = match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel,
        _ => path.file_name().map(Path::new).unwrap_or(path),
    };
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Directory components of `path` below `root`, used as the data key prefix.
pub(crate) fn dir_prefix(root: &Path, path: &Path) -> Vec<String> {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.parent()
        .map(|dir| {
            dir.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn parse_data(path: &Path, format: DataFormat) -> Result<serde_json::Value> {
    let s = fs::read_to_string(path)
        .map_err(|e| OpaLinkError::Load(format!("{}: {e}", path.display())))?;
    match format {
        DataFormat::Json => serde_json::from_str(&s)
            .map_err(|e| OpaLinkError::Load(format!("{}: {e}", path.display()))),
        DataFormat::Yaml => serde_yaml::from_str(&s)
            .map_err(|e| OpaLinkError::Load(format!("{}: {e}", path.display()))),
    }
}

/// Parse `source` and return its package path without the `data.` prefix.
pub(crate) fn module_package(path: &Path, source: &str) -> Result<String> {
    let mut engine = regorus::Engine::new();
    let package = engine
        .add_policy(path.display().to_string(), source.to_string())
        .map_err(|e| OpaLinkError::Load(e.to_string()))?;
    Ok(package.strip_prefix("data.").unwrap_or(&package).to_string())
}

/// Resolve `p` against `base` unless it is already absolute.
pub(crate) fn resolve(base: &Path, p: &str) -> PathBuf {
    let p = Path::new(p);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
