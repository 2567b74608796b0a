use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use crate::error::{OpaLinkError, Result};
use crate::loader::bundle::BundleManifest;

/// In-memory union of policy modules and data documents for one compilation.
///
/// Modules are keyed by their path below the loaded root, so iteration order (and therefore
/// artifact layout) is stable across runs.
#[derive(Debug, Default, Clone)]
pub struct SourceSet {
    modules: BTreeMap<String, String>,
    data: Map<String, JsonValue>,
    bundles: Vec<BundleManifest>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy module. The same path may not be provided twice.
    pub fn add_module(&mut self, path: impl Into<String>, source: impl Into<String>) -> Result<()> {
        let path = path.into();
        if self.modules.contains_key(&path) {
            return Err(OpaLinkError::Load(format!("duplicate module: {path}")));
        }
        self.modules.insert(path, source.into());
        Ok(())
    }

    /// Merge `doc` into the data tree under `prefix` (`["a", "b"]` => `data.a.b`).
    pub fn merge_data(&mut self, prefix: &[String], doc: JsonValue, origin: &Path) -> Result<()> {
        let wrapped = prefix
            .iter()
            .rev()
            .fold(doc, |acc, key| {
                let mut m = Map::new();
                m.insert(key.clone(), acc);
                JsonValue::Object(m)
            });

        let JsonValue::Object(incoming) = wrapped else {
            return Err(OpaLinkError::Load(format!(
                "{}: data document at the root must be an object",
                origin.display()
            )));
        };

        let mut path = Vec::new();
        merge_objects(&mut self.data, incoming, &mut path).map_err(|conflict| {
            OpaLinkError::Load(format!(
                "{}: merge error: conflicting value at data.{}",
                origin.display(),
                conflict.join(".")
            ))
        })
    }

    pub(crate) fn push_bundle(&mut self, manifest: BundleManifest) {
        self.bundles.push(manifest);
    }

    pub fn modules(&self) -> impl Iterator<Item = (&str, &str)> {
        self.modules.iter().map(|(p, s)| (p.as_str(), s.as_str()))
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn data(&self) -> &Map<String, JsonValue> {
        &self.data
    }

    pub fn bundles(&self) -> &[BundleManifest] {
        &self.bundles
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.data.is_empty()
    }
}

/// Recursive object merge. Returns the conflicting key path on failure.
fn merge_objects(
    into: &mut Map<String, JsonValue>,
    from: Map<String, JsonValue>,
    path: &mut Vec<String>,
) -> std::result::Result<(), Vec<String>> {
    for (key, value) in from {
        path.push(key.clone());
        match into.get_mut(&key) {
            None => {
                into.insert(key, value);
            }
            Some(JsonValue::Object(existing)) => match value {
                JsonValue::Object(incoming) => merge_objects(existing, incoming, path)?,
                _ => return Err(path.clone()),
            },
            Some(_) => return Err(path.clone()),
        }
        path.pop();
    }
    Ok(())
}
