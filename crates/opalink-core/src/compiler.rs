//! Policy compilation.
//!
//! Two paths lead here: the standalone build (source tree -> artifact) and the
//! single-module path used by the registry (module text -> prepared query).
//! Both bind the query by running it once with no input set, which surfaces
//! query syntax errors and unknown functions at compile time and leaves the
//! engine prepared for later clones. Input-dependent expressions are simply
//! undefined during that run.

use std::path::Path;

use regorus::{Engine, Value};

use crate::artifact::Artifact;
use crate::config::BuildManifest;
use crate::error::{OpaLinkError, Result};
use crate::eval::PreparedQuery;
use crate::filter::IgnoreSet;
use crate::loader::{self, SourceSet};

/// Compile `sources` with `query` as entry point into a standalone artifact.
pub fn compile_standalone(query: &str, sources: &SourceSet) -> Result<Artifact> {
    let mut engine = Engine::new();
    for (path, source) in sources.modules() {
        add_module(&mut engine, path, source)?;
    }
    add_data(&mut engine, sources.data())?;
    bind_query(&mut engine, query)?;

    let artifact = Artifact::encode(query, sources)?;
    tracing::debug!(
        query,
        modules = sources.module_count(),
        bytes = artifact.len(),
        "artifact compiled"
    );
    Ok(artifact)
}

/// Compile one named module together with `query`.
pub fn compile_module(query: &str, module_name: &str, module_source: &str) -> Result<PreparedQuery> {
    let mut engine = Engine::new();
    add_module(&mut engine, module_name, module_source)?;
    bind_query(&mut engine, query)?;
    Ok(PreparedQuery::new(query.to_string(), engine))
}

/// Prepare a previously built artifact for evaluation with its embedded query.
pub fn prepare_artifact(artifact: &Artifact) -> Result<PreparedQuery> {
    let doc = artifact.decode()?;
    let mut engine = Engine::new();
    for m in &doc.modules {
        add_module(&mut engine, &m.path, &m.source)?;
    }
    add_data(&mut engine, &doc.data)?;
    bind_query(&mut engine, &doc.query)?;
    Ok(PreparedQuery::new(doc.query, engine))
}

/// Load, filter, and compile in one step.
pub fn build<Q, D, B, I>(query: Q, data: &[D], bundles: &[B], ignore: &[I]) -> Result<Artifact>
where
    Q: AsRef<str>,
    D: AsRef<Path>,
    B: AsRef<Path>,
    I: AsRef<str>,
{
    let filter = IgnoreSet::new(ignore)?;
    let sources = loader::load(data, bundles, &filter)?;
    compile_standalone(query.as_ref(), &sources)
}

/// Build from a manifest; relative paths resolve against `base_dir`.
pub fn build_from_manifest(manifest: &BuildManifest, base_dir: &Path) -> Result<Artifact> {
    manifest.validate()?;
    let data: Vec<_> = manifest
        .data
        .iter()
        .map(|p| loader::resolve(base_dir, p))
        .collect();
    let bundles: Vec<_> = manifest
        .bundles
        .iter()
        .map(|p| loader::resolve(base_dir, p))
        .collect();
    build(&manifest.query, &data, &bundles, &manifest.ignore)
}

fn add_module(engine: &mut Engine, path: &str, source: &str) -> Result<()> {
    engine
        .add_policy(path.to_string(), source.to_string())
        .map(|_| ())
        .map_err(|e| OpaLinkError::Compile(e.to_string()))
}

fn add_data(engine: &mut Engine, data: &serde_json::Map<String, serde_json::Value>) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    let text = serde_json::to_string(data).map_err(|e| OpaLinkError::Compile(e.to_string()))?;
    let value = Value::from_json_str(&text).map_err(|e| OpaLinkError::Compile(e.to_string()))?;
    engine
        .add_data(value)
        .map_err(|e| OpaLinkError::Compile(e.to_string()))
}

fn bind_query(engine: &mut Engine, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(OpaLinkError::Compile("query must not be empty".into()));
    }
    engine
        .eval_query(query.to_string(), false)
        .map(|_| ())
        .map_err(|e| OpaLinkError::Compile(e.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn syntax_error_is_reported_verbatim() {
        let err = compile_module("data.example.allow", "bad.rego", "package example\nallow {{{")
            .unwrap_err();
        assert_eq!(err.code().as_str(), "COMPILE_ERROR");
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn empty_query_is_rejected() {
        let err = compile_module("  ", "m.rego", "package m").unwrap_err();
        assert_eq!(err.code().as_str(), "COMPILE_ERROR");
    }

    #[test]
    fn artifact_round_trips_into_a_prepared_query() {
        let mut set = SourceSet::new();
        set.add_module(
            "authz.rego",
            "package authz\nimport rego.v1\n\ndefault allow := false\n\nallow if input.user in data.admins\n",
        )
            .unwrap();
        set.merge_data(&[], serde_json::json!({"admins": ["alice"]}), Path::new("data.json"))
            .unwrap();

        let artifact = compile_standalone("data.authz.allow", &set).unwrap();
        let prepared = prepare_artifact(&artifact).unwrap();
        assert_eq!(prepared.query(), "data.authz.allow");
        assert!(prepared.eval_bool(r#"{"user": "alice"}"#).unwrap());
        assert!(!prepared.eval_bool(r#"{"user": "bob"}"#).unwrap());
    }

    #[test]
    fn policy_failing_only_on_empty_input_still_compiles() {
        let module = "package example
import rego.v1

allow if 10 / count(input) > 1
";
        let prepared = compile_module("data.example.allow", "example.rego", module).unwrap();
        assert!(prepared.eval_bool(r#"{"a": 1}"#).unwrap());
        let err = prepared.eval_bool("{}").unwrap_err();
        assert_eq!(err.code().as_str(), "EVALUATION_FAILURE");
    }

    #[test]
    fn malformed_query_is_still_rejected() {
        let err = compile_module("data.example.allow ==", "m.rego", "package example
").unwrap_err();
        assert_eq!(err.code().as_str(), "COMPILE_ERROR");
    }
}
