use serde::Deserialize;

use crate::error::{OpaLinkError, Result};

/// Declarative description of one standalone build.
///
/// ```yaml
/// version: 1
/// query: data.authz.allow
/// data: ["policies", "data/users.json"]
/// bundles: ["vendor/base-bundle"]
/// ignore: ["*_test.rego", ".*"]
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildManifest {
    pub version: u32,

    pub query: String,

    #[serde(default)]
    pub data: Vec<String>,

    #[serde(default)]
    pub bundles: Vec<String>,

    #[serde(default)]
    pub ignore: Vec<String>,
}

impl BuildManifest {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(OpaLinkError::UnsupportedVersion(self.version));
        }
        if self.query.trim().is_empty() {
            return Err(OpaLinkError::InvalidConfig("query must not be empty".into()));
        }
        if self.data.is_empty() && self.bundles.is_empty() {
            return Err(OpaLinkError::InvalidConfig(
                "at least one of data or bundles must be given".into(),
            ));
        }
        if self.ignore.iter().any(|p| p.is_empty()) {
            return Err(OpaLinkError::InvalidConfig("ignore patterns must not be empty".into()));
        }
        Ok(())
    }
}
