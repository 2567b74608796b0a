//! Build manifest loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use crate::error::{OpaLinkError, Result};

pub use schema::BuildManifest;

pub fn load_from_file(path: impl AsRef<Path>) -> Result<BuildManifest> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| OpaLinkError::InvalidConfig(format!("read {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<BuildManifest> {
    let cfg: BuildManifest = serde_yaml::from_str(s)
        .map_err(|e| OpaLinkError::InvalidConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
