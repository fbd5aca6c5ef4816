//! Batch-install config loading.
//!
//! The on-disk shape is `{ packages: [ { name, version? } ] }`, accepted as
//! YAML or JSON keyed off the file extension.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// One package entry in a batch config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} {}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Top-level shape of a batch install file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageSet {
    #[serde(default)]
    pub packages: Vec<PackageSpec>,
}

/// Load a batch config, dispatching the parser on the file extension.
pub fn load(path: &Path) -> Result<PackageSet> {
    let shown = path.display().to_string();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    if !matches!(extension.as_str(), "yaml" | "yml" | "json") {
        return Err(Error::UnsupportedFormat(shown));
    }

    let content = fs::read_to_string(path).map_err(|err| Error::Config {
        path: shown.clone(),
        message: err.to_string(),
    })?;

    let parsed = if extension == "json" {
        serde_json::from_str::<PackageSet>(&content).map_err(|err| err.to_string())
    } else {
        serde_yaml::from_str::<PackageSet>(&content).map_err(|err| err.to_string())
    };
    let set = parsed.map_err(|message| Error::Config {
        path: shown.clone(),
        message,
    })?;

    // An empty name would otherwise reach the backend as a bare flag list.
    for (index, spec) in set.packages.iter().enumerate() {
        if spec.name.trim().is_empty() {
            return Err(Error::Config {
                path: shown,
                message: format!("package entry {} has an empty name", index + 1),
            });
        }
    }

    Ok(set)
}
