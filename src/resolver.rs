//! One-level dependency resolution through each family's native query tool.
//!
//! The resolver is a text parser over the backend's own dependency listing.
//! No transitive closure, no cycle detection, no version constraints. A
//! failed or empty query resolves to an empty list; the capture is kept so
//! callers can log what actually happened.

use crate::backend::BackendKind;
use crate::exec::{self, Capture};
use crate::ui;

const DEPENDS_MARKER: &str = "Depends:";

/// Outcome of a dependency query: the parsed list plus the raw capture for
/// diagnostics.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub dependencies: Vec<String>,
    pub query: Capture,
}

/// Resolve the direct dependencies of `package` with the bound backend's
/// native tool.
pub fn resolve(kind: BackendKind, package: &str) -> Resolution {
    let spec = kind.depends_command(package);
    let query = exec::capture(&spec);
    if !query.success() {
        ui::debug(
            "resolve.query",
            &format!("`{}` failed: {}", spec, query.failure_reason()),
        );
    }
    Resolution {
        dependencies: parse(kind, &query.stdout),
        query,
    }
}

/// Parse raw dependency-listing output for the given backend.
pub fn parse(kind: BackendKind, output: &str) -> Vec<String> {
    match kind {
        BackendKind::Apt => parse_apt_depends(output),
        // repoquery and pactree already print one entry per line.
        BackendKind::Dnf | BackendKind::Pacman => output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// apt-cache depends output: keep the part after the dependency marker,
/// first occurrence only. The substring match also covers PreDepends lines.
fn parse_apt_depends(output: &str) -> Vec<String> {
    let mut dependencies: Vec<String> = Vec::new();
    for line in output.lines() {
        if let Some(idx) = line.find(DEPENDS_MARKER) {
            let dep = line[idx + DEPENDS_MARKER.len()..].trim();
            if !dep.is_empty() && !dependencies.iter().any(|seen| seen == dep) {
                dependencies.push(dep.to_string());
            }
        }
    }
    dependencies
}
