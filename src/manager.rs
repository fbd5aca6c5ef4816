//! Uniform facade over the distribution's native package manager.
//!
//! Exactly one backend is bound at construction and never re-resolved; if
//! the environment changes mid-process the facade's view is stale by
//! design. Mutating operations pass the privilege gate before anything
//! else happens; read-only operations pass straight through.

use std::path::Path;

use crate::backend::BackendKind;
use crate::config;
use crate::distro::Family;
use crate::error::{Error, Result};
use crate::exec::Capture;
use crate::privilege;
use crate::resolver::{self, Resolution};
use crate::transaction::PackageOps;
use crate::ui::prelude::*;

#[derive(Debug, Clone, Copy)]
pub struct PackageManager {
    backend: BackendKind,
}

impl PackageManager {
    /// Detect the host distribution and bind the matching backend.
    pub fn new() -> Result<Self> {
        Self::for_family(Family::detect())
    }

    /// Map a family to its backend. Gentoo is detected but has no backend.
    pub fn for_family(family: Family) -> Result<Self> {
        let backend = match family {
            Family::DebianLike => BackendKind::Apt,
            Family::RedhatLike => BackendKind::Dnf,
            Family::ArchLike => BackendKind::Pacman,
            Family::GentooLike | Family::Unknown => {
                return Err(Error::UnsupportedDistribution(family.to_string()));
            }
        };
        Ok(Self { backend })
    }

    /// Bypass detection; used where the backend is already known.
    pub fn with_backend(backend: BackendKind) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn install(&self, name: &str, version: Option<&str>) -> Result<()> {
        privilege::require_root_or_exit("install");
        self.backend.install(name, version)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        privilege::require_root_or_exit("remove");
        self.backend.remove(name)
    }

    pub fn update(&self) -> Result<()> {
        privilege::require_root_or_exit("update");
        self.backend.update()
    }

    pub fn upgrade(&self) -> Result<()> {
        privilege::require_root_or_exit("upgrade");
        self.backend.upgrade()
    }

    pub fn search(&self, term: &str) -> Capture {
        self.backend.search(term)
    }

    pub fn list_installed(&self) -> Capture {
        self.backend.list_installed()
    }

    pub fn resolve(&self, package: &str) -> Resolution {
        resolver::resolve(self.backend, package)
    }

    /// Install every entry of a batch file in file order. Fail fast: the
    /// first failing install propagates and nothing further is attempted.
    pub fn batch_install(&self, path: &Path) -> Result<usize> {
        privilege::require_root_or_exit("batch-install");
        let set = config::load(path)?;
        for spec in &set.packages {
            emit(
                Level::Info,
                "batch.install",
                &format!("Installing {spec}"),
                None,
            );
            self.install(&spec.name, spec.version.as_deref())?;
        }
        Ok(set.packages.len())
    }
}

impl PackageOps for PackageManager {
    fn install(&self, name: &str, version: Option<&str>) -> Result<()> {
        PackageManager::install(self, name, version)
    }

    fn remove(&self, name: &str) -> Result<()> {
        PackageManager::remove(self, name)
    }

    fn installed_version(&self, name: &str) -> Option<String> {
        self.backend.installed_version(name)
    }
}
