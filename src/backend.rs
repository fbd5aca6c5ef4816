//! Per-family package manager backends.
//!
//! A closed set of variants, one per supported distribution family, each
//! mapping the uniform capability set onto its native tool. Command
//! construction is pure; execution goes through [`crate::exec`]. Mutating
//! commands are prefixed with `sudo` and always run non-interactively.

use crate::error::{Error, Result};
use crate::exec::{self, Capture, CommandSpec};

/// Native package manager backing the facade. One variant per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// APT - Debian/Ubuntu family
    Apt,
    /// DNF - Fedora/RHEL family
    Dnf,
    /// Pacman - Arch Linux family
    Pacman,
}

impl BackendKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Apt => "APT",
            Self::Dnf => "DNF",
            Self::Pacman => "Pacman",
        }
    }

    pub fn binary(&self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::Dnf => "dnf",
            Self::Pacman => "pacman",
        }
    }

    /// Check whether the backing binary is present in PATH.
    pub fn is_available(&self) -> bool {
        which::which(self.binary()).is_ok()
    }

    /// Package token carrying the family's version qualifier syntax.
    fn package_token(&self, name: &str, version: Option<&str>) -> String {
        match (self, version) {
            (_, None) => name.to_string(),
            (Self::Apt, Some(v)) => format!("{name}={v}"),
            (Self::Dnf | Self::Pacman, Some(v)) => format!("{name}-{v}"),
        }
    }

    // ========================================================================
    // Command construction (pure)
    // ========================================================================

    pub fn install_command(&self, name: &str, version: Option<&str>) -> CommandSpec {
        let token = self.package_token(name, version);
        match self {
            Self::Apt => CommandSpec::new("sudo", ["apt", "install", "-y"]).arg(token),
            Self::Dnf => CommandSpec::new("sudo", ["dnf", "install", "-y"]).arg(token),
            Self::Pacman => CommandSpec::new("sudo", ["pacman", "-S", "--noconfirm"]).arg(token),
        }
    }

    pub fn remove_command(&self, name: &str) -> CommandSpec {
        match self {
            Self::Apt => CommandSpec::new("sudo", ["apt", "remove", "-y"]).arg(name),
            Self::Dnf => CommandSpec::new("sudo", ["dnf", "remove", "-y"]).arg(name),
            Self::Pacman => CommandSpec::new("sudo", ["pacman", "-R", "--noconfirm"]).arg(name),
        }
    }

    pub fn update_command(&self) -> CommandSpec {
        match self {
            Self::Apt => CommandSpec::new("sudo", ["apt", "update"]),
            // check-update only reports; it does not refresh metadata the way
            // apt update does. The asymmetry is inherited from the tools.
            Self::Dnf => CommandSpec::new("sudo", ["dnf", "check-update"]),
            Self::Pacman => CommandSpec::new("sudo", ["pacman", "-Sy"]),
        }
    }

    pub fn upgrade_command(&self) -> CommandSpec {
        match self {
            Self::Apt => CommandSpec::new("sudo", ["apt", "upgrade", "-y"]),
            Self::Dnf => CommandSpec::new("sudo", ["dnf", "upgrade", "-y"]),
            Self::Pacman => CommandSpec::new("sudo", ["pacman", "-Su", "--noconfirm"]),
        }
    }

    pub fn search_command(&self, term: &str) -> CommandSpec {
        match self {
            Self::Apt => CommandSpec::new("apt-cache", ["search"]).arg(term),
            Self::Dnf => CommandSpec::new("dnf", ["search"]).arg(term),
            Self::Pacman => CommandSpec::new("pacman", ["-Ss"]).arg(term),
        }
    }

    pub fn list_command(&self) -> CommandSpec {
        match self {
            Self::Apt => CommandSpec::new("dpkg", ["--list"]),
            Self::Dnf => CommandSpec::new("rpm", ["-qa"]),
            Self::Pacman => CommandSpec::new("pacman", ["-Q"]),
        }
    }

    pub fn depends_command(&self, name: &str) -> CommandSpec {
        match self {
            Self::Apt => CommandSpec::new("apt-cache", ["depends"]).arg(name),
            Self::Dnf => CommandSpec::new("dnf", ["repoquery", "--requires"]).arg(name),
            Self::Pacman => CommandSpec::new("pactree", Vec::<String>::new()).arg(name),
        }
    }

    pub fn installed_version_command(&self, name: &str) -> CommandSpec {
        match self {
            Self::Apt => CommandSpec::new("dpkg-query", ["-W", "-f=${Version}"]).arg(name),
            Self::Dnf => CommandSpec::new("rpm", ["-q", "--qf", "%{VERSION}"]).arg(name),
            Self::Pacman => CommandSpec::new("pacman", ["-Q"]).arg(name),
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    pub fn install(&self, name: &str, version: Option<&str>) -> Result<()> {
        exec::run_checked(&self.install_command(name, version))
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        exec::run_checked(&self.remove_command(name))
    }

    pub fn update(&self) -> Result<()> {
        match exec::run_checked(&self.update_command()) {
            // dnf check-update exits 100 when updates are available; that is
            // information, not failure.
            Err(Error::ExternalCommand { code: 100, .. }) if *self == Self::Dnf => Ok(()),
            other => other,
        }
    }

    pub fn upgrade(&self) -> Result<()> {
        exec::run_checked(&self.upgrade_command())
    }

    /// Best-effort search; whatever was captured is the answer.
    pub fn search(&self, term: &str) -> Capture {
        exec::capture(&self.search_command(term))
    }

    /// Best-effort enumeration of installed packages.
    pub fn list_installed(&self) -> Capture {
        exec::capture(&self.list_command())
    }

    /// Best-effort currently-installed version of a single package.
    /// `None` on any failure; used to pin transaction rollback reinstalls.
    pub fn installed_version(&self, name: &str) -> Option<String> {
        let capture = exec::capture(&self.installed_version_command(name));
        if !capture.success() {
            return None;
        }
        let version = match self {
            // pacman -Q prints "name version"
            Self::Pacman => capture.stdout.split_whitespace().nth(1)?.to_string(),
            Self::Apt | Self::Dnf => capture.stdout.trim().to_string(),
        };
        (!version.is_empty()).then_some(version)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_qualifier_syntax() {
        assert_eq!(
            BackendKind::Apt.install_command("nginx", Some("1.24")).to_string(),
            "sudo apt install -y nginx=1.24"
        );
        assert_eq!(
            BackendKind::Dnf.install_command("nginx", Some("1.24")).to_string(),
            "sudo dnf install -y nginx-1.24"
        );
        assert_eq!(
            BackendKind::Pacman.install_command("nginx", Some("1.24")).to_string(),
            "sudo pacman -S --noconfirm nginx-1.24"
        );
    }

    #[test]
    fn test_install_without_version_uses_bare_name() {
        for kind in [BackendKind::Apt, BackendKind::Dnf, BackendKind::Pacman] {
            let spec = kind.install_command("git", None);
            assert_eq!(spec.args.last().map(String::as_str), Some("git"));
        }
    }

    #[test]
    fn test_mutating_commands_are_elevated_and_non_interactive() {
        assert_eq!(
            BackendKind::Apt.remove_command("nginx").to_string(),
            "sudo apt remove -y nginx"
        );
        assert_eq!(
            BackendKind::Pacman.remove_command("nginx").to_string(),
            "sudo pacman -R --noconfirm nginx"
        );
        assert_eq!(BackendKind::Apt.update_command().to_string(), "sudo apt update");
        assert_eq!(BackendKind::Dnf.update_command().to_string(), "sudo dnf check-update");
        assert_eq!(BackendKind::Pacman.update_command().to_string(), "sudo pacman -Sy");
        assert_eq!(
            BackendKind::Dnf.upgrade_command().to_string(),
            "sudo dnf upgrade -y"
        );
        assert_eq!(
            BackendKind::Pacman.upgrade_command().to_string(),
            "sudo pacman -Su --noconfirm"
        );
    }

    #[test]
    fn test_read_only_commands_are_not_elevated() {
        assert_eq!(
            BackendKind::Apt.search_command("editor").to_string(),
            "apt-cache search editor"
        );
        assert_eq!(BackendKind::Dnf.search_command("vim").to_string(), "dnf search vim");
        assert_eq!(BackendKind::Pacman.search_command("vim").to_string(), "pacman -Ss vim");
        assert_eq!(BackendKind::Apt.list_command().to_string(), "dpkg --list");
        assert_eq!(BackendKind::Dnf.list_command().to_string(), "rpm -qa");
        assert_eq!(BackendKind::Pacman.list_command().to_string(), "pacman -Q");
    }

    #[test]
    fn test_depends_commands() {
        assert_eq!(
            BackendKind::Apt.depends_command("nginx").to_string(),
            "apt-cache depends nginx"
        );
        assert_eq!(
            BackendKind::Dnf.depends_command("nginx").to_string(),
            "dnf repoquery --requires nginx"
        );
        assert_eq!(BackendKind::Pacman.depends_command("nginx").to_string(), "pactree nginx");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(BackendKind::Apt.display_name(), "APT");
        assert_eq!(BackendKind::Dnf.display_name(), "DNF");
        assert_eq!(BackendKind::Pacman.display_name(), "Pacman");
    }
}
