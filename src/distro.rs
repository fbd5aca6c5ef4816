//! Host distribution detection.
//!
//! Detection re-reads `/etc/os-release` on every call. The parse and the
//! classification are pure functions so tests can feed fixture content
//! instead of touching the running system.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Parsed key-value view of an os-release file, quotes stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    fields: HashMap<String, String>,
}

impl OsRelease {
    /// Read the well-known system path. A missing file is not an error; it
    /// means the distribution is unknown.
    pub fn read() -> Option<Self> {
        let path = Path::new(OS_RELEASE_PATH);
        if !path.exists() {
            return None;
        }
        fs::read_to_string(path).ok().map(|content| Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut fields = HashMap::new();
        for line in content.lines() {
            if let Some((key, value)) = line.split_once('=') {
                fields.insert(
                    key.trim().to_string(),
                    value.trim().trim_matches('"').to_string(),
                );
            }
        }
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn id(&self) -> &str {
        self.get("ID").unwrap_or("")
    }

    pub fn id_like(&self) -> &str {
        self.get("ID_LIKE").unwrap_or("")
    }
}

/// Distribution family, the unit backends are selected by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    DebianLike,
    RedhatLike,
    ArchLike,
    GentooLike,
    Unknown,
}

/// Keyword sets in priority order; the first set with a match wins.
const KEYWORD_SETS: [(Family, &[&str]); 4] = [
    (Family::DebianLike, &["debian", "ubuntu"]),
    (Family::RedhatLike, &["rhel", "centos", "fedora"]),
    (Family::ArchLike, &["arch"]),
    (Family::GentooLike, &["gentoo"]),
];

impl Family {
    /// Detect the family of the running host.
    pub fn detect() -> Self {
        match OsRelease::read() {
            Some(os) => Self::classify(&os),
            None => Self::Unknown,
        }
    }

    /// Classify parsed os-release content.
    pub fn classify(os: &OsRelease) -> Self {
        if let Some(family) = Self::match_keywords(os.id()) {
            return family;
        }
        // Derivatives often only advertise their parent through ID_LIKE.
        Self::match_keywords(os.id_like()).unwrap_or(Self::Unknown)
    }

    fn match_keywords(haystack: &str) -> Option<Self> {
        let haystack = haystack.to_lowercase();
        KEYWORD_SETS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| haystack.contains(kw)))
            .map(|(family, _)| *family)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DebianLike => "debian-like",
            Self::RedhatLike => "redhat-like",
            Self::ArchLike => "arch-like",
            Self::GentooLike => "gentoo-like",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arch() {
        let content = r#"NAME="Arch Linux"
PRETTY_NAME="Arch Linux"
ID=arch
BUILD_ID=rolling
HOME_URL="https://archlinux.org/"
LOGO=archlinux-logo"#;
        let os = OsRelease::parse(content);
        assert_eq!(os.id(), "arch");
        assert_eq!(os.get("NAME"), Some("Arch Linux"));
        assert_eq!(Family::classify(&os), Family::ArchLike);
    }

    #[test]
    fn test_parse_ubuntu() {
        let content = r#"PRETTY_NAME="Ubuntu 22.04.3 LTS"
NAME="Ubuntu"
VERSION_ID="22.04"
VERSION_CODENAME=jammy
ID=ubuntu
ID_LIKE=debian
HOME_URL="https://www.ubuntu.com/""#;
        assert_eq!(Family::classify(&OsRelease::parse(content)), Family::DebianLike);
    }

    #[test]
    fn test_parse_fedora() {
        let content = r#"NAME="Fedora Linux"
VERSION="39 (Workstation Edition)"
ID=fedora
VERSION_ID=39"#;
        assert_eq!(Family::classify(&OsRelease::parse(content)), Family::RedhatLike);
    }

    #[test]
    fn test_parse_gentoo() {
        let content = "NAME=Gentoo\nID=gentoo\n";
        assert_eq!(Family::classify(&OsRelease::parse(content)), Family::GentooLike);
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        let os = OsRelease::parse("ID=\"CentOS\"\n");
        assert_eq!(Family::classify(&os), Family::RedhatLike);
    }

    #[test]
    fn test_unknown_id_without_id_like() {
        let os = OsRelease::parse("ID=nixos\n");
        assert_eq!(Family::classify(&os), Family::Unknown);
    }

    #[test]
    fn test_id_like_fallback_for_derivatives() {
        let content = r#"NAME="Linux Mint"
ID=linuxmint
ID_LIKE="ubuntu debian""#;
        assert_eq!(Family::classify(&OsRelease::parse(content)), Family::DebianLike);

        let rocky = r#"NAME="Rocky Linux"
ID=rocky
ID_LIKE="rhel centos fedora""#;
        assert_eq!(Family::classify(&OsRelease::parse(rocky)), Family::RedhatLike);
    }

    #[test]
    fn test_id_match_takes_precedence_over_id_like() {
        // ID matched a family, so ID_LIKE must not be consulted.
        let os = OsRelease::parse("ID=arch\nID_LIKE=debian\n");
        assert_eq!(Family::classify(&os), Family::ArchLike);
    }

    #[test]
    fn test_priority_order_breaks_multi_matches() {
        // Contains both "arch" and "debian"; debian-like is checked first.
        let os = OsRelease::parse("ID=archdebian\n");
        assert_eq!(Family::classify(&os), Family::DebianLike);
    }

    #[test]
    fn test_empty_content_is_unknown() {
        assert_eq!(Family::classify(&OsRelease::parse("")), Family::Unknown);
    }
}
