use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

pub const LOCAL_PACKAGE_SUFFIX: &str = ".pkg.tar.zst";

/// What the user typed into the package field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageRef {
    Remote(String),
    Local(PathBuf),
}

impl PackageRef {
    /// Returns `None` for blank input.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if input.ends_with(LOCAL_PACKAGE_SUFFIX) {
            Some(PackageRef::Local(PathBuf::from(input)))
        } else {
            Some(PackageRef::Remote(input.to_string()))
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, PackageRef::Local(_))
    }

    pub fn target(&self) -> String {
        match self {
            PackageRef::Remote(name) => name.clone(),
            PackageRef::Local(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub repository: Option<String>,
    pub name: String,
    pub version: String,
    pub installed: bool,
    pub description: String,
}

impl PackageEntry {
    pub fn qualified_name(&self) -> String {
        match &self.repository {
            Some(repo) => format!("{}/{}", repo, self.name),
            None => self.name.clone(),
        }
    }
}

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:(?P<repo>[^/\s]+)/)?(?P<name>\S+)(?:\s+(?P<version>\S+))?(?P<rest>.*)$")
            .expect("static regex")
    })
}

/// Parses `pacman -Ss` output.
///
/// Header lines start at column zero (`core/bash 5.2.026-2 (base) [installed]`),
/// the description follows on an indented line.
pub fn parse_search_output(output: &str) -> Vec<PackageEntry> {
    let mut packages: Vec<PackageEntry> = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            if let Some(last) = packages.last_mut() {
                if last.description.is_empty() {
                    last.description = line.trim().to_string();
                } else {
                    last.description.push(' ');
                    last.description.push_str(line.trim());
                }
            }
            continue;
        }

        let Some(caps) = header_pattern().captures(line) else {
            continue;
        };
        let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or_default();
        packages.push(PackageEntry {
            repository: caps.name("repo").map(|m| m.as_str().to_string()),
            name: caps["name"].to_string(),
            version: caps
                .name("version")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            installed: rest.contains("[installed"),
            description: String::new(),
        });
    }

    packages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_decides_local_vs_remote() {
        assert_eq!(
            PackageRef::parse("vim"),
            Some(PackageRef::Remote("vim".to_string()))
        );
        assert_eq!(
            PackageRef::parse("  /tmp/foo.pkg.tar.zst "),
            Some(PackageRef::Local(PathBuf::from("/tmp/foo.pkg.tar.zst")))
        );
        assert_eq!(
            PackageRef::parse("foo.pkg.tar.xz"),
            Some(PackageRef::Remote("foo.pkg.tar.xz".to_string()))
        );
    }

    #[test]
    fn blank_input_is_no_reference() {
        assert_eq!(PackageRef::parse(""), None);
        assert_eq!(PackageRef::parse("   \t"), None);
    }

    #[test]
    fn parses_search_listing() {
        let output = "\
core/bash 5.2.026-2 (base) [installed]
    The GNU Bourne Again shell
extra/vim 9.1.0-1
    Vi Improved, a highly configurable, improved version of the vi text editor
extra/neovim 0.10.0-1 [installed: 0.9.5-1]
    Fork of Vim aiming to improve user experience, plugins, and GUIs
";
        let packages = parse_search_output(output);
        assert_eq!(packages.len(), 3);

        assert_eq!(packages[0].repository.as_deref(), Some("core"));
        assert_eq!(packages[0].name, "bash");
        assert_eq!(packages[0].version, "5.2.026-2");
        assert!(packages[0].installed);
        assert_eq!(packages[0].description, "The GNU Bourne Again shell");

        assert_eq!(packages[1].qualified_name(), "extra/vim");
        assert!(!packages[1].installed);

        assert!(packages[2].installed);
    }

    #[test]
    fn bare_names_without_repository() {
        let packages = parse_search_output("localpkg\n\n");
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].repository, None);
        assert_eq!(packages[0].name, "localpkg");
        assert_eq!(packages[0].version, "");
    }

    #[test]
    fn orphan_description_lines_are_skipped() {
        assert!(parse_search_output("    dangling description\n").is_empty());
    }
}
