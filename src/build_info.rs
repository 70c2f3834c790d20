//! Build metadata baked in at compile time.
//!
//! Values are read from `MULTIBIN_VERSION`, `MULTIBIN_COMMIT` and
//! `MULTIBIN_BUILD_DATE` when the crate is compiled. A [`BuildInfo`] is
//! constructed once in `main` and handed to whatever needs it (the version
//! banner, `/health`, `/api/info`, the CLI `status` command).

use serde::Serialize;

const DEFAULT_VERSION: &str = "dev";
const DEFAULT_COMMIT: &str = "unknown";
const DEFAULT_DATE: &str = "unknown";

/// Immutable version/commit/date triple for a binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub date: &'static str,
}

impl BuildInfo {
    /// Create build info with explicit values.
    pub const fn new(version: &'static str, commit: &'static str, date: &'static str) -> Self {
        Self {
            version,
            commit,
            date,
        }
    }

    /// Build info from the compile-time environment, falling back to
    /// `dev`/`unknown`/`unknown` for unset variables.
    pub fn from_build_env() -> Self {
        Self {
            version: option_env!("MULTIBIN_VERSION").unwrap_or(DEFAULT_VERSION),
            commit: option_env!("MULTIBIN_COMMIT").unwrap_or(DEFAULT_COMMIT),
            date: option_env!("MULTIBIN_BUILD_DATE").unwrap_or(DEFAULT_DATE),
        }
    }

    /// The four-line `--version` banner for `tool_name`.
    pub fn banner(&self, tool_name: &str) -> String {
        format!(
            "{}\nVersion: {}\nCommit: {}\nBuilt: {}\n",
            tool_name, self.version, self.commit, self.date
        )
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::new(DEFAULT_VERSION, DEFAULT_COMMIT, DEFAULT_DATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_has_four_lines() {
        let info = BuildInfo::new("1.2.3", "abc123", "2025-06-22");
        let banner = info.banner("Example Server");

        let lines: Vec<&str> = banner.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Example Server",
                "Version: 1.2.3",
                "Commit: abc123",
                "Built: 2025-06-22"
            ]
        );
    }

    #[test]
    fn test_default_values() {
        let info = BuildInfo::default();
        assert_eq!(info.version, "dev");
        assert_eq!(info.commit, "unknown");
        assert_eq!(info.date, "unknown");
    }

    #[test]
    fn test_from_build_env_is_populated() {
        let info = BuildInfo::from_build_env();
        assert!(!info.version.is_empty());
        assert!(!info.commit.is_empty());
        assert!(!info.date.is_empty());
    }
}
