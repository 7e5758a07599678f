use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::DistributionConfig;
use crate::resolve::Resolver;
use crate::session::PreviewSession;

/// Relative location of the project config file.
pub const CONFIG_PATH: &str = ".huddle/config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub distribution: DistributionConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Search slide namespaces for bare names not found at the root.
    #[serde(default = "default_true")]
    pub legacy_search: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            legacy_search: default_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Slide ids in presentation order.
    #[serde(default)]
    pub slides: Vec<String>,
}

const fn default_true() -> bool {
    true
}

impl EngineConfig {
    /// Resolver honouring `[resolver]`.
    #[must_use]
    pub fn resolver(&self) -> Resolver {
        Resolver::new().legacy_search(self.resolver.legacy_search)
    }

    /// Unstarted session over `[session].slides`.
    #[must_use]
    pub fn session(&self) -> PreviewSession {
        PreviewSession::new(self.session.slides.clone())
    }
}

/// Parse config from TOML text.
///
/// # Errors
///
/// Returns an error if the text is not valid TOML for [`EngineConfig`].
pub fn parse_config(content: &str) -> Result<EngineConfig> {
    toml::from_str::<EngineConfig>(content).context("Failed to parse engine config")
}

/// Load config from `path`; a missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(EngineConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<EngineConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load `.huddle/config.toml` under `project_root`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn discover_config(project_root: &Path) -> Result<EngineConfig> {
    load_config(&project_root.join(CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DistributionMode, MismatchHandling};

    #[test]
    fn empty_config_is_default() {
        let config = parse_config("").expect("parse");
        assert_eq!(config, EngineConfig::default());
        assert!(config.resolver.legacy_search);
    }

    #[test]
    fn parses_all_sections() {
        let config = parse_config(
            r#"
[distribution]
mode = "exclude-own"
mismatchHandling = "strict"
allowEmptyAssignments = false

[resolver]
legacy_search = false

[session]
slides = ["intro-1", "vote-2"]
"#,
        )
        .expect("parse");

        assert_eq!(config.distribution.mode, DistributionMode::ExcludeOwn);
        assert_eq!(config.distribution.mismatch_handling, MismatchHandling::Strict);
        assert!(!config.distribution.allow_empty_assignments);
        assert!(!config.resolver.legacy_search);
        assert_eq!(config.session.slides, vec!["intro-1", "vote-2"]);
        assert_eq!(config.session().slides().len(), 2);
    }

    #[test]
    fn unknown_mode_in_file_falls_back() {
        let config = parse_config("[distribution]\nmode = \"lottery\"\n").expect("parse");
        assert_eq!(config.distribution.mode, DistributionMode::OnePerParticipant);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(parse_config("[distribution\nmode = ").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = discover_config(dir.path()).expect("load");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn discover_reads_project_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join(".huddle")).expect("mkdir");
        std::fs::write(
            dir.path().join(CONFIG_PATH),
            "[distribution]\nmode = \"round-robin\"\n",
        )
        .expect("write");
        let config = discover_config(dir.path()).expect("load");
        assert_eq!(config.distribution.mode, DistributionMode::RoundRobin);
    }
}
