pub mod analyze;
pub mod distribute;
pub mod merge;
pub mod resolve;
pub mod validate;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::de::DeserializeOwned;

use huddle_core::model::{DistributionConfig, DistributionMode, Item, MismatchHandling, Participant};

/// Read and deserialize a JSON document. `-` reads stdin.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Inputs and overrides shared by `validate` and `distribute`.
#[derive(Args, Debug, Clone)]
pub struct PoolArgs {
    /// JSON array of items (`id`, `content`, optional `authorId`).
    #[arg(long, value_name = "PATH")]
    pub items: PathBuf,

    /// JSON array of participants (`id`, `name`, optional `isHost`).
    #[arg(long, value_name = "PATH")]
    pub participants: PathBuf,

    /// Distribution policy. Overrides `[distribution].mode`.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<DistributionMode>,

    /// Count mismatch handling: auto, manual or strict.
    #[arg(long, value_name = "HANDLING")]
    pub mismatch: Option<MismatchHandling>,

    /// Let one participant hold several items.
    #[arg(long)]
    pub allow_multiple: bool,

    /// Omit participants who receive nothing instead of giving them an empty list.
    #[arg(long)]
    pub no_empty: bool,

    /// Under exclude-own, let participants draw items they authored.
    #[arg(long)]
    pub include_own: bool,
}

impl PoolArgs {
    /// Apply command-line overrides on top of the configured defaults.
    pub const fn config(&self, base: DistributionConfig) -> DistributionConfig {
        let mut config = base;
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(mismatch) = self.mismatch {
            config.mismatch_handling = mismatch;
        }
        if self.allow_multiple {
            config.allow_multiple_per_participant = true;
        }
        if self.no_empty {
            config.allow_empty_assignments = false;
        }
        if self.include_own {
            config.exclude_own_responses = false;
        }
        config
    }

    pub fn load(&self) -> anyhow::Result<(Vec<Item>, Vec<Participant>)> {
        let items: Vec<Item> = read_json(&self.items)?;
        let participants: Vec<Participant> = read_json(&self.participants)?;
        tracing::debug!(
            items = items.len(),
            participants = participants.len(),
            "loaded distribution inputs"
        );
        Ok((items, participants))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: PoolArgs,
    }

    #[test]
    fn overrides_apply_on_top_of_base() {
        let w = Wrapper::parse_from([
            "test",
            "--items",
            "i.json",
            "--participants",
            "p.json",
            "--mode",
            "exclude-own",
            "--mismatch",
            "strict",
            "--no-empty",
        ]);
        let config = w.args.config(DistributionConfig::default());
        assert_eq!(config.mode, DistributionMode::ExcludeOwn);
        assert_eq!(config.mismatch_handling, MismatchHandling::Strict);
        assert!(!config.allow_empty_assignments);
        assert!(!config.allow_multiple_per_participant);
        assert!(config.exclude_own_responses);
    }

    #[test]
    fn include_own_clears_exclusion() {
        let w = Wrapper::parse_from([
            "test",
            "--items",
            "i.json",
            "--participants",
            "p.json",
            "--include-own",
        ]);
        assert!(!w.args.config(DistributionConfig::default()).exclude_own_responses);
    }

    #[test]
    fn absent_flags_keep_base() {
        let w = Wrapper::parse_from(["test", "--items", "i.json", "--participants", "p.json"]);
        let base = DistributionConfig::default().with_mode(DistributionMode::RoundRobin);
        assert_eq!(w.args.config(base), base);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let result = Wrapper::try_parse_from([
            "test",
            "--items",
            "i.json",
            "--participants",
            "p.json",
            "--mode",
            "shuffle",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn read_json_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ nope").expect("write");
        let err = read_json::<serde_json::Value>(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("bad.json"));
    }
}
