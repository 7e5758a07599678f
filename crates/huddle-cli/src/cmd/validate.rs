//! `huddle validate`: pre-flight check for a distribution run.

use clap::Args;
use std::io::Write;

use huddle_core::model::DistributionConfig;
use huddle_distribute::{ValidationResult, validate};

use crate::cmd::PoolArgs;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub pool: PoolArgs,
}

pub fn run_validate(
    args: &ValidateArgs,
    base: DistributionConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let (items, participants) = args.pool.load()?;
    let config = args.pool.config(base);
    let result = validate(&items, &participants, &config);

    render_mode(output, &result, |r, w| render_result(r, config, w))?;

    if !result.valid {
        anyhow::bail!("distribution config is not feasible");
    }
    Ok(())
}

/// Human listing shared with `distribute`, which prints it on rejection.
pub fn render_result(
    result: &ValidationResult,
    config: DistributionConfig,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    pretty_section(w, "Validation")?;
    pretty_kv(w, "mode", config.mode.as_str())?;
    pretty_kv(w, "mismatch", config.mismatch_handling.as_str())?;
    pretty_kv(w, "valid", if result.valid { "yes" } else { "no" })?;
    for error in &result.errors {
        writeln!(w, "error: {error}")?;
    }
    for warning in &result.warnings {
        writeln!(w, "warning: {warning}")?;
    }
    if let Some(suggestions) = &result.suggestions {
        writeln!(w)?;
        writeln!(w, "Suggestions:")?;
        for suggestion in suggestions {
            writeln!(w, "  - {suggestion}")?;
        }
    }
    Ok(())
}
