//! `huddle distribute`: validate, then hand items out to participants.

use clap::Args;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::io::Write;

use huddle_core::model::{AssignmentMap, DistributionConfig, Item};
use huddle_distribute::{distribute_with_rng, validate};

use crate::cmd::PoolArgs;
use crate::cmd::validate::render_result;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct DistributeArgs {
    #[command(flatten)]
    pub pool: PoolArgs,

    /// Seed the shuffle for a reproducible run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Distribute even when validation reports errors.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DistributeOutput {
    assignments: AssignmentMap,
    unassigned: Vec<String>,
    warnings: Vec<String>,
}

pub fn run_distribute(
    args: &DistributeArgs,
    base: DistributionConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let (items, participants) = args.pool.load()?;
    let config = args.pool.config(base);

    let validation = validate(&items, &participants, &config);
    if !validation.valid {
        if args.force {
            tracing::warn!(errors = ?validation.errors, "distributing despite validation errors");
        } else {
            render_mode(output, &validation, |r, w| render_result(r, config, w))?;
            anyhow::bail!("distribution config is not feasible");
        }
    }

    let mut rng = args
        .seed
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let map = distribute_with_rng(&items, &participants, &config, &mut rng);
    tracing::info!(
        mode = %map.distribution_mode,
        assigned = map.assigned_count(),
        "items distributed"
    );

    let payload = DistributeOutput {
        unassigned: unassigned_ids(&map, &items),
        warnings: validation.warnings,
        assignments: map,
    };
    render_mode(output, &payload, render_distribution)
}

fn unassigned_ids(map: &AssignmentMap, items: &[Item]) -> Vec<String> {
    map.unassigned(items).into_iter().map(str::to_string).collect()
}

fn render_distribution(payload: &DistributeOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let map = &payload.assignments;
    pretty_section(w, "Distribution")?;
    pretty_kv(w, "mode", map.distribution_mode.as_str())?;
    pretty_kv(
        w,
        "assigned",
        format!("{}/{}", map.assigned_count(), map.total_items),
    )?;
    writeln!(w)?;
    for (participant, items) in &map.participant_assignments {
        if items.is_empty() {
            writeln!(w, "{participant}: (none)")?;
        } else {
            writeln!(w, "{participant}: {}", items.join(", "))?;
        }
    }
    if !payload.unassigned.is_empty() {
        writeln!(w)?;
        writeln!(w, "unassigned: {}", payload.unassigned.join(", "))?;
    }
    for warning in &payload.warnings {
        writeln!(w, "warning: {warning}")?;
    }
    Ok(())
}
