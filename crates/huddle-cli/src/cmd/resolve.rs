//! `huddle resolve`: evaluate a data reference against a snapshot file.

use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use huddle_core::config::EngineConfig;
use huddle_core::{DataReference, ResolveContext, Snapshot, Transformer, format_value};

use crate::cmd::read_json;
use crate::output::{OutputMode, render_mode};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Snapshot JSON object (`-` for stdin).
    #[arg(long, value_name = "PATH")]
    pub snapshot: PathBuf,

    /// `namespace/accessor[/transformer]`, a root key, or a dotted path.
    #[arg(value_name = "REFERENCE")]
    pub reference: DataReference,

    /// Participant id the `mine` and `not-mine` views filter by.
    #[arg(long, value_name = "ID")]
    pub caller: Option<String>,

    /// Resolve as the session host.
    #[arg(long)]
    pub host: bool,

    /// Do not search slide namespaces for bare names.
    #[arg(long)]
    pub no_legacy_search: bool,
}

#[derive(Debug, Serialize)]
struct ResolveOutput {
    reference: String,
    value: Value,
    display: String,
}

pub fn run_resolve(
    args: &ResolveArgs,
    config: &EngineConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let snapshot: Snapshot = read_json(&args.snapshot)?;
    let resolver = config
        .resolver()
        .legacy_search(config.resolver.legacy_search && !args.no_legacy_search);

    let caller = caller_id(args)?;
    let mut ctx = ResolveContext::new(&snapshot, caller);
    if args.host {
        ctx = ctx.as_host();
    }
    let value = resolver.resolve(&args.reference, &ctx);

    let payload = ResolveOutput {
        reference: args.reference.to_string(),
        display: format_value(&value),
        value,
    };
    render_mode(output, &payload, |p, w| writeln!(w, "{}", p.display))
}

/// The caller id; required when the reference uses a per-caller view.
fn caller_id(args: &ResolveArgs) -> anyhow::Result<&str> {
    let per_caller = matches!(
        &args.reference,
        DataReference::Structured(reference)
            if matches!(reference.transformer, Transformer::Mine | Transformer::NotMine)
    );
    match args.caller.as_deref() {
        Some(caller) if !caller.is_empty() => Ok(caller),
        _ if per_caller => {
            anyhow::bail!("`{}` needs --caller <ID>", args.reference)
        }
        _ => Ok(""),
    }
}
