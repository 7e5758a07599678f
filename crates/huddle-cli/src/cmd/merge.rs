//! `huddle merge`: fold participant-local states into a namespaced snapshot.

use std::path::PathBuf;

use clap::Args;

use huddle_core::{ParticipantLocalState, Snapshot, merge_participant_states};

use crate::cmd::read_json;
use crate::output::{OutputMode, render_mode};

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// JSON array of participant-local states.
    #[arg(long, value_name = "PATH")]
    pub states: PathBuf,

    /// Snapshot to merge into. Starts from an empty snapshot when omitted.
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,
}

pub fn run_merge(args: &MergeArgs, output: OutputMode) -> anyhow::Result<()> {
    let base: Snapshot = match &args.snapshot {
        Some(path) => read_json(path)?,
        None => Snapshot::new(),
    };
    let states: Vec<ParticipantLocalState> = read_json(&args.states)?;

    let merged = merge_participant_states(&base, &states);
    tracing::info!(
        participants = states.len(),
        keys = merged.len(),
        "merged participant states"
    );

    render_mode(output, &merged, |snapshot, w| {
        let text = serde_json::to_string_pretty(snapshot).map_err(std::io::Error::other)?;
        writeln!(w, "{text}")
    })
}
