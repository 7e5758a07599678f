//! `huddle analyze`: report snapshot layout and per-slide population.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use huddle_core::state::{self, StateLayout};
use huddle_core::{Accessor, Snapshot, SlideSummary, analyze};

use crate::cmd::read_json;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Snapshot JSON object (`-` for stdin).
    #[arg(long, value_name = "PATH")]
    pub snapshot: PathBuf,

    /// Slide namespaces to report. Defaults to every namespace present.
    #[arg(value_name = "NAMESPACE")]
    pub namespaces: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOutput {
    layout: &'static str,
    phase: Option<String>,
    root_accessors: Vec<Accessor>,
    slides: BTreeMap<String, SlideSummary>,
}

pub fn run_analyze(args: &AnalyzeArgs, output: OutputMode) -> anyhow::Result<()> {
    let snapshot: Snapshot = read_json(&args.snapshot)?;
    let report = build_report(&snapshot, &args.namespaces);
    render_mode(output, &report, render_report)
}

fn build_report(snapshot: &Snapshot, requested: &[String]) -> AnalyzeOutput {
    let layout = state::classify(snapshot);
    let targets: Vec<String> = if requested.is_empty() {
        layout.namespaces().to_vec()
    } else {
        requested.to_vec()
    };

    let slides = targets
        .into_iter()
        .map(|ns| {
            let summary = analyze(snapshot, &ns);
            (ns, summary)
        })
        .collect();

    AnalyzeOutput {
        layout: layout_name(&layout),
        phase: state::phase(snapshot).map(str::to_string),
        root_accessors: state::root_accessors(snapshot),
        slides,
    }
}

const fn layout_name(layout: &StateLayout) -> &'static str {
    match layout {
        StateLayout::Namespaced(_) => "namespaced",
        StateLayout::Legacy(_) => "legacy",
        StateLayout::Mixed { .. } => "mixed",
    }
}

fn render_report(report: &AnalyzeOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Snapshot")?;
    pretty_kv(w, "layout", report.layout)?;
    pretty_kv(w, "phase", report.phase.as_deref().unwrap_or("-"))?;
    if !report.root_accessors.is_empty() {
        let names: Vec<&str> = report.root_accessors.iter().map(|a| a.as_str()).collect();
        pretty_kv(w, "root keys", names.join(", "))?;
    }
    for (ns, summary) in &report.slides {
        writeln!(w)?;
        pretty_section(w, ns)?;
        for accessor in Accessor::ALL {
            pretty_kv(w, accessor.as_str(), summary.count(accessor).to_string())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> Snapshot {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn reports_every_namespace_by_default() {
        let snap = snapshot(json!({
            "phase": "slide-2",
            "slide-1": { "responses": { "p1-q1": "a", "p2-q1": "b" } },
            "slide-2": { "assignments": { "p1": ["x"] } }
        }));
        let report = build_report(&snap, &[]);
        assert_eq!(report.layout, "namespaced");
        assert_eq!(report.phase.as_deref(), Some("slide-2"));
        assert_eq!(report.slides.len(), 2);
        assert_eq!(report.slides["slide-1"].response_count, 2);
        assert!(report.slides["slide-2"].has_assignments);
    }

    #[test]
    fn requested_missing_namespace_is_empty() {
        let snap = snapshot(json!({ "responses": { "p1-q1": "a" } }));
        let report = build_report(&snap, &["slide-9".to_string()]);
        assert_eq!(report.layout, "legacy");
        assert_eq!(report.root_accessors, vec![Accessor::Responses]);
        assert!(report.slides["slide-9"].is_empty());
    }

    #[test]
    fn pretty_lists_counts_per_accessor() {
        let snap = snapshot(json!({ "slide-1": { "responses": { "p1-q1": "a" } } }));
        let mut buf = Vec::new();
        render_report(&build_report(&snap, &[]), &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("slide-1"));
        assert!(text.contains("responses:"));
        assert!(text.contains("assignmentResponses:"));
    }
}
