//! Slide-level aggregation: what a namespace holds, and folding every
//! participant's local state into one shared snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::{self, Accessor, SHARED_STATE_KEY, Snapshot};
use crate::transform;

/// Population report for one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideSummary {
    pub has_responses: bool,
    pub has_assignments: bool,
    pub has_assignment_responses: bool,
    pub response_count: usize,
    pub assignment_count: usize,
    pub assignment_response_count: usize,
}

impl SlideSummary {
    /// Count recorded for `accessor`.
    #[must_use]
    pub const fn count(&self, accessor: Accessor) -> usize {
        match accessor {
            Accessor::Responses => self.response_count,
            Accessor::Assignments => self.assignment_count,
            Accessor::AssignmentResponses => self.assignment_response_count,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.has_responses || self.has_assignments || self.has_assignment_responses)
    }
}

/// Report which accessors of `namespace_id` are populated.
///
/// A missing namespace or accessor counts as zero.
#[must_use]
pub fn analyze(snapshot: &Snapshot, namespace_id: &str) -> SlideSummary {
    let Some(ns) = state::namespace(snapshot, namespace_id) else {
        return SlideSummary::default();
    };
    let count = |accessor: Accessor| transform::count(ns.get(accessor.as_str()));

    let response_count = count(Accessor::Responses);
    let assignment_count = count(Accessor::Assignments);
    let assignment_response_count = count(Accessor::AssignmentResponses);

    SlideSummary {
        has_responses: response_count > 0,
        has_assignments: assignment_count > 0,
        has_assignment_responses: assignment_response_count > 0,
        response_count,
        assignment_count,
        assignment_response_count,
    }
}

/// One simulated participant's view of the session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLocalState {
    pub participant_id: String,
    /// `namespace -> block -> submitted value`.
    #[serde(default)]
    pub responses: BTreeMap<String, BTreeMap<String, Value>>,
    #[serde(default)]
    pub custom_variables: Map<String, Value>,
    /// `namespace -> item ids handed to this participant`.
    #[serde(default)]
    pub assignments: BTreeMap<String, Vec<String>>,
}

impl ParticipantLocalState {
    #[must_use]
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            ..Self::default()
        }
    }

    pub fn record_response(&mut self, namespace_id: &str, block_id: &str, value: Value) {
        self.responses
            .entry(namespace_id.to_string())
            .or_default()
            .insert(block_id.to_string(), value);
    }

    pub fn record_assignments(&mut self, namespace_id: &str, item_ids: Vec<String>) {
        self.assignments.insert(namespace_id.to_string(), item_ids);
    }

    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.custom_variables.insert(name.to_string(), value);
    }
}

/// Key under which one participant's answer to one block is merged.
///
/// Hyphens in the block id become underscores so the author is always
/// everything before the last hyphen.
#[must_use]
pub fn submission_key(participant_id: &str, block_id: &str) -> String {
    format!("{participant_id}-{}", block_id.replace('-', "_"))
}

/// Fold `states` into a copy of `base`.
///
/// - `responses[ns][block]` lands in `snapshot[ns].responses` under
///   [`submission_key`].
/// - `assignments[ns]` lands in `snapshot[ns].assignments[participant]`.
/// - Non-empty custom variables land in `sharedState[participant]`.
///
/// `phase` and every other root key are kept as they are, except accessor
/// names, which are dropped from the root. Local data filed under a reserved
/// root key is skipped.
#[must_use]
pub fn merge_participant_states(base: &Snapshot, states: &[ParticipantLocalState]) -> Snapshot {
    let mut merged = base.clone();

    for accessor in Accessor::ALL {
        if merged.remove(accessor.as_str()).is_some() {
            tracing::warn!(%accessor, "dropping legacy root accessor during merge");
        }
    }

    for local in states {
        let participant = local.participant_id.as_str();

        for (namespace_id, blocks) in &local.responses {
            if !is_mergeable_namespace(namespace_id, participant) {
                continue;
            }
            let responses = collection_mut(&mut merged, namespace_id, Accessor::Responses);
            for (block_id, value) in blocks {
                responses.insert(submission_key(participant, block_id), value.clone());
            }
        }

        for (namespace_id, item_ids) in &local.assignments {
            if !is_mergeable_namespace(namespace_id, participant) {
                continue;
            }
            let assignments = collection_mut(&mut merged, namespace_id, Accessor::Assignments);
            assignments.insert(
                participant.to_string(),
                Value::Array(item_ids.iter().cloned().map(Value::String).collect()),
            );
        }

        if !local.custom_variables.is_empty() {
            let shared = ensure_object(
                merged
                    .entry(SHARED_STATE_KEY.to_string())
                    .or_insert_with(|| Value::Object(Map::new())),
            );
            shared.insert(
                participant.to_string(),
                Value::Object(local.custom_variables.clone()),
            );
        }
    }

    tracing::debug!(participants = states.len(), "merged participant states");
    merged
}

/// Reserved root keys never receive participant data.
fn is_mergeable_namespace(namespace_id: &str, participant: &str) -> bool {
    if state::is_reserved_key(namespace_id) {
        tracing::warn!(
            namespace = namespace_id,
            participant,
            "skipping participant data under a reserved root key"
        );
        return false;
    }
    true
}

fn collection_mut<'a>(
    snapshot: &'a mut Snapshot,
    namespace_id: &str,
    accessor: Accessor,
) -> &'a mut Map<String, Value> {
    let ns = ensure_object(
        snapshot
            .entry(namespace_id.to_string())
            .or_insert_with(state::empty_namespace),
    );
    ensure_object(
        ns.entry(accessor.as_str().to_string())
            .or_insert_with(|| Value::Object(Map::new())),
    )
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        tracing::warn!("replacing non-object value while merging participant state");
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}
