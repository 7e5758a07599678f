//! State-shape guards.
//!
//! A snapshot is an open JSON object. Two layouts coexist:
//!
//! - **Namespaced**: a root `phase` plus one object per slide, keyed by a
//!   hyphenated slide id, each carrying any of the [`Accessor`] collections.
//! - **Legacy flat**: accessor collections stored directly at the root.
//!
//! [`classify`] is the single place that decides which layout a snapshot
//! uses; consumers branch on [`StateLayout`] instead of probing keys.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EnumKind, ParseError};

/// A session state snapshot.
pub type Snapshot = Map<String, Value>;

/// Root key naming the current slide.
pub const PHASE_KEY: &str = "phase";

/// Root key holding per-participant custom variables.
pub const SHARED_STATE_KEY: &str = "sharedState";

/// Keys that can never be namespace ids.
pub const RESERVED_KEYS: [&str; 5] = [
    PHASE_KEY,
    "responses",
    "assignments",
    "assignmentResponses",
    SHARED_STATE_KEY,
];

/// The three data categories held within a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Accessor {
    Responses,
    Assignments,
    AssignmentResponses,
}

impl Accessor {
    pub const ALL: [Self; 3] = [Self::Responses, Self::Assignments, Self::AssignmentResponses];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Responses => "responses",
            Self::Assignments => "assignments",
            Self::AssignmentResponses => "assignmentResponses",
        }
    }

    /// True when `key` is one of the accessor names.
    #[must_use]
    pub fn is_accessor_name(key: &str) -> bool {
        Self::ALL.iter().any(|accessor| accessor.as_str() == key)
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Accessor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "responses" => Ok(Self::Responses),
            "assignments" => Ok(Self::Assignments),
            "assignmentResponses" | "assignment-responses" => Ok(Self::AssignmentResponses),
            _ => Err(ParseError::new(
                EnumKind::Accessor,
                s,
                "responses, assignments, assignmentResponses",
            )),
        }
    }
}

/// Snapshot layout, decided once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateLayout {
    /// Accessors live only under slide namespaces (or nowhere yet).
    Namespaced(NamespacedState),
    /// Accessors live only at the root.
    Legacy(LegacyState),
    /// Mid-migration: root accessors and namespaces at the same time.
    Mixed {
        legacy: LegacyState,
        namespaced: NamespacedState,
    },
}

impl StateLayout {
    #[must_use]
    pub const fn is_namespaced(&self) -> bool {
        matches!(self, Self::Namespaced(_))
    }

    #[must_use]
    pub const fn has_legacy_keys(&self) -> bool {
        matches!(self, Self::Legacy(_) | Self::Mixed { .. })
    }

    /// Namespace ids present in the snapshot, sorted.
    #[must_use]
    pub fn namespaces(&self) -> &[String] {
        match self {
            Self::Namespaced(state) | Self::Mixed { namespaced: state, .. } => &state.namespaces,
            Self::Legacy(_) => &[],
        }
    }
}

/// Namespaced view: the current phase and the slide ids present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamespacedState {
    pub phase: Option<String>,
    pub namespaces: Vec<String>,
}

/// Legacy view: which accessors sit at the root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LegacyState {
    pub root_accessors: Vec<Accessor>,
}

/// True when `key` can name a slide namespace.
#[must_use]
pub fn is_namespace_key(key: &str) -> bool {
    key.contains('-') && !RESERVED_KEYS.contains(&key)
}

/// True when `key` is reserved at the snapshot root.
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Namespace ids whose value is an object, in key order.
#[must_use]
pub fn namespace_keys(snapshot: &Snapshot) -> Vec<&str> {
    snapshot
        .iter()
        .filter(|(key, value)| is_namespace_key(key) && value.is_object())
        .map(|(key, _)| key.as_str())
        .collect()
}

/// The object stored under `namespace_id`, if it is one.
#[must_use]
pub fn namespace<'a>(snapshot: &'a Snapshot, namespace_id: &str) -> Option<&'a Map<String, Value>> {
    snapshot.get(namespace_id).and_then(Value::as_object)
}

/// The `phase` string at the root, if any.
#[must_use]
pub fn phase(snapshot: &Snapshot) -> Option<&str> {
    snapshot.get(PHASE_KEY).and_then(Value::as_str)
}

/// Accessors present directly at the root.
#[must_use]
pub fn root_accessors(snapshot: &Snapshot) -> Vec<Accessor> {
    Accessor::ALL
        .into_iter()
        .filter(|accessor| snapshot.contains_key(accessor.as_str()))
        .collect()
}

/// Decide which layout `snapshot` uses.
///
/// A snapshot with neither root accessors nor namespaces is treated as an
/// empty namespaced state.
#[must_use]
pub fn classify(snapshot: &Snapshot) -> StateLayout {
    let root = root_accessors(snapshot);
    let namespaces: Vec<String> = namespace_keys(snapshot)
        .into_iter()
        .map(str::to_string)
        .collect();
    let namespaced = NamespacedState {
        phase: phase(snapshot).map(str::to_string),
        namespaces,
    };

    match (root.is_empty(), namespaced.namespaces.is_empty()) {
        (true, _) => StateLayout::Namespaced(namespaced),
        (false, true) => StateLayout::Legacy(LegacyState {
            root_accessors: root,
        }),
        (false, false) => StateLayout::Mixed {
            legacy: LegacyState {
                root_accessors: root,
            },
            namespaced,
        },
    }
}

/// An empty namespace object with all three accessors present.
#[must_use]
pub fn empty_namespace() -> Value {
    let mut ns = Map::new();
    for accessor in Accessor::ALL {
        ns.insert(accessor.as_str().to_string(), Value::Object(Map::new()));
    }
    Value::Object(ns)
}
