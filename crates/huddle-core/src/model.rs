//! Plain data shared by distribution, validation and resolution.
//!
//! Everything here serializes with the camelCase field names used by the
//! session snapshot, so values round-trip through whatever store relays
//! them between host and participants.

use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EnumKind, ParseError};

/// A collected submission that can be handed to a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

impl Item {
    #[must_use]
    pub fn new(id: impl Into<String>, content: Value) -> Self {
        Self {
            id: id.into(),
            content,
            author_id: None,
            created_at: 0,
        }
    }

    #[must_use]
    pub fn authored_by(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }

    /// True when `participant_id` wrote this item.
    #[must_use]
    pub fn is_authored_by(&self, participant_id: &str) -> bool {
        self.author_id.as_deref() == Some(participant_id)
    }
}

/// Someone taking part in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_host: bool,
}

impl Participant {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_host: false,
        }
    }
}

/// The four distribution policies.
///
/// Deserialization is lenient: an unrecognized mode string degrades to
/// [`DistributionMode::OnePerParticipant`] with a logged warning instead of
/// failing the whole config. Use [`str::parse`] for strict parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum DistributionMode {
    #[default]
    OnePerParticipant,
    RoundRobin,
    Random,
    ExcludeOwn,
}

impl DistributionMode {
    pub const ALL: [Self; 4] = [
        Self::OnePerParticipant,
        Self::RoundRobin,
        Self::Random,
        Self::ExcludeOwn,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnePerParticipant => "one-per-participant",
            Self::RoundRobin => "round-robin",
            Self::Random => "random",
            Self::ExcludeOwn => "exclude-own",
        }
    }

    /// Parse a mode, falling back to one-per-participant for unknown input.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|err: ParseError| {
            tracing::warn!(mode = raw, "{err}; falling back to one-per-participant");
            Self::OnePerParticipant
        })
    }
}

impl fmt::Display for DistributionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one-per-participant" => Ok(Self::OnePerParticipant),
            "round-robin" => Ok(Self::RoundRobin),
            "random" => Ok(Self::Random),
            "exclude-own" => Ok(Self::ExcludeOwn),
            _ => Err(ParseError::new(
                EnumKind::DistributionMode,
                s,
                "one-per-participant, round-robin, random, exclude-own",
            )),
        }
    }
}

impl From<String> for DistributionMode {
    fn from(raw: String) -> Self {
        Self::parse_lenient(&raw)
    }
}

/// Policy for when item and participant counts disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchHandling {
    #[default]
    Auto,
    Manual,
    Strict,
}

impl MismatchHandling {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for MismatchHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MismatchHandling {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            "strict" => Ok(Self::Strict),
            _ => Err(ParseError::new(
                EnumKind::MismatchHandling,
                s,
                "auto, manual, strict",
            )),
        }
    }
}

/// Settings for one distribution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionConfig {
    #[serde(default)]
    pub mode: DistributionMode,
    #[serde(default)]
    pub mismatch_handling: MismatchHandling,
    #[serde(default = "default_true")]
    pub exclude_own_responses: bool,
    #[serde(default)]
    pub allow_multiple_per_participant: bool,
    #[serde(default = "default_true")]
    pub allow_empty_assignments: bool,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            mode: DistributionMode::default(),
            mismatch_handling: MismatchHandling::default(),
            exclude_own_responses: default_true(),
            allow_multiple_per_participant: false,
            allow_empty_assignments: default_true(),
        }
    }
}

impl DistributionConfig {
    #[must_use]
    pub fn with_mode(mut self, mode: DistributionMode) -> Self {
        self.mode = mode;
        self
    }
}

const fn default_true() -> bool {
    true
}

/// Bidirectional record of which item went to which participant.
///
/// Produced once per assign action and replaced wholesale on reassign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentMap {
    pub item_assignments: BTreeMap<String, String>,
    pub participant_assignments: BTreeMap<String, Vec<String>>,
    pub created_at: i64,
    pub distribution_mode: DistributionMode,
    pub total_items: usize,
    pub total_participants: usize,
}

impl AssignmentMap {
    /// Empty map tagged with `mode`.
    #[must_use]
    pub fn new(
        mode: DistributionMode,
        total_items: usize,
        total_participants: usize,
        created_at: i64,
    ) -> Self {
        Self {
            item_assignments: BTreeMap::new(),
            participant_assignments: BTreeMap::new(),
            created_at,
            distribution_mode: mode,
            total_items,
            total_participants,
        }
    }

    /// Record `item_id` as handed to `participant_id`, keeping both
    /// directions in sync. An item already assigned elsewhere is moved.
    pub fn assign(&mut self, item_id: &str, participant_id: &str) {
        if let Some(previous) = self
            .item_assignments
            .insert(item_id.to_string(), participant_id.to_string())
            && let Some(list) = self.participant_assignments.get_mut(&previous)
        {
            list.retain(|id| id != item_id);
        }
        self.participant_assignments
            .entry(participant_id.to_string())
            .or_default()
            .push(item_id.to_string());
    }

    /// Register `participant_id` with an empty list if it has none yet.
    pub fn ensure_participant(&mut self, participant_id: &str) {
        self.participant_assignments
            .entry(participant_id.to_string())
            .or_default();
    }

    /// Item ids handed to `participant_id`, in assignment order.
    #[must_use]
    pub fn items_for(&self, participant_id: &str) -> &[String] {
        self.participant_assignments
            .get(participant_id)
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn participant_for(&self, item_id: &str) -> Option<&str> {
        self.item_assignments.get(item_id).map(String::as_str)
    }

    /// Ids from `items` that nobody received.
    #[must_use]
    pub fn unassigned<'a>(&self, items: &'a [Item]) -> Vec<&'a str> {
        items
            .iter()
            .filter(|item| !self.item_assignments.contains_key(&item.id))
            .map(|item| item.id.as_str())
            .collect()
    }

    /// Number of items actually handed out.
    #[must_use]
    pub fn assigned_count(&self) -> usize {
        self.item_assignments.len()
    }

    /// Verify that both directions reference each other exactly once.
    ///
    /// # Errors
    ///
    /// Returns a description of the first orphaned or duplicated reference.
    pub fn check_consistency(&self) -> Result<(), String> {
        let mut seen = BTreeMap::new();
        for (participant, items) in &self.participant_assignments {
            for item in items {
                if let Some(other) = seen.insert(item.as_str(), participant.as_str()) {
                    return Err(format!(
                        "item '{item}' listed for both '{other}' and '{participant}'"
                    ));
                }
                match self.item_assignments.get(item) {
                    Some(owner) if owner == participant => {}
                    Some(owner) => {
                        return Err(format!(
                            "item '{item}' listed for '{participant}' but mapped to '{owner}'"
                        ));
                    }
                    None => {
                        return Err(format!(
                            "item '{item}' listed for '{participant}' but missing from item map"
                        ));
                    }
                }
            }
        }
        if seen.len() != self.item_assignments.len() {
            let orphan = self
                .item_assignments
                .keys()
                .find(|item| !seen.contains_key(item.as_str()))
                .map_or("?", String::as_str);
            return Err(format!("item '{orphan}' mapped but not in any participant list"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mode_display_and_parse() {
        for mode in DistributionMode::ALL {
            let parsed: DistributionMode = mode.to_string().parse().expect("parse");
            assert_eq!(mode, parsed);
        }
    }

    #[test]
    fn unknown_mode_deserializes_to_one_per_participant() {
        let config: DistributionConfig =
            serde_json::from_value(json!({ "mode": "shuffle-everything" })).expect("config");
        assert_eq!(config.mode, DistributionMode::OnePerParticipant);
    }

    #[test]
    fn strict_mode_parse_rejects_unknown() {
        assert!("shuffle".parse::<DistributionMode>().is_err());
        assert!("loose".parse::<MismatchHandling>().is_err());
    }

    #[test]
    fn config_defaults_from_empty_object() {
        let config: DistributionConfig = serde_json::from_value(json!({})).expect("config");
        assert_eq!(config, DistributionConfig::default());
        assert!(config.allow_empty_assignments);
        assert!(!config.allow_multiple_per_participant);
    }

    #[test]
    fn config_uses_camel_case() {
        let value = serde_json::to_value(DistributionConfig::default()).expect("serialize");
        assert_eq!(value["mismatchHandling"], "auto");
        assert_eq!(value["mode"], "one-per-participant");
        assert_eq!(value["allowEmptyAssignments"], true);
    }

    #[test]
    fn item_serializes_author_only_when_present() {
        let anon = serde_json::to_value(Item::new("i1", json!("x"))).expect("serialize");
        assert!(anon.get("authorId").is_none());
        let authored =
            serde_json::to_value(Item::new("i2", json!("y")).authored_by("u1")).expect("serialize");
        assert_eq!(authored["authorId"], "u1");
    }

    #[test]
    fn assign_keeps_both_directions_in_sync() {
        let mut map = AssignmentMap::new(DistributionMode::RoundRobin, 2, 2, 0);
        map.assign("i1", "p1");
        map.assign("i2", "p1");
        map.assign("i1", "p2");

        assert_eq!(map.items_for("p1"), ["i2".to_string()]);
        assert_eq!(map.items_for("p2"), ["i1".to_string()]);
        assert_eq!(map.participant_for("i1"), Some("p2"));
        assert!(map.check_consistency().is_ok());
    }

    #[test]
    fn consistency_check_flags_orphans() {
        let mut map = AssignmentMap::new(DistributionMode::RoundRobin, 1, 1, 0);
        map.item_assignments.insert("i1".into(), "p1".into());
        assert!(map.check_consistency().is_err());

        map.participant_assignments
            .insert("p1".into(), vec!["i1".into()]);
        assert!(map.check_consistency().is_ok());

        map.participant_assignments
            .insert("p2".into(), vec!["i1".into()]);
        assert!(map.check_consistency().is_err());
    }

    #[test]
    fn unassigned_lists_items_nobody_received() {
        let items = vec![Item::new("a", json!(1)), Item::new("b", json!(2))];
        let mut map = AssignmentMap::new(DistributionMode::OnePerParticipant, 2, 1, 0);
        map.assign("a", "p1");
        assert_eq!(map.unassigned(&items), vec!["b"]);
        assert_eq!(map.assigned_count(), 1);
    }
}
