//! Pre-flight feasibility checks for a distribution run.
//!
//! Rules, in order:
//!
//! 1. No items / no participants are errors. Count mismatch checks only run
//!    when both sides are non-empty.
//! 2. More items than participants: an error under `strict` without
//!    `allow_multiple_per_participant`, otherwise a warning.
//! 3. Fewer items than participants: an error under `strict` without
//!    `allow_empty_assignments`, otherwise a warning.
//! 4. `exclude-own` with `exclude_own_responses` only: one aggregate warning
//!    counting participants who authored every item.
//! 5. Any error attaches the generic suggestions.
//!
//! Validation reads its inputs and nothing else; calling it repeatedly is
//! always safe.

use serde::{Deserialize, Serialize};

use huddle_core::model::{DistributionConfig, DistributionMode, Item, MismatchHandling, Participant};

use crate::policy::eligible_count;

pub const NO_ITEMS: &str = "No items available for distribution";
pub const NO_PARTICIPANTS: &str = "No participants available for distribution";

/// Attached to every invalid result.
pub const SUGGESTIONS: [&str; 3] = [
    "Try a different distribution mode",
    "Adjust the mismatch handling setting",
    "Collect more items before distributing",
];

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Check whether `items` can be distributed to `participants` under `config`.
#[must_use]
pub fn validate(
    items: &[Item],
    participants: &[Participant],
    config: &DistributionConfig,
) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let item_count = items.len();
    let participant_count = participants.len();
    let strict = config.mismatch_handling == MismatchHandling::Strict;

    if item_count == 0 {
        errors.push(NO_ITEMS.to_string());
    }
    if participant_count == 0 {
        errors.push(NO_PARTICIPANTS.to_string());
    }

    if item_count > 0 && participant_count > 0 {
        if item_count > participant_count {
            if strict && !config.allow_multiple_per_participant {
                errors.push(format!(
                    "Strict mode: {item_count} items but only {participant_count} participants. \
                     Enable \"allow multiple per participant\" to distribute every item."
                ));
            } else {
                warnings.push(format!(
                    "{item_count} items for {participant_count} participants: \
                     some participants will receive multiple items"
                ));
            }
        } else if item_count < participant_count {
            if strict && !config.allow_empty_assignments {
                errors.push(format!(
                    "Strict mode: only {item_count} items for {participant_count} participants. \
                     Enable \"allow empty assignments\" to let some participants go without an item."
                ));
            } else {
                warnings.push(format!(
                    "{item_count} items for {participant_count} participants: \
                     some participants will not receive an item"
                ));
            }
        }

        if config.mode == DistributionMode::ExcludeOwn && config.exclude_own_responses {
            let stranded = participants
                .iter()
                .filter(|participant| eligible_count(items, participant) == 0)
                .count();
            if stranded > 0 {
                warnings.push(format!(
                    "{stranded} participant(s) have no eligible items because every item is their own"
                ));
            }
        }
    }

    let valid = errors.is_empty();
    if !valid {
        tracing::debug!(errors = errors.len(), "distribution config rejected");
    }

    ValidationResult {
        valid,
        errors,
        warnings,
        suggestions: (!valid).then(|| SUGGESTIONS.iter().map(|s| (*s).to_string()).collect()),
    }
}
