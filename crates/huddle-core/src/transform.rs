//! Named views over a resolved collection.
//!
//! | kind       | sequence                   | mapping                    | null / scalar |
//! |------------|----------------------------|----------------------------|---------------|
//! | `all`      | unchanged                  | unchanged                  | unchanged     |
//! | `mine`     | `authorId == caller`       | key owned by caller        | `[]`          |
//! | `count`    | length                     | key count                  | `0`           |
//! | `not-mine` | `authorId != caller`       | key not owned by caller    | `[]`          |
//!
//! A mapping key is owned by the caller when it equals the caller id or its
//! submission author (everything before the last hyphen) does. An empty
//! caller owns nothing.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EnumKind, ParseError};
use crate::resolve;

/// Which view to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transformer {
    #[default]
    All,
    Mine,
    Count,
    NotMine,
}

impl Transformer {
    pub const ALL: [Self; 4] = [Self::All, Self::Mine, Self::Count, Self::NotMine];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Mine => "mine",
            Self::Count => "count",
            Self::NotMine => "not-mine",
        }
    }
}

impl fmt::Display for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transformer {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "mine" => Ok(Self::Mine),
            "count" => Ok(Self::Count),
            "not-mine" | "notmine" => Ok(Self::NotMine),
            _ => Err(ParseError::new(
                EnumKind::Transformer,
                s,
                "all, mine, count, not-mine",
            )),
        }
    }
}

/// Apply `kind` to `value` from the point of view of `caller_id`.
///
/// `None` is treated like JSON `null`.
#[must_use]
pub fn apply(value: Option<&Value>, kind: Transformer, caller_id: &str) -> Value {
    match kind {
        Transformer::All => value.cloned().unwrap_or(Value::Null),
        Transformer::Count => Value::from(count(value)),
        Transformer::Mine => filter(value, caller_id, true),
        Transformer::NotMine => filter(value, caller_id, false),
    }
}

/// Number of members in a collection; zero for anything else.
#[must_use]
pub fn count(value: Option<&Value>) -> usize {
    match value {
        Some(Value::Array(items)) => items.len(),
        Some(Value::Object(entries)) => entries.len(),
        _ => 0,
    }
}

fn filter(value: Option<&Value>, caller_id: &str, keep_mine: bool) -> Value {
    match value {
        Some(Value::Array(items)) => Value::Array(
            items
                .iter()
                .filter(|item| is_authored_by(item, caller_id) == keep_mine)
                .cloned()
                .collect(),
        ),
        Some(Value::Object(entries)) => Value::Object(
            entries
                .iter()
                .filter(|(key, _)| is_owned_key(key, caller_id) == keep_mine)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<Map<String, Value>>(),
        ),
        _ => Value::Array(Vec::new()),
    }
}

fn is_authored_by(item: &Value, caller_id: &str) -> bool {
    item.get("authorId").and_then(Value::as_str) == Some(caller_id)
}

/// A mapping key belongs to `caller_id` when it is the caller's id itself
/// (assignments) or a submission key whose author is the caller.
fn is_owned_key(key: &str, caller_id: &str) -> bool {
    !caller_id.is_empty()
        && (key == caller_id || resolve::submission_author(key) == Some(caller_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items() -> Value {
        json!([
            { "id": "1", "content": "a", "authorId": "u1" },
            { "id": "2", "content": "b", "authorId": "u2" },
            { "id": "3", "content": "c", "authorId": "u1" },
            { "id": "4", "content": "d" },
        ])
    }

    #[test]
    fn all_is_passthrough_including_null() {
        let v = items();
        assert_eq!(apply(Some(&v), Transformer::All, "u1"), v);
        assert_eq!(apply(None, Transformer::All, "u1"), Value::Null);
        assert_eq!(apply(Some(&Value::Null), Transformer::All, "u1"), Value::Null);
    }

    #[test]
    fn mine_filters_sequence_by_author() {
        let mine = apply(Some(&items()), Transformer::Mine, "u1");
        let ids: Vec<_> = mine
            .as_array()
            .expect("array")
            .iter()
            .map(|i| i["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("1"), json!("3")]);
    }

    #[test]
    fn not_mine_keeps_unauthored_items() {
        let others = apply(Some(&items()), Transformer::NotMine, "u1");
        assert_eq!(others.as_array().expect("array").len(), 2);
    }

    #[test]
    fn mapping_filters_by_owner() {
        let v = json!({ "u1-a": "x", "u2-b": "y", "u1-c": "z" });
        assert_eq!(
            apply(Some(&v), Transformer::Mine, "u1"),
            json!({ "u1-a": "x", "u1-c": "z" })
        );
        assert_eq!(
            apply(Some(&v), Transformer::NotMine, "u1"),
            json!({ "u2-b": "y" })
        );
        assert_eq!(apply(Some(&v), Transformer::Count, "u1"), json!(3));
    }

    #[test]
    fn mapping_ownership_is_exact_not_prefix() {
        let v = json!({ "u1-a": "x", "u12-b": "y", "u1": ["i1"] });
        assert_eq!(
            apply(Some(&v), Transformer::Mine, "u1"),
            json!({ "u1-a": "x", "u1": ["i1"] })
        );
        assert_eq!(
            apply(Some(&v), Transformer::NotMine, "u1"),
            json!({ "u12-b": "y" })
        );
    }

    #[test]
    fn mapping_and_sequence_views_agree_on_author() {
        let mapping = json!({ "mock-1-q1": "a", "mock-10-q1": "b" });
        let sequence = json!([
            { "id": "1", "authorId": "mock-1" },
            { "id": "2", "authorId": "mock-10" },
        ]);
        assert_eq!(count(Some(&apply(Some(&mapping), Transformer::Mine, "mock-1"))), 1);
        assert_eq!(count(Some(&apply(Some(&sequence), Transformer::Mine, "mock-1"))), 1);
    }

    #[test]
    fn empty_caller_owns_nothing() {
        let v = json!({ "u1-a": "x", "u2-b": "y" });
        assert_eq!(apply(Some(&v), Transformer::Mine, ""), json!({}));
        assert_eq!(apply(Some(&v), Transformer::NotMine, ""), v);
    }

    #[test]
    fn null_input_yields_empty_views() {
        assert_eq!(apply(None, Transformer::Mine, "u1"), json!([]));
        assert_eq!(apply(None, Transformer::NotMine, "u1"), json!([]));
        assert_eq!(apply(None, Transformer::Count, "u1"), json!(0));
    }

    #[test]
    fn count_of_sequence_is_length() {
        assert_eq!(apply(Some(&items()), Transformer::Count, "anyone"), json!(4));
    }

    #[test]
    fn transformer_serde_is_kebab_case() {
        assert_eq!(
            serde_json::to_value(Transformer::NotMine).expect("serialize"),
            json!("not-mine")
        );
        for kind in Transformer::ALL {
            assert_eq!(kind.as_str().parse::<Transformer>().expect("parse"), kind);
        }
    }
}
