//! Reference resolution against a session snapshot.
//!
//! Two reference shapes share one entry point, [`Resolver::resolve`]:
//!
//! - [`StructuredReference`] names a namespace, an [`Accessor`] and a
//!   [`Transformer`]. Misses resolve to `{}`.
//! - A path string is looked up at the root first (raw value, no
//!   transformer), then walked as a dotted path, then, as a deprecated
//!   fallback, searched for inside every namespace. Misses resolve to `[]`.
//!
//! Keyed submission collections (`{"u1-a": .., "u2-b": ..}`) reached through
//! a path string come back as item records whose ids are derived from the
//! key, so resolving the same source twice yields the same ids.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::ReferenceError;
use crate::state::{self, Accessor, PHASE_KEY, Snapshot};
use crate::transform::{self, Transformer};

/// Log target for deprecated lookups, so they can be filtered separately.
pub const DEPRECATION_TARGET: &str = "huddle::deprecation";

/// `{namespaceId, accessor, transformer}` as stored in a block's config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredReference {
    pub namespace_id: String,
    pub accessor: Accessor,
    #[serde(default)]
    pub transformer: Transformer,
}

impl StructuredReference {
    #[must_use]
    pub fn new(namespace_id: impl Into<String>, accessor: Accessor, transformer: Transformer) -> Self {
        Self {
            namespace_id: namespace_id.into(),
            accessor,
            transformer,
        }
    }
}

impl fmt::Display for StructuredReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace_id, self.accessor, self.transformer)
    }
}

/// Either reference shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataReference {
    Structured(StructuredReference),
    Path(String),
}

impl From<StructuredReference> for DataReference {
    fn from(reference: StructuredReference) -> Self {
        Self::Structured(reference)
    }
}

impl From<&str> for DataReference {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl FromStr for DataReference {
    type Err = ReferenceError;

    /// `slide-1/responses[/count]` parses as structured; anything without a
    /// slash is a path reference.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.contains('/') {
            return Ok(Self::Path(s.to_string()));
        }
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [ns, accessor] if !ns.is_empty() => Ok(Self::Structured(StructuredReference::new(
                *ns,
                accessor.parse()?,
                Transformer::All,
            ))),
            [ns, accessor, transformer] if !ns.is_empty() => {
                Ok(Self::Structured(StructuredReference::new(
                    *ns,
                    accessor.parse()?,
                    transformer.parse()?,
                )))
            }
            _ => Err(ReferenceError::Malformed(s.to_string())),
        }
    }
}

impl fmt::Display for DataReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(reference) => fmt::Display::fmt(reference, f),
            Self::Path(path) => f.write_str(path),
        }
    }
}

/// Who is asking, and against which snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub snapshot: &'a Snapshot,
    pub caller_id: &'a str,
    pub is_host: bool,
}

impl<'a> ResolveContext<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a Snapshot, caller_id: &'a str) -> Self {
        Self {
            snapshot,
            caller_id,
            is_host: false,
        }
    }

    #[must_use]
    pub const fn as_host(mut self) -> Self {
        self.is_host = true;
        self
    }
}

/// Receives notices about deprecated reference lookups.
pub trait DeprecationNotices {
    /// `reference` was only found by searching inside `namespace_id`.
    fn legacy_lookup(&self, reference: &str, namespace_id: &str);
}

/// Emits the first deprecation notice as a `warn!` on
/// [`DEPRECATION_TARGET`]; later ones drop to `debug!`.
#[derive(Debug, Default)]
pub struct TracingNotices {
    warned: Cell<bool>,
}

impl TracingNotices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the one-time warning has been emitted.
    #[must_use]
    pub fn has_warned(&self) -> bool {
        self.warned.get()
    }
}

impl DeprecationNotices for TracingNotices {
    fn legacy_lookup(&self, reference: &str, namespace_id: &str) {
        if self.warned.replace(true) {
            tracing::debug!(
                target: DEPRECATION_TARGET,
                reference,
                namespace = namespace_id,
                "legacy namespace lookup"
            );
        } else {
            tracing::warn!(
                target: DEPRECATION_TARGET,
                reference,
                namespace = namespace_id,
                "DEPRECATED: bare reference resolved by searching slide namespaces; \
                 use a structured reference or a dotted path instead"
            );
        }
    }
}

/// Resolves references and applies transformers. Never mutates the snapshot.
#[derive(Debug)]
pub struct Resolver<N = TracingNotices> {
    notices: N,
    legacy_search: bool,
    epoch_ms: i64,
}

impl Resolver<TracingNotices> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_notices(TracingNotices::new())
    }
}

impl Default for Resolver<TracingNotices> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: DeprecationNotices> Resolver<N> {
    /// Resolver reporting deprecated lookups to `notices`.
    ///
    /// Synthesized items carry the construction time as `createdAt`.
    #[must_use]
    pub fn with_notices(notices: N) -> Self {
        Self {
            notices,
            legacy_search: true,
            epoch_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Enable or disable the deprecated namespace search for bare names.
    #[must_use]
    pub fn legacy_search(mut self, enabled: bool) -> Self {
        self.legacy_search = enabled;
        self
    }

    /// Pin the `createdAt` stamped on synthesized items.
    #[must_use]
    pub fn epoch_ms(mut self, epoch_ms: i64) -> Self {
        self.epoch_ms = epoch_ms;
        self
    }

    #[must_use]
    pub const fn notices(&self) -> &N {
        &self.notices
    }

    /// Resolve either reference shape. Misses never fail.
    #[must_use]
    pub fn resolve(&self, reference: &DataReference, ctx: &ResolveContext<'_>) -> Value {
        match reference {
            DataReference::Structured(reference) => self.resolve_structured(reference, ctx),
            DataReference::Path(path) => self.resolve_path(path, ctx),
        }
    }

    /// Look up `snapshot[namespace][accessor]` and apply the transformer.
    #[must_use]
    pub fn resolve_structured(
        &self,
        reference: &StructuredReference,
        ctx: &ResolveContext<'_>,
    ) -> Value {
        let Some(ns) = state::namespace(ctx.snapshot, &reference.namespace_id) else {
            tracing::debug!(namespace = %reference.namespace_id, "namespace not found");
            return Value::Object(Map::new());
        };
        let Some(raw) = ns.get(reference.accessor.as_str()) else {
            tracing::debug!(
                namespace = %reference.namespace_id,
                accessor = %reference.accessor,
                "accessor not populated"
            );
            return Value::Object(Map::new());
        };
        transform::apply(Some(raw), reference.transformer, ctx.caller_id)
    }

    /// Resolve a bare or dotted name. No transformer is applied.
    #[must_use]
    pub fn resolve_path(&self, path: &str, ctx: &ResolveContext<'_>) -> Value {
        if let Some(raw) = ctx.snapshot.get(path) {
            return self.into_items(raw);
        }

        if path.contains('.') {
            return walk(ctx.snapshot, path).map_or_else(empty_sequence, |raw| self.into_items(raw));
        }

        if self.legacy_search
            && let Some((namespace_id, raw)) = search_namespaces(ctx.snapshot, path)
        {
            self.notices.legacy_lookup(path, namespace_id);
            return self.into_items(raw);
        }

        tracing::debug!(reference = path, "reference did not match anything");
        empty_sequence()
    }

    /// Convert a keyed submission collection into item records; clone
    /// anything else unchanged.
    fn into_items(&self, raw: &Value) -> Value {
        match raw {
            Value::Object(entries) if is_submission_collection(entries) => Value::Array(
                entries
                    .iter()
                    .map(|(key, content)| submission_item(key, content, self.epoch_ms))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Stable item id for a submission key.
#[must_use]
pub fn submission_item_id(key: &str) -> String {
    let digest = blake3::hash(key.as_bytes()).to_hex();
    format!("item-{}", &digest.as_str()[..16])
}

/// Author encoded in a submission key: everything before the last hyphen.
#[must_use]
pub fn submission_author(key: &str) -> Option<&str> {
    key.rsplit_once('-')
        .filter(|(author, suffix)| !author.is_empty() && !suffix.is_empty())
        .map(|(author, _)| author)
}

/// True when every key has the `<author>-<suffix>` shape.
#[must_use]
pub fn is_submission_collection(entries: &Map<String, Value>) -> bool {
    !entries.is_empty() && entries.keys().all(|key| submission_author(key).is_some())
}

fn submission_item(key: &str, content: &Value, created_at: i64) -> Value {
    let mut item = json!({
        "id": submission_item_id(key),
        "content": content,
        "createdAt": created_at,
    });
    if let (Some(author), Some(fields)) = (submission_author(key), item.as_object_mut()) {
        fields.insert("authorId".to_string(), Value::from(author));
    }
    item
}

fn walk<'a>(snapshot: &'a Snapshot, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = snapshot.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(entries) => entries.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// First `name` found directly in a namespace or inside one of its
/// accessor collections. Namespaces are visited in key order.
fn search_namespaces<'a>(snapshot: &'a Snapshot, name: &str) -> Option<(&'a str, &'a Value)> {
    snapshot
        .iter()
        .filter(|(key, _)| key.as_str() != PHASE_KEY && !Accessor::is_accessor_name(key))
        .filter_map(|(key, value)| value.as_object().map(|ns| (key.as_str(), ns)))
        .find_map(|(key, ns)| {
            ns.get(name)
                .or_else(|| {
                    Accessor::ALL
                        .iter()
                        .filter_map(|accessor| ns.get(accessor.as_str()).and_then(Value::as_object))
                        .find_map(|collection| collection.get(name))
                })
                .map(|found| (key, found))
        })
}

fn empty_sequence() -> Value {
    Value::Array(Vec::new())
}
