use std::fmt;

/// Failure to parse one of the closed string enumerations
/// (accessor, transformer, distribution mode, mismatch handling).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseError {
    /// Which enumeration was being parsed.
    pub kind: EnumKind,
    /// The rejected input.
    pub value: String,
    /// Comma-separated list of accepted spellings.
    pub expected: &'static str,
}

impl ParseError {
    #[must_use]
    pub fn new(kind: EnumKind, value: impl Into<String>, expected: &'static str) -> Self {
        Self {
            kind,
            value: value.into(),
            expected,
        }
    }
}

/// The enumerations that can fail to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumKind {
    Accessor,
    Transformer,
    DistributionMode,
    MismatchHandling,
}

impl fmt::Display for EnumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Accessor => "accessor",
            Self::Transformer => "transformer",
            Self::DistributionMode => "distribution mode",
            Self::MismatchHandling => "mismatch handling",
        };
        f.write_str(label)
    }
}

/// Failure to parse a compact reference such as `slide-1/responses/count`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("reference '{0}' must have the form <namespace>/<accessor>[/<transformer>]")]
    Malformed(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
}
