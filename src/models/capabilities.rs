//! Generation parameter keys, their wire definitions, and parameter sets.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator};

/// Identity of a generation parameter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParameterKey {
    Temperature,
    TopP,
    TopK,
    MinP,
    MaxTokens,
    PresencePenalty,
    FrequencyPenalty,
    RepetitionPenalty,
    Seed,
    Stop,
    Tools,
    ToolChoice,
    ParallelToolCalls,
    ResponseFormat,
    ReasoningEffort,
    Logprobs,
    TopLogprobs,
    User,
}

/// How a parameter value is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Number,
    Integer,
    Boolean,
    Text,
    Json,
}

/// Wire definition of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterDefinition {
    pub key: ParameterKey,
    pub wire_name: &'static str,
    pub kind: ParameterKind,
}

const fn def(key: ParameterKey, wire_name: &'static str, kind: ParameterKind) -> ParameterDefinition {
    ParameterDefinition {
        key,
        wire_name,
        kind,
    }
}

/// Process-wide parameter table, indexed by `ParameterKey as usize`.
static DEFINITIONS: [ParameterDefinition; ParameterKey::COUNT] = [
    def(ParameterKey::Temperature, "temperature", ParameterKind::Number),
    def(ParameterKey::TopP, "top_p", ParameterKind::Number),
    def(ParameterKey::TopK, "top_k", ParameterKind::Integer),
    def(ParameterKey::MinP, "min_p", ParameterKind::Number),
    def(ParameterKey::MaxTokens, "max_tokens", ParameterKind::Integer),
    def(ParameterKey::PresencePenalty, "presence_penalty", ParameterKind::Number),
    def(ParameterKey::FrequencyPenalty, "frequency_penalty", ParameterKind::Number),
    def(ParameterKey::RepetitionPenalty, "repetition_penalty", ParameterKind::Number),
    def(ParameterKey::Seed, "seed", ParameterKind::Integer),
    def(ParameterKey::Stop, "stop", ParameterKind::Json),
    def(ParameterKey::Tools, "tools", ParameterKind::Json),
    def(ParameterKey::ToolChoice, "tool_choice", ParameterKind::Json),
    def(ParameterKey::ParallelToolCalls, "parallel_tool_calls", ParameterKind::Boolean),
    def(ParameterKey::ResponseFormat, "response_format", ParameterKind::Json),
    def(ParameterKey::ReasoningEffort, "reasoning_effort", ParameterKind::Text),
    def(ParameterKey::Logprobs, "logprobs", ParameterKind::Boolean),
    def(ParameterKey::TopLogprobs, "top_logprobs", ParameterKind::Integer),
    def(ParameterKey::User, "user", ParameterKind::Text),
];

impl ParameterKey {
    /// Wire definition for this key.
    pub fn definition(self) -> &'static ParameterDefinition {
        &DEFINITIONS[self as usize]
    }

    pub fn wire_name(self) -> &'static str {
        self.definition().wire_name
    }

    pub fn kind(self) -> ParameterKind {
        self.definition().kind
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// Immutable set of parameter keys with set-algebra helpers.
///
/// ```
/// use weave::models::{ParameterKey, ParameterSet};
///
/// let sampling = ParameterSet::of(&[ParameterKey::Temperature, ParameterKey::TopP]);
/// let without_top_p = sampling.without(ParameterKey::TopP);
/// assert!(without_top_p.contains(ParameterKey::Temperature));
/// assert!(!without_top_p.contains(ParameterKey::TopP));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ParameterSet(u32);

impl ParameterSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every known parameter.
    pub fn all() -> Self {
        ParameterKey::iter().collect()
    }

    pub fn of(keys: &[ParameterKey]) -> Self {
        keys.iter().copied().collect()
    }

    pub fn contains(&self, key: ParameterKey) -> bool {
        self.0 & key.bit() != 0
    }

    pub fn with(self, key: ParameterKey) -> Self {
        Self(self.0 | key.bit())
    }

    pub fn without(self, key: ParameterKey) -> Self {
        Self(self.0 & !key.bit())
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = ParameterKey> + '_ {
        ParameterKey::iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<ParameterKey> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = ParameterKey>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl fmt::Debug for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_are_indexed_by_key() {
        for key in ParameterKey::iter() {
            assert_eq!(key.definition().key, key);
        }
        assert_eq!(ParameterKey::MaxTokens.wire_name(), "max_tokens");
        assert_eq!(ParameterKey::Stop.kind(), ParameterKind::Json);
    }

    #[test]
    fn set_algebra() {
        let a = ParameterSet::of(&[ParameterKey::Temperature, ParameterKey::Seed]);
        let b = ParameterSet::of(&[ParameterKey::Seed, ParameterKey::User]);

        assert_eq!(a.union(b).len(), 3);
        assert_eq!(a.intersection(b), ParameterSet::of(&[ParameterKey::Seed]));
        assert_eq!(a.difference(b), ParameterSet::of(&[ParameterKey::Temperature]));
        assert!(ParameterSet::empty().is_empty());
        assert_eq!(ParameterSet::all().len(), ParameterKey::COUNT);
    }

    #[test]
    fn keys_parse_from_snake_case() {
        let key: ParameterKey = "top_logprobs".parse().unwrap();
        assert_eq!(key, ParameterKey::TopLogprobs);
        assert_eq!(ParameterKey::ParallelToolCalls.to_string(), "parallel_tool_calls");
    }
}
