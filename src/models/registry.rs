//! Static model-profile table: which generation parameters each model accepts.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::capabilities::{ParameterKey, ParameterSet};

/// Named parameter groups profiles are composed from.
pub mod groups {
    use super::ParameterKey::*;
    use super::ParameterSet;

    pub fn core() -> ParameterSet {
        ParameterSet::of(&[MaxTokens, Stop, Seed, User])
    }

    pub fn sampling() -> ParameterSet {
        ParameterSet::of(&[Temperature, TopP])
    }

    pub fn extended_sampling() -> ParameterSet {
        sampling().union(ParameterSet::of(&[TopK, MinP]))
    }

    pub fn penalties() -> ParameterSet {
        ParameterSet::of(&[PresencePenalty, FrequencyPenalty])
    }

    pub fn tooling() -> ParameterSet {
        ParameterSet::of(&[Tools, ToolChoice, ParallelToolCalls])
    }

    pub fn structured() -> ParameterSet {
        ParameterSet::of(&[ResponseFormat])
    }

    pub fn reasoning() -> ParameterSet {
        ParameterSet::of(&[ReasoningEffort])
    }

    pub fn logprobs() -> ParameterSet {
        ParameterSet::of(&[Logprobs, TopLogprobs])
    }
}

/// Result of a capability lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSupport<'a> {
    /// Unknown profile: no filtering is applied.
    All,
    /// Known profile with its accepted parameter set.
    Only(&'a ParameterSet),
}

impl ParameterSupport<'_> {
    pub fn allows(&self, key: ParameterKey) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(key),
        }
    }
}

/// Maps model identifiers to the parameters they accept.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    profiles: HashMap<String, ParameterSet>,
}

impl CapabilityRegistry {
    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder::default()
    }

    /// Shared registry with the built-in profiles.
    pub fn builtin() -> &'static CapabilityRegistry {
        static BUILTIN: OnceLock<CapabilityRegistry> = OnceLock::new();
        BUILTIN.get_or_init(builtin_profiles)
    }

    /// Parameters accepted by `profile`; unknown profiles are not filtered.
    pub fn supported_parameters(&self, profile: &str) -> ParameterSupport<'_> {
        match self.profiles.get(profile) {
            Some(set) => ParameterSupport::Only(set),
            None => ParameterSupport::All,
        }
    }

    pub fn contains_profile(&self, profile: &str) -> bool {
        self.profiles.contains_key(profile)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

/// Builder for a [`CapabilityRegistry`].
#[derive(Debug, Default)]
pub struct CapabilityRegistryBuilder {
    profiles: HashMap<String, ParameterSet>,
}

impl CapabilityRegistryBuilder {
    /// Register (or replace) a profile.
    pub fn profile(mut self, id: impl Into<String>, params: ParameterSet) -> Self {
        self.profiles.insert(id.into(), params);
        self
    }

    /// Register several profile ids sharing one parameter set.
    pub fn profiles(mut self, ids: &[&str], params: ParameterSet) -> Self {
        for id in ids {
            self.profiles.insert((*id).to_string(), params);
        }
        self
    }

    pub fn build(self) -> CapabilityRegistry {
        CapabilityRegistry {
            profiles: self.profiles,
        }
    }
}

fn builtin_profiles() -> CapabilityRegistry {
    use groups::*;

    let chat = core()
        .union(sampling())
        .union(penalties())
        .union(tooling())
        .union(structured());
    let chat_full = chat.union(logprobs());
    // Reasoning models reject sampling knobs and logprobs.
    let reasoning_models = core()
        .union(tooling())
        .union(structured())
        .union(reasoning())
        .without(ParameterKey::Stop);
    let open_weights = core()
        .union(extended_sampling())
        .union(penalties())
        .with(ParameterKey::RepetitionPenalty)
        .union(tooling())
        .union(structured())
        .union(logprobs());
    let open_weights_reasoning = open_weights
        .union(reasoning())
        .difference(logprobs());
    let lite = core()
        .union(sampling())
        .union(tooling())
        .without(ParameterKey::ParallelToolCalls);

    CapabilityRegistry::builder()
        .profiles(&["gpt-4o", "gpt-4o-mini", "gpt-4.1", "gpt-4.1-mini"], chat_full)
        .profiles(&["gpt-4.1-nano", "gpt-4-turbo"], chat)
        .profiles(&["o1", "o3", "o3-mini", "o4-mini", "gpt-5", "gpt-5-mini"], reasoning_models)
        .profiles(
            &["llama-3.3-70b", "llama-3.1-8b", "mistral-large", "qwen-2.5-72b"],
            open_weights,
        )
        .profiles(&["deepseek-r1", "qwen-qwq-32b"], open_weights_reasoning)
        .profiles(&["gemma-2-9b", "phi-3-mini"], lite)
        .build()
}
