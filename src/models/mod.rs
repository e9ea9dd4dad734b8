//! Model profiles and the parameters they accept.

pub mod capabilities;
pub mod registry;

pub use capabilities::{ParameterDefinition, ParameterKey, ParameterKind, ParameterSet};
pub use registry::{CapabilityRegistry, CapabilityRegistryBuilder, ParameterSupport};
