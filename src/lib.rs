//! Weave — streaming tool-calling chat client.
//!
//! Parses a chat service's incremental response stream into ordered events,
//! reassembles tool calls that arrive in fragments, filters generation
//! parameters by model capability, and drives the "model calls tools, tools
//! produce results, model continues" loop.
//!
//! # Quick Start
//!
//! ```no_run
//! use weave::prelude::*;
//!
//! # async fn example() -> weave::Result<()> {
//! let config = WeaveConfig::load(None)?;
//! let weather = ToolDefinition::from_fn(
//!     "get_weather",
//!     "Current weather for a city",
//!     ToolParameters::object().string("city", "City name", true).build(),
//!     |args, _ctx| async move {
//!         let city = args.get_str("city")?;
//!         Ok(serde_json::json!({ "city": city, "temp_c": 21 }))
//!     },
//! )?;
//! let agent = Agent::from_config(&config, vec![weather])?;
//! let result = agent.run(vec![ChatMessage::user("Weather in Paris?")]).await?;
//! println!("{}", result.text);
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod prelude;
pub mod provider;
pub mod stream;
pub mod tools;
pub mod types;
pub mod util;

pub use error::{Result, WeaveError};
