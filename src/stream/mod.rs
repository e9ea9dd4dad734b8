//! Wire stream parsing.

pub mod parser;
pub mod wire;

pub use parser::{parse_stream, MalformedRecordPolicy, StreamChannel, StreamParser};

use futures::stream::BoxStream;

use crate::error::WeaveError;
use crate::types::StreamEvent;

/// Ordered event stream produced from one response.
pub type EventStream = BoxStream<'static, Result<StreamEvent, WeaveError>>;
