//! Normalizes skill output into a reply and drives stream emission.
//!
//! The skill's declared streaming flag decides delivery, not the shape of
//! its output:
//!
//! | declared      | output   | delivery                                   |
//! |---------------|----------|--------------------------------------------|
//! | non-streaming | `Single` | reply value                                |
//! | non-streaming | `Stream` | stream collected into one array reply      |
//! | streaming     | `Stream` | one `Stream` event per element, in order   |
//! | streaming     | `Single` | one `Stream` event                         |
//!
//! Streaming delivery never produces a reply value, so no `Result` event
//! follows it.

use crate::agent::{SkillOutput, SkillReply};
use crate::errors::{AgentError, AgentResult};
use crate::runtime::core::sink::{DispatchEvent, EventSink};
use futures::{StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::debug;

pub struct StreamingAdapter;

impl StreamingAdapter {
    /// Delivers `output` according to `is_streaming`.
    ///
    /// # Errors
    ///
    /// Returns the first error the stream yields, after which nothing more is
    /// pulled from it, or [`AgentError::Cancelled`] if the sink closes.
    pub async fn deliver(
        is_streaming: bool,
        output: SkillOutput,
        sink: &dyn EventSink,
    ) -> AgentResult<SkillReply> {
        match (is_streaming, output) {
            (false, SkillOutput::Single(value)) => Ok(SkillReply::Value(value)),
            (false, SkillOutput::Stream(stream)) => {
                let items: Vec<Value> = stream.try_collect().await?;
                Ok(SkillReply::Value(Value::Array(items)))
            }
            (true, SkillOutput::Single(value)) => {
                Self::emit_chunk(sink, value, 0).await?;
                Ok(SkillReply::Streamed { chunks: 1 })
            }
            (true, SkillOutput::Stream(mut stream)) => {
                let mut chunks = 0;
                while let Some(item) = stream.next().await {
                    Self::emit_chunk(sink, item?, chunks).await?;
                    chunks += 1;
                }
                debug!(chunks, "stream exhausted");
                Ok(SkillReply::Streamed { chunks })
            }
        }
    }

    async fn emit_chunk(sink: &dyn EventSink, value: Value, index: usize) -> AgentResult<()> {
        if sink.emit(DispatchEvent::Stream(value)).await {
            Ok(())
        } else {
            debug!(chunk = index, "event sink closed, abandoning stream");
            Err(AgentError::Cancelled {
                reason: "event sink closed".to_string(),
            })
        }
    }
}
