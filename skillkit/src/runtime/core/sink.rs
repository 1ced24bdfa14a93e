//! Event delivery from the executor to the transport adapter.

use crate::compat::channel::{Sender, UnboundedSender};
use crate::compat::{MaybeSend, MaybeSync};
use crate::runtime::core::error_mapper::ErrorEnvelope;
use serde_json::Value;
use std::sync::Mutex;

/// One event emitted for an invocation.
///
/// A non-streaming skill produces exactly one `Result`; a streaming skill
/// produces zero or more `Stream` events and is finished when the sink is no
/// longer written to.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    Result(Value),
    Stream(Value),
    Error(ErrorEnvelope),
}

impl DispatchEvent {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Receives dispatch events.
#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
pub trait EventSink: MaybeSend + MaybeSync {
    /// Delivers one event. Returns `false` once the receiving side is gone,
    /// which stops any stream being driven into this sink.
    async fn emit(&self, event: DispatchEvent) -> bool;
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl EventSink for Sender<DispatchEvent> {
    async fn emit(&self, event: DispatchEvent) -> bool {
        self.send(event).await.is_ok()
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl EventSink for UnboundedSender<DispatchEvent> {
    async fn emit(&self, event: DispatchEvent) -> bool {
        self.send(event).is_ok()
    }
}

/// Buffers events in memory, optionally closing after a fixed number.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<DispatchEvent>>,
    capacity: Option<usize>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `capacity` events, then reports itself closed.
    #[must_use]
    pub fn closing_after(capacity: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            capacity: Some(capacity),
        }
    }

    /// Returns and clears everything collected so far.
    pub fn take(&self) -> Vec<DispatchEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

#[cfg_attr(all(target_os = "wasi", target_env = "p1"), async_trait::async_trait(?Send))]
#[cfg_attr(
    not(all(target_os = "wasi", target_env = "p1")),
    async_trait::async_trait
)]
impl EventSink for CollectingSink {
    async fn emit(&self, event: DispatchEvent) -> bool {
        let Ok(mut events) = self.events.lock() else {
            return false;
        };
        if self.capacity.is_some_and(|cap| events.len() >= cap) {
            return false;
        }
        events.push(event);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::channel;
    use serde_json::json;

    #[tokio::test]
    async fn channel_sink_reports_closed_receiver() {
        let (tx, mut rx) = channel::channel(4);
        assert!(tx.emit(DispatchEvent::Stream(json!(1))).await);
        assert_eq!(rx.recv().await, Some(DispatchEvent::Stream(json!(1))));

        drop(rx);
        assert!(!tx.emit(DispatchEvent::Stream(json!(2))).await);
    }

    #[tokio::test]
    async fn collecting_sink_closes_at_capacity() {
        let sink = CollectingSink::closing_after(1);
        assert!(sink.emit(DispatchEvent::Result(json!("a"))).await);
        assert!(!sink.emit(DispatchEvent::Result(json!("b"))).await);
        assert_eq!(sink.take(), vec![DispatchEvent::Result(json!("a"))]);
    }
}
