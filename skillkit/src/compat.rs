//! Thread-safety bounds that relax on single-threaded WASI P1.
//!
//! Skill handlers, middleware and stores are `Send + Sync` on native targets
//! so the executor can run on a multi-threaded runtime. On `wasm32-wasip1`
//! the bounds disappear and the async traits switch to `?Send`.

use futures::Stream;
use std::pin::Pin;

#[cfg(not(all(target_os = "wasi", target_env = "p1")))]
mod bounds {
    pub trait MaybeSend: Send {}
    impl<T: Send + ?Sized> MaybeSend for T {}

    pub trait MaybeSync: Sync {}
    impl<T: Sync + ?Sized> MaybeSync for T {}
}

#[cfg(all(target_os = "wasi", target_env = "p1"))]
mod bounds {
    pub trait MaybeSend {}
    impl<T: ?Sized> MaybeSend for T {}

    pub trait MaybeSync {}
    impl<T: ?Sized> MaybeSync for T {}
}

pub use bounds::{MaybeSend, MaybeSync};

/// The lazy sequence a streaming skill hands to the executor.
#[cfg(not(all(target_os = "wasi", target_env = "p1")))]
pub type MaybeSendBoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;
#[cfg(all(target_os = "wasi", target_env = "p1"))]
pub type MaybeSendBoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + 'a>>;

/// Channels a transport adapter can use as an event sink.
pub mod channel {
    pub use tokio::sync::mpsc::{channel, unbounded_channel, Receiver, Sender, UnboundedReceiver, UnboundedSender};
}
