//! Core execution machinery.
//!
//! Most users only need [`SkillExecutor`] and the event types; the other
//! pieces are exposed for custom transports and tests.
//!
//! # Modules
//!
//! - [`executor`] - Per-request orchestration
//! - [`injector`] - Collaborator injection from declared needs
//! - [`streaming`] - Single versus streamed delivery
//! - [`sink`] - Events emitted towards the transport adapter
//! - [`error_mapper`] - Error envelopes

pub mod error_mapper;
pub mod executor;
pub mod injector;
pub mod sink;
pub mod streaming;

pub use error_mapper::ErrorEnvelope;
pub use executor::{IncomingInvocation, OperationDescription, SkillExecutor};
pub use injector::{Injections, ParameterInjector};
pub use sink::{CollectingSink, DispatchEvent, EventSink};
pub use streaming::StreamingAdapter;
