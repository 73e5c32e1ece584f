#![warn(missing_docs)]
//! Message transport shared by the Hagall server and its tools.
//!
//! [`WireCodec`] frames protocol messages onto WebSocket connections as
//! [`Msg`] values. A [`Scheduler`] sits between the reading side and the
//! message handlers, coalescing pose and component updates so handlers see
//! the latest state of an entity once per frame.

mod codec;
mod error;
mod msg;
mod registry;
mod scheduler;

pub use codec::WireCodec;
pub use error::*;
pub use msg::Msg;
pub use registry::TypeRegistry;
pub use scheduler::{
    CoalesceKey, Consumer, Dispatcher, MessageConsumer, Scheduler, DEFAULT_QUEUE_CAPACITY,
};

pub use hagall_messages as messages;
