//! In-process command/event/query bus.
//!
//! - [`message`]: the message taxonomy and the closed kind registry key.
//! - [`Bus`]: dispatch contract (`consume`, `tell`, `emit`, `ask`, `idle`).
//! - [`InMemoryBus`]: Tokio-backed implementation.
//! - [`LoggingBus`]: decorator logging every dispatch.

pub mod bus;
pub mod dispatch;
pub mod error;
pub mod in_memory_bus;
pub mod logging;
pub mod message;

pub use bus::{Bus, Subscription};
pub use dispatch::{Dispatch, DispatchReport};
pub use error::{BusError, HandlerError, HandlerResult};
pub use in_memory_bus::InMemoryBus;
pub use logging::LoggingBus;
pub use message::{Command, Event, Message, MessageClass, MessageKind, Query, Rendered};
