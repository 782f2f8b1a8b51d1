//! Message taxonomy: commands, events and queries.
//!
//! - **Command**: intent to change state (e.g. "sell 2 chairs"). One handler.
//! - **Event**: a fact that happened (e.g. "2 chairs were sold"). Zero or more
//!   handlers.
//! - **Query**: a request for a computed result. One handler, which answers.
//!
//! Dispatch is keyed by a closed, per-domain [`MessageKind`] enum rather than
//! by type names: every message type names its variant through
//! [`Message::KIND`], and the bus resolves handlers from that variant.

use core::fmt;
use core::hash::Hash;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// The three message classes. Decides the dispatch contract of a kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MessageClass {
    Command,
    Event,
    Query,
}

impl MessageClass {
    /// Whether at most one handler is expected for kinds of this class.
    pub fn expects_single_handler(self) -> bool {
        !matches!(self, MessageClass::Event)
    }
}

impl fmt::Display for MessageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageClass::Command => "command",
            MessageClass::Event => "event",
            MessageClass::Query => "query",
        })
    }
}

/// Closed enumeration of the message kinds a domain knows about.
///
/// Implemented by a fieldless enum, one variant per concrete message type.
pub trait MessageKind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Stable kind name (e.g. `"SellProduct"`); used in logs and in the
    /// rendered representation of a message.
    fn name(&self) -> &'static str;

    fn class(&self) -> MessageClass;
}

/// A message that can travel over the bus.
///
/// Messages are immutable values. They are cloned once per delivery, so keep
/// them cheap to clone.
pub trait Message: Clone + fmt::Debug + Serialize + Send + Sync + 'static {
    type Kind: MessageKind;

    /// What a handler of this message returns. `()` for commands and events.
    type Reply: fmt::Debug + Send + 'static;

    /// Dispatch key. Must be unique to this message type within `Kind`.
    const KIND: Self::Kind;

    fn kind(&self) -> Self::Kind {
        Self::KIND
    }

    /// Stable human-readable representation: a JSON object with a `"type"`
    /// field holding the kind name, followed by the message fields.
    fn describe(&self) -> String {
        let mut object = Map::new();
        object.insert(
            "type".to_string(),
            JsonValue::String(Self::KIND.name().to_string()),
        );
        if let Ok(JsonValue::Object(fields)) = serde_json::to_value(self) {
            object.extend(fields);
        }
        JsonValue::Object(object).to_string()
    }

    /// Lazily rendered [`describe`](Message::describe), for log fields.
    fn rendered(&self) -> Rendered<'_, Self> {
        Rendered(self)
    }
}

/// Intent to change state.
pub trait Command: Message<Reply = ()> {}

/// Something that happened.
pub trait Event: Message<Reply = ()> {}

/// Request for a computed result of type [`Message::Reply`].
pub trait Query: Message {}

/// `Display` adapter that renders a message only when actually formatted.
pub struct Rendered<'a, M: ?Sized>(&'a M);

impl<M: Message> fmt::Display for Rendered<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.describe())
    }
}
