//! Command/event/query bus abstraction.
//!
//! The bus is the only coordination channel between handlers: a handler
//! never calls another handler, it dispatches a message.
//!
//! ## Delivery
//!
//! - `tell` (commands) and `emit` (events) are **fire-and-forget**: the call
//!   returns as soon as the handlers are scheduled. Handler failures are
//!   logged, never returned to the caller.
//! - `ask` (queries) resolves with the answer of the first handler to finish.
//! - Only a missing handler is reported to the dispatching caller
//!   (`tell` returns it, `ask` resolves with it). `emit` without handlers is a
//!   silent no-op.
//!
//! ## Ordering
//!
//! None between independently dispatched messages. A cascade (handler A
//! dispatching B after its own writes) is causally ordered.

use std::future::Future;
use std::sync::Arc;

use crate::dispatch::Dispatch;
use crate::error::{BusError, HandlerError};
use crate::message::{Command, Event, Message, MessageKind, Query};

/// Registration token returned by [`Bus::consume`].
///
/// [`unsubscribe`](Subscription::unsubscribe) removes exactly the
/// registration that produced it. Dropping the token keeps the handler
/// registered.
pub struct Subscription<K> {
    kind: K,
    cancel: Box<dyn FnOnce() -> bool + Send + Sync>,
}

impl<K: MessageKind> Subscription<K> {
    pub fn new(kind: K, cancel: impl FnOnce() -> bool + Send + Sync + 'static) -> Self {
        Self {
            kind,
            cancel: Box::new(cancel),
        }
    }

    pub fn kind(&self) -> K {
        self.kind
    }

    /// Remove the registration. Returns `false` if it was already gone (or
    /// the bus was dropped).
    pub fn unsubscribe(self) -> bool {
        (self.cancel)()
    }
}

impl<K: MessageKind> core::fmt::Debug for Subscription<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind.name())
            .finish_non_exhaustive()
    }
}

/// In-process message bus over the message kinds `K`.
///
/// Implementations must run every handler asynchronously relative to the
/// dispatching caller.
pub trait Bus<K: MessageKind>: Send + Sync {
    /// Register `handler` for messages of type `M`.
    ///
    /// Many handlers per kind are fine for events. For commands and queries
    /// all registered handlers compete; register one.
    fn consume<M, F, Fut>(&self, handler: F) -> Subscription<K>
    where
        M: Message<Kind = K>,
        F: Fn(M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Reply, HandlerError>> + Send + 'static;

    /// Dispatch a command to its handler(s) without waiting for them.
    fn tell<C>(&self, command: C) -> Result<Dispatch, BusError>
    where
        C: Command<Kind = K>;

    /// Dispatch an event to every handler registered for it (possibly none).
    fn emit<E>(&self, event: E) -> Dispatch
    where
        E: Event<Kind = K>;

    /// Dispatch a query and resolve with its handler's answer.
    ///
    /// Handlers are scheduled when `ask` is called, not when the returned
    /// future is first polled.
    fn ask<Q>(&self, query: Q) -> impl Future<Output = Result<Q::Reply, BusError>> + Send
    where
        Q: Query<Kind = K>;

    /// Resolve once no handler task (including cascaded ones) is running.
    fn idle(&self) -> impl Future<Output = ()> + Send;
}

impl<K, B> Bus<K> for Arc<B>
where
    K: MessageKind,
    B: Bus<K>,
{
    fn consume<M, F, Fut>(&self, handler: F) -> Subscription<K>
    where
        M: Message<Kind = K>,
        F: Fn(M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Reply, HandlerError>> + Send + 'static,
    {
        (**self).consume(handler)
    }

    fn tell<C>(&self, command: C) -> Result<Dispatch, BusError>
    where
        C: Command<Kind = K>,
    {
        (**self).tell(command)
    }

    fn emit<E>(&self, event: E) -> Dispatch
    where
        E: Event<Kind = K>,
    {
        (**self).emit(event)
    }

    fn ask<Q>(&self, query: Q) -> impl Future<Output = Result<Q::Reply, BusError>> + Send
    where
        Q: Query<Kind = K>,
    {
        (**self).ask(query)
    }

    fn idle(&self) -> impl Future<Output = ()> + Send {
        (**self).idle()
    }
}
