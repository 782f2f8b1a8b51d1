//! In-process bus running handlers as Tokio tasks.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::bus::{Bus, Subscription};
use crate::dispatch::{Dispatch, InFlight};
use crate::error::{BusError, HandlerError};
use crate::message::{Command, Event, Message, MessageKind, Query};

type AnyMessage = Box<dyn Any + Send>;
type AnyReply = Box<dyn Any + Send>;
type ErasedHandler =
    Arc<dyn Fn(AnyMessage) -> BoxFuture<'static, Result<AnyReply, HandlerError>> + Send + Sync>;

struct Registration {
    id: u64,
    handler: ErasedHandler,
}

/// Kind → handlers table.
///
/// Handlers are stored type-erased; `Message::KIND` ties every kind to exactly
/// one message type, so the downcast in each handler only fails when two
/// message types declare the same kind.
struct Registry<K> {
    next_id: AtomicU64,
    handlers: RwLock<HashMap<K, Vec<Registration>>>,
}

impl<K: MessageKind> Registry<K> {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: RwLock::new(HashMap::new()),
        }
    }

    fn insert(&self, kind: K, handler: ErasedHandler) -> (u64, usize) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let slot = handlers.entry(kind).or_default();
        slot.push(Registration { id, handler });
        (id, slot.len())
    }

    fn remove(&self, kind: K, id: u64) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(slot) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|r| r.id != id);
        let removed = slot.len() != before;
        if slot.is_empty() {
            handlers.remove(&kind);
        }
        removed
    }

    /// Snapshot of the handlers for `kind`; registrations made while the
    /// snapshot is being delivered are not reached.
    fn snapshot(&self, kind: K) -> Vec<ErasedHandler> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers
            .get(&kind)
            .map(|slot| slot.iter().map(|r| Arc::clone(&r.handler)).collect())
            .unwrap_or_default()
    }
}

/// In-memory [`Bus`].
///
/// - Every handler invocation is a detached task on the given runtime.
/// - Each handler receives its own clone of the dispatched message.
/// - Cloning the bus is cheap; clones share registrations.
pub struct InMemoryBus<K> {
    registry: Arc<Registry<K>>,
    in_flight: Arc<InFlight>,
    runtime: Handle,
}

impl<K: MessageKind> InMemoryBus<K> {
    /// Create a bus spawning its handler tasks on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            in_flight: Arc::new(InFlight::default()),
            runtime,
        }
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: K) -> usize {
        self.registry.snapshot(kind).len()
    }

    /// Number of handler tasks still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.current()
    }

    fn deliver<M>(&self, message: M, handlers: Vec<ErasedHandler>) -> Dispatch
    where
        M: Message<Kind = K>,
    {
        let kind = M::KIND;
        let tasks = handlers
            .into_iter()
            .map(|handler| {
                let guard = self.in_flight.enter();
                let message = message.clone();
                self.runtime.spawn(async move {
                    let _guard = guard;
                    match handler(Box::new(message) as AnyMessage).await {
                        Ok(_) => true,
                        Err(error) => {
                            tracing::warn!(
                                target: "bus",
                                kind = kind.name(),
                                error = %error,
                                "handler failed"
                            );
                            false
                        }
                    }
                })
            })
            .collect();
        Dispatch::new(kind.name(), tasks)
    }
}

impl<K> Clone for InMemoryBus<K> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            in_flight: Arc::clone(&self.in_flight),
            runtime: self.runtime.clone(),
        }
    }
}

impl<K: MessageKind> core::fmt::Debug for InMemoryBus<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryBus")
            .field("in_flight", &self.in_flight.current())
            .finish_non_exhaustive()
    }
}

impl<K: MessageKind> Bus<K> for InMemoryBus<K> {
    fn consume<M, F, Fut>(&self, handler: F) -> Subscription<K>
    where
        M: Message<Kind = K>,
        F: Fn(M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Reply, HandlerError>> + Send + 'static,
    {
        let kind = M::KIND;
        let erased: ErasedHandler = Arc::new(move |message: AnyMessage| {
            match message.downcast::<M>() {
                Ok(message) => handler(*message)
                    .map(|reply| reply.map(|r| Box::new(r) as AnyReply))
                    .boxed(),
                Err(_) => {
                    let error: HandlerError =
                        format!("message delivered to {} handler has another type", kind.name())
                            .into();
                    futures::future::ready(Err(error)).boxed()
                }
            }
        });

        let (id, registered) = self.registry.insert(kind, erased);
        if registered > 1 && kind.class().expects_single_handler() {
            tracing::warn!(
                target: "bus",
                kind = kind.name(),
                class = %kind.class(),
                handlers = registered,
                "multiple handlers registered; they will compete for each message"
            );
        }

        let registry = Arc::downgrade(&self.registry);
        Subscription::new(kind, move || {
            registry
                .upgrade()
                .map(|registry| registry.remove(kind, id))
                .unwrap_or(false)
        })
    }

    fn tell<C>(&self, command: C) -> Result<Dispatch, BusError>
    where
        C: Command<Kind = K>,
    {
        let handlers = self.registry.snapshot(C::KIND);
        if handlers.is_empty() {
            return Err(BusError::NoHandlerRegistered {
                kind: C::KIND.name(),
            });
        }
        Ok(self.deliver(command, handlers))
    }

    fn emit<E>(&self, event: E) -> Dispatch
    where
        E: Event<Kind = K>,
    {
        let handlers = self.registry.snapshot(E::KIND);
        self.deliver(event, handlers)
    }

    fn ask<Q>(&self, query: Q) -> impl Future<Output = Result<Q::Reply, BusError>> + Send
    where
        Q: Query<Kind = K>,
    {
        let kind = Q::KIND.name();
        let handlers = self.registry.snapshot(Q::KIND);
        let pending = if handlers.is_empty() {
            None
        } else {
            let (tx, rx) = oneshot::channel::<Result<AnyReply, HandlerError>>();
            // First handler to finish answers; later ones are only logged.
            let answer = Arc::new(Mutex::new(Some(tx)));
            for handler in handlers {
                let guard = self.in_flight.enter();
                let answer = Arc::clone(&answer);
                let query = query.clone();
                self.runtime.spawn(async move {
                    let _guard = guard;
                    let outcome = handler(Box::new(query) as AnyMessage).await;
                    let tx = answer.lock().unwrap_or_else(PoisonError::into_inner).take();
                    match (tx, outcome) {
                        (Some(tx), outcome) => {
                            let _ = tx.send(outcome);
                        }
                        (None, Err(error)) => {
                            tracing::warn!(
                                target: "bus",
                                kind,
                                error = %error,
                                "late query handler failed"
                            );
                        }
                        (None, Ok(_)) => {}
                    }
                });
            }
            Some(rx)
        };

        async move {
            let Some(rx) = pending else {
                return Err(BusError::NoHandlerRegistered { kind });
            };
            match rx.await {
                Ok(Ok(reply)) => reply.downcast::<Q::Reply>().map(|r| *r).map_err(|_| {
                    BusError::HandlerFailure {
                        kind,
                        source: format!("{kind} handler answered with another type").into(),
                    }
                }),
                Ok(Err(source)) => Err(BusError::HandlerFailure { kind, source }),
                Err(_) => Err(BusError::Abandoned { kind }),
            }
        }
    }

    fn idle(&self) -> impl Future<Output = ()> + Send {
        let in_flight = Arc::clone(&self.in_flight);
        async move { in_flight.drained().await }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use serde::Serialize;
    use tokio::sync::mpsc;

    use super::*;
    use crate::message::MessageClass;

    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    enum TestKind {
        Store,
        Stored,
        Lookup,
        Unhandled,
    }

    impl MessageKind for TestKind {
        fn name(&self) -> &'static str {
            match self {
                TestKind::Store => "Store",
                TestKind::Stored => "Stored",
                TestKind::Lookup => "Lookup",
                TestKind::Unhandled => "Unhandled",
            }
        }

        fn class(&self) -> MessageClass {
            match self {
                TestKind::Store | TestKind::Unhandled => MessageClass::Command,
                TestKind::Stored => MessageClass::Event,
                TestKind::Lookup => MessageClass::Query,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Store {
        value: f64,
    }

    impl Message for Store {
        type Kind = TestKind;
        type Reply = ();
        const KIND: TestKind = TestKind::Store;
    }
    impl Command for Store {}

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Stored {
        value: f64,
    }

    impl Message for Stored {
        type Kind = TestKind;
        type Reply = ();
        const KIND: TestKind = TestKind::Stored;
    }
    impl Event for Stored {}

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Lookup {
        value: u64,
    }

    impl Message for Lookup {
        type Kind = TestKind;
        type Reply = u64;
        const KIND: TestKind = TestKind::Lookup;
    }
    impl Query for Lookup {}

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Unhandled;

    impl Message for Unhandled {
        type Kind = TestKind;
        type Reply = ();
        const KIND: TestKind = TestKind::Unhandled;
    }
    impl Command for Unhandled {}
    impl Event for Unhandled {}

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct UnhandledQuery;

    impl Message for UnhandledQuery {
        type Kind = TestKind;
        type Reply = u64;
        const KIND: TestKind = TestKind::Unhandled;
    }
    impl Query for UnhandledQuery {}

    fn bus() -> InMemoryBus<TestKind> {
        InMemoryBus::new(Handle::current())
    }

    #[tokio::test]
    async fn tell_delivers_command_to_its_handler_once() {
        let bus = bus();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = bus.consume(move |command: Store| {
            let tx = tx.clone();
            async move {
                tx.send(command).map_err(|e| e.to_string())?;
                Ok::<(), HandlerError>(())
            }
        });

        let command = Store { value: 0.25 };
        let report = bus.tell(command.clone()).unwrap().wait().await;

        assert_eq!(report.delivered, 1);
        assert_eq!(rx.recv().await, Some(command));
        bus.idle().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn emit_fans_out_to_every_handler() {
        let bus = bus();
        let (tx, mut rx) = mpsc::unbounded_channel();
        for handler_no in 0..3 {
            let tx = tx.clone();
            let _sub = bus.consume(move |event: Stored| {
                let tx = tx.clone();
                async move {
                    tx.send((handler_no, event)).map_err(|e| e.to_string())?;
                    Ok::<(), HandlerError>(())
                }
            });
        }

        let event = Stored { value: 1.5 };
        let dispatch = bus.emit(event.clone());
        assert_eq!(dispatch.handlers(), 3);
        assert_eq!(dispatch.wait().await.delivered, 3);

        let mut received = Vec::new();
        while let Ok(item) = rx.try_recv() {
            received.push(item);
        }
        received.sort_by_key(|(no, _)| *no);
        assert_eq!(
            received,
            vec![(0, event.clone()), (1, event.clone()), (2, event)]
        );
    }

    #[tokio::test]
    async fn ask_resolves_with_handler_answer() {
        let bus = bus();
        let _sub = bus.consume(|query: Lookup| async move { Ok::<_, HandlerError>(query.value * 2) });

        assert_eq!(bus.ask(Lookup { value: 21 }).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn ask_rejects_when_handler_fails() {
        let bus = bus();
        let _sub = bus.consume(|_: Lookup| async move { Err::<u64, HandlerError>("boom".into()) });

        let error = bus.ask(Lookup { value: 1 }).await.unwrap_err();
        assert!(matches!(error, BusError::HandlerFailure { kind: "Lookup", .. }));
        assert!(error.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn missing_handlers_fail_tell_and_ask_but_not_emit() {
        let bus = bus();

        let error = bus.tell(Unhandled).unwrap_err();
        assert!(error.is_no_handler());
        assert_eq!(error.kind(), "Unhandled");

        let error = bus.ask(UnhandledQuery).await.unwrap_err();
        assert!(error.is_no_handler());

        let dispatch = bus.emit(Unhandled);
        assert_eq!(dispatch.handlers(), 0);
        assert_eq!(dispatch.wait().await, Default::default());
    }

    #[tokio::test]
    async fn tell_returns_before_handler_completes() {
        let bus = bus();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));
        let _sub = bus.consume(move |_: Store| {
            let release_rx = Arc::clone(&release_rx);
            async move {
                if let Some(rx) = release_rx.lock().await.take() {
                    rx.await.map_err(|e| e.to_string())?;
                }
                Ok::<(), HandlerError>(())
            }
        });

        let dispatch = bus.tell(Store { value: 0.0 }).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(bus.in_flight(), 1);

        release_tx.send(()).unwrap();
        assert_eq!(dispatch.wait().await.delivered, 1);
        bus.idle().await;
        assert_eq!(bus.in_flight(), 0);
    }

    #[tokio::test]
    async fn handler_errors_do_not_reach_the_teller() {
        let bus = bus();
        let _sub = bus.consume(|_: Store| async move { Err::<(), HandlerError>("nope".into()) });

        let report = bus.tell(Store { value: 1.0 }).unwrap().wait().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 0);
    }

    #[tokio::test]
    async fn unsubscribe_removes_only_that_registration() {
        let bus = bus();
        let calls = Arc::new(AtomicUsize::new(0));
        let counting = |calls: Arc<AtomicUsize>| {
            move |_: Stored| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), HandlerError>(())
                }
            }
        };
        let first = bus.consume(counting(Arc::clone(&calls)));
        let _second = bus.consume(counting(Arc::clone(&calls)));
        assert_eq!(bus.handler_count(TestKind::Stored), 2);

        assert!(first.unsubscribe());
        assert_eq!(bus.handler_count(TestKind::Stored), 1);

        bus.emit(Stored { value: 2.0 }).wait().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn idle_waits_for_cascades() {
        let bus = bus();
        let done = Arc::new(AtomicUsize::new(0));

        let cascade = bus.clone();
        let _store = bus.consume(move |command: Store| {
            let bus = cascade.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                let _ = bus.emit(Stored {
                    value: command.value,
                });
                Ok::<(), HandlerError>(())
            }
        });
        let seen = Arc::clone(&done);
        let _stored = bus.consume(move |_: Stored| {
            let seen = Arc::clone(&seen);
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                seen.fetch_add(1, Ordering::SeqCst);
                Ok::<(), HandlerError>(())
            }
        });

        let _ = bus.tell(Store { value: 3.0 }).unwrap();
        bus.idle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn competing_query_handlers_resolve_with_the_first_answer() {
        let bus = bus();
        let _fast = bus.consume(|_: Lookup| async move { Ok::<u64, HandlerError>(1) });
        let _slow = bus.consume(|_: Lookup| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<u64, HandlerError>(2)
        });

        assert_eq!(bus.ask(Lookup { value: 0 }).await.unwrap(), 1);
        bus.idle().await;
    }
}
