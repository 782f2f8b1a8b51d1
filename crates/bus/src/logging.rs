//! Logging decorator for any [`Bus`].
//!
//! Every `tell`/`emit`/`ask` gets a sequence number and produces
//! `begin` → (`error` | `result`)? → `end` debug lines under the `bus`
//! target. The `end` line comes from a drop guard, so it is written on every
//! exit path.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bus::{Bus, Subscription};
use crate::dispatch::Dispatch;
use crate::error::{BusError, HandlerError};
use crate::message::{Command, Event, Message, MessageKind, Query};

/// Wraps a bus and logs each dispatch without changing its outcome.
#[derive(Debug)]
pub struct LoggingBus<B> {
    inner: B,
    seq: AtomicU64,
}

impl<B> LoggingBus<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            seq: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn into_inner(self) -> B {
        self.inner
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}

struct EndOfDispatch {
    op: &'static str,
    seq: u64,
    kind: &'static str,
}

impl EndOfDispatch {
    fn begin(op: &'static str, seq: u64, kind: &'static str, message: impl core::fmt::Display) -> Self {
        tracing::debug!(target: "bus", op, seq, kind, %message, "begin");
        Self { op, seq, kind }
    }

    fn error(&self, error: &BusError) {
        tracing::debug!(target: "bus", op = self.op, seq = self.seq, kind = self.kind, %error, "error");
    }
}

impl Drop for EndOfDispatch {
    fn drop(&mut self) {
        tracing::debug!(target: "bus", op = self.op, seq = self.seq, kind = self.kind, "end");
    }
}

impl<K, B> Bus<K> for LoggingBus<B>
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
        tracing::debug!(target: "bus", kind = M::KIND.name(), "consume");
        self.inner.consume(handler)
    }

    fn tell<C>(&self, command: C) -> Result<Dispatch, BusError>
    where
        C: Command<Kind = K>,
    {
        let end = EndOfDispatch::begin("tell", self.next_seq(), C::KIND.name(), command.rendered());
        self.inner.tell(command).inspect_err(|error| end.error(error))
    }

    fn emit<E>(&self, event: E) -> Dispatch
    where
        E: Event<Kind = K>,
    {
        let _end = EndOfDispatch::begin("emit", self.next_seq(), E::KIND.name(), event.rendered());
        self.inner.emit(event)
    }

    fn ask<Q>(&self, query: Q) -> impl Future<Output = Result<Q::Reply, BusError>> + Send
    where
        Q: Query<Kind = K>,
    {
        let end = EndOfDispatch::begin("ask", self.next_seq(), Q::KIND.name(), query.rendered());
        let pending = self.inner.ask(query);
        async move {
            let outcome = pending.await;
            match &outcome {
                Ok(result) => tracing::debug!(
                    target: "bus",
                    op = end.op,
                    seq = end.seq,
                    kind = end.kind,
                    ?result,
                    "result"
                ),
                Err(error) => end.error(error),
            }
            outcome
        }
    }

    fn idle(&self) -> impl Future<Output = ()> + Send {
        self.inner.idle()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use serde::Serialize;
    use tokio::runtime::Handle;
    use tracing_subscriber::EnvFilter;

    use super::*;
    use crate::in_memory_bus::InMemoryBus;
    use crate::message::MessageClass;

    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    enum Kind {
        Count,
        Counted,
        Total,
    }

    impl MessageKind for Kind {
        fn name(&self) -> &'static str {
            match self {
                Kind::Count => "Count",
                Kind::Counted => "Counted",
                Kind::Total => "Total",
            }
        }

        fn class(&self) -> MessageClass {
            match self {
                Kind::Count => MessageClass::Command,
                Kind::Counted => MessageClass::Event,
                Kind::Total => MessageClass::Query,
            }
        }
    }

    #[derive(Debug, Clone, Serialize)]
    struct Count;
    impl Message for Count {
        type Kind = Kind;
        type Reply = ();
        const KIND: Kind = Kind::Count;
    }
    impl Command for Count {}

    #[derive(Debug, Clone, Serialize)]
    struct Counted;
    impl Message for Counted {
        type Kind = Kind;
        type Reply = ();
        const KIND: Kind = Kind::Counted;
    }
    impl Event for Counted {}

    #[derive(Debug, Clone, Serialize)]
    struct Total;
    impl Message for Total {
        type Kind = Kind;
        type Reply = usize;
        const KIND: Kind = Kind::Total;
    }
    impl Query for Total {}

    fn logging_bus() -> LoggingBus<InMemoryBus<Kind>> {
        LoggingBus::new(InMemoryBus::new(Handle::current()))
    }

    #[tokio::test]
    async fn passes_errors_through_unchanged() {
        let bus = logging_bus();

        let error = bus.tell(Count).unwrap_err();
        assert!(matches!(error, BusError::NoHandlerRegistered { kind: "Count" }));

        let error = bus.ask(Total).await.unwrap_err();
        assert!(matches!(error, BusError::NoHandlerRegistered { kind: "Total" }));

        assert_eq!(bus.emit(Counted).handlers(), 0);
    }

    #[tokio::test]
    async fn passes_results_through_unchanged() {
        let bus = Arc::new(logging_bus());
        let _sub = bus.consume(|_: Total| async move { Ok::<usize, HandlerError>(7) });
        let _sub = bus.consume(|_: Count| async move { Ok::<(), HandlerError>(()) });

        assert_eq!(bus.ask(Total).await.unwrap(), 7);
        assert_eq!(bus.tell(Count).unwrap().wait().await.delivered, 1);
        bus.idle().await;
    }

    /// Shared buffer the fmt subscriber writes into.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            let writer = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("bus=debug"))
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .without_time()
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        /// Messages logged for dispatch `seq`, in order.
        fn steps(&self, seq: u64) -> Vec<String> {
            let text = String::from_utf8(self.0.lock().unwrap().clone()).unwrap();
            let marker = format!(" seq={seq} ");
            text.lines()
                .filter(|line| line.contains(&marker))
                .filter_map(|line| line.split(" bus: ").nth(1))
                .filter_map(|rest| rest.split_whitespace().next())
                .map(str::to_string)
                .collect()
        }
    }

    #[tokio::test]
    async fn tell_without_handler_logs_begin_error_end() {
        let captured = Captured::default();
        let _guard = captured.install();
        let bus = logging_bus();

        let _ = bus.tell(Count).unwrap_err();

        assert_eq!(captured.steps(1), ["begin", "error", "end"]);
    }

    #[tokio::test]
    async fn answered_ask_logs_begin_result_end() {
        let captured = Captured::default();
        let _guard = captured.install();
        let bus = logging_bus();
        let _sub = bus.consume(|_: Total| async move { Ok::<usize, HandlerError>(7) });

        assert_eq!(bus.ask(Total).await.unwrap(), 7);

        assert_eq!(captured.steps(1), ["begin", "result", "end"]);
    }

    #[tokio::test]
    async fn failed_ask_logs_begin_error_end() {
        let captured = Captured::default();
        let _guard = captured.install();
        let bus = logging_bus();
        let _sub = bus.consume(|_: Total| async move { Err::<usize, HandlerError>("boom".into()) });

        let _ = bus.ask(Total).await.unwrap_err();

        assert_eq!(captured.steps(1), ["begin", "error", "end"]);
        assert!(captured.steps(2).is_empty());
    }

    #[tokio::test]
    async fn sequence_numbers_increase_per_dispatch() {
        let bus = logging_bus();
        let _ = bus.emit(Counted);
        let _ = bus.tell(Count);
        let _ = bus.ask(Total).await;
        assert_eq!(bus.next_seq(), 4);
    }
}
