/// Handler boxing and invocation.
///
/// A handler is called with its own copy of the payload and returns a future.
/// That future is polled once on the spot, so synchronous handlers (and the
/// synchronous prefix of async ones) run in slot order. Whatever is still
/// pending afterwards is spawned onto the ambient tokio runtime and never
/// awaited by dispatch. Outside a runtime the rest of the future is driven to
/// completion on the calling thread before the next handler runs.
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use futures::executor::block_on;
use futures::future::BoxFuture;
use switchboard_core::{DispatchOptions, Event, EventKind, FaultPolicy};
use switchboard_logging::{EventLogger, RegistryEvent};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::index::EventIndex;

pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

pub(crate) type Handler<E> = Arc<dyn Fn(E) -> HandlerFuture + Send + Sync>;

pub(crate) fn from_async<E, F, Fut>(f: F) -> Handler<E>
where
    E: Event,
    F: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |event| f(event).boxed())
}

pub(crate) fn from_sync<E, F>(f: F) -> Handler<E>
where
    E: Event,
    F: Fn(E) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(move |event| futures::future::ready(f(event)).boxed())
}

/// What happened to one handler call.
pub(crate) enum Invocation {
    Completed,
    Pending(JoinHandle<()>),
    Panicked,
}

pub(crate) fn invoke<E: Event>(
    handler: &Handler<E>,
    event: E,
    at: EventIndex<E::Kind>,
    options: DispatchOptions,
) -> Invocation {
    if options.trace_invocations {
        debug!(kind = ?at.kind(), index = at.index(), "Invoking handler");
    }

    let start = move || {
        let mut fut = handler(event);
        let polled = fut.as_mut().now_or_never();
        (fut, polled)
    };

    let (fut, polled) = match options.fault_policy {
        FaultPolicy::Isolate => match panic::catch_unwind(AssertUnwindSafe(start)) {
            Ok(started) => started,
            Err(_) => {
                report_panic(at);
                return Invocation::Panicked;
            }
        },
        FaultPolicy::Propagate => start(),
    };

    if let Some(result) = polled {
        report_result(at, result);
        return Invocation::Completed;
    }

    let policy = options.fault_policy;
    match Handle::try_current() {
        Ok(runtime) => Invocation::Pending(runtime.spawn(async move {
            complete(fut, at, policy).await;
        })),
        Err(_) => {
            debug!(kind = ?at.kind(), index = at.index(), "No tokio runtime; completing handler inline");
            if block_on(complete(fut, at, policy)) {
                Invocation::Panicked
            } else {
                Invocation::Completed
            }
        }
    }
}

/// Run a started handler to the end and report how it finished.
/// Returns whether a panic was contained.
async fn complete<K: EventKind>(fut: HandlerFuture, at: EventIndex<K>, policy: FaultPolicy) -> bool {
    let outcome = match policy {
        FaultPolicy::Isolate => AssertUnwindSafe(fut).catch_unwind().await,
        FaultPolicy::Propagate => Ok(fut.await),
    };
    match outcome {
        Ok(result) => {
            report_result(at, result);
            false
        }
        Err(_) => {
            report_panic(at);
            true
        }
    }
}

fn report_result<K: EventKind>(at: EventIndex<K>, result: anyhow::Result<()>) {
    if let Err(e) = result {
        EventLogger::log_event(RegistryEvent::HandlerFailed {
            kind: format!("{:?}", at.kind()),
            index: at.index(),
            error: format!("{e:#}"),
        });
    }
}

fn report_panic<K: EventKind>(at: EventIndex<K>) {
    EventLogger::log_event(RegistryEvent::HandlerPanicked {
        kind: format!("{:?}", at.kind()),
        index: at.index(),
    });
}

/// Outcome of delivering one event.
///
/// Dropping it detaches any still-running handler completions.
#[derive(Debug, Default)]
pub struct Dispatch {
    invoked: usize,
    panicked: usize,
    pending: Vec<JoinHandle<()>>,
}

impl Dispatch {
    /// Handlers called, including those that failed.
    pub fn invoked(&self) -> usize {
        self.invoked
    }

    /// Handlers whose panic was contained before dispatch returned.
    pub fn panicked(&self) -> usize {
        self.panicked
    }

    /// Handler completions still running on the runtime.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Wait for every pending completion.
    ///
    /// A completion that panicked under [`FaultPolicy::Propagate`] resumes the
    /// panic here.
    pub async fn settle(self) {
        for handle in self.pending {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    panic::resume_unwind(e.into_panic());
                }
            }
        }
    }

    pub(crate) fn record(&mut self, invocation: Invocation) {
        self.invoked += 1;
        match invocation {
            Invocation::Pending(handle) => self.pending.push(handle),
            Invocation::Panicked => self.panicked += 1,
            Invocation::Completed => {}
        }
    }

    pub(crate) fn merge(&mut self, other: Dispatch) {
        self.invoked += other.invoked;
        self.panicked += other.panicked;
        self.pending.extend(other.pending);
    }
}
