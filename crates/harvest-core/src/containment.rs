//! Process-wide fatal-error containment.
//!
//! Three capture points feed one latch:
//! - [`FatalContainment::contain`] for the orchestrator's own result,
//! - [`FatalContainment::spawn`] for background tasks nobody awaits,
//! - [`FatalContainment::install_panic_hook`] for panics outside both.
//!
//! [`FatalContainment::guard`] and [`FatalContainment::spawn`] poll their
//! future inside an unwind boundary: a panic there is left to whoever catches
//! it first (the future itself, or the boundary). The panic hook only acts on
//! panics raised outside every boundary.
//!
//! The first failure to reach the latch is logged and terminates the process
//! with status 1. Anything arriving afterwards is dropped.

use futures::FutureExt;
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use tracing::error;

/// Exit status used for every contained failure.
pub const FATAL_EXIT_CODE: i32 = 1;

/// Ends the process. Swapped for a recording double in tests.
pub trait Terminate: Send + Sync {
    fn terminate(&self, code: i32);
}

/// Terminates via `std::process::exit`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExit;

impl Terminate for ProcessExit {
    fn terminate(&self, code: i32) {
        std::process::exit(code);
    }
}

/// Which capture point observed a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSource {
    /// The orchestrator's top-level invocation.
    Run,
    /// A spawned task whose result nobody else observes.
    Background,
    /// A panic that escaped all async handling.
    Panic,
}

impl fmt::Display for FailureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run => write!(f, "run"),
            Self::Background => write!(f, "background task"),
            Self::Panic => write!(f, "panic"),
        }
    }
}

struct Inner {
    fired: OnceLock<FailureSource>,
    terminator: Box<dyn Terminate>,
}

/// Shared handle to the containment latch. Cheap to clone.
#[derive(Clone)]
pub struct FatalContainment {
    inner: Arc<Inner>,
}

impl FatalContainment {
    pub fn new(terminator: impl Terminate + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                fired: OnceLock::new(),
                terminator: Box::new(terminator),
            }),
        }
    }

    /// Containment that really exits the process.
    pub fn process() -> Self {
        Self::new(ProcessExit)
    }

    /// Whether a failure has already been observed.
    pub fn has_fired(&self) -> bool {
        self.inner.fired.get().is_some()
    }

    /// The capture point that observed the first failure, if any.
    pub fn first_failure(&self) -> Option<FailureSource> {
        self.inner.fired.get().copied()
    }

    /// Log `message` and terminate, unless a failure was already observed.
    pub fn fire(&self, source: FailureSource, message: &str) {
        if self.inner.fired.set(source).is_err() {
            return;
        }
        error!(source = %source, "{message}");
        self.inner.terminator.terminate(FATAL_EXIT_CODE);
    }

    /// Capture point for the top-level run result. The alternate form of
    /// `E`'s `Display` is logged, so an `anyhow::Error` shows its whole chain.
    pub fn contain<T, E>(&self, result: Result<T, E>) -> Option<T>
    where
        E: fmt::Display,
    {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.fire(FailureSource::Run, &format!("{e:#}"));
                None
            }
        }
    }

    /// Runs the top-level `task` inside an unwind boundary. An `Err` goes
    /// through [`contain`](Self::contain); a panic that unwinds out of `task`
    /// is reported as [`FailureSource::Panic`].
    pub async fn guard<F, T, E>(&self, task: F) -> Option<T>
    where
        F: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        match AssertUnwindSafe(Boundary::new(task)).catch_unwind().await {
            Ok(result) => self.contain(result),
            Err(payload) => {
                self.fire(FailureSource::Panic, &panic_message(payload.as_ref()));
                None
            }
        }
    }

    /// Capture point for fire-and-forget tasks: an `Err` or a panic that
    /// unwinds out of `task` is fatal.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let containment = self.clone();
        tokio::spawn(async move {
            match AssertUnwindSafe(Boundary::new(task)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => containment.fire(FailureSource::Background, &format!("{e:#}")),
                Err(payload) => {
                    containment.fire(FailureSource::Background, &panic_message(payload.as_ref()))
                }
            }
        })
    }

    /// Capture point for panics raised outside [`guard`](Self::guard) and
    /// [`spawn`](Self::spawn). Replaces any previously installed hook.
    pub fn install_panic_hook(&self) {
        let containment = self.clone();
        std::panic::set_hook(Box::new(move |info| {
            if inside_boundary() {
                return;
            }
            let message = panic_message(info.payload());
            match info.location() {
                Some(loc) => containment.fire(
                    FailureSource::Panic,
                    &format!("{message} (at {}:{})", loc.file(), loc.line()),
                ),
                None => containment.fire(FailureSource::Panic, &message),
            }
        }));
    }
}

impl fmt::Debug for FatalContainment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FatalContainment")
            .field("fired", &self.has_fired())
            .finish()
    }
}

thread_local! {
    static BOUNDARY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

fn inside_boundary() -> bool {
    BOUNDARY_DEPTH.with(|depth| depth.get() > 0)
}

/// Marks the current thread as polling inside a boundary until dropped.
/// Dropped during unwinding too, so the count never leaks.
struct BoundaryScope;

impl BoundaryScope {
    fn enter() -> Self {
        BOUNDARY_DEPTH.with(|depth| depth.set(depth.get() + 1));
        BoundaryScope
    }
}

impl Drop for BoundaryScope {
    fn drop(&mut self) {
        BOUNDARY_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

/// Polls the wrapped future with the thread marked as inside a boundary.
struct Boundary<F> {
    inner: Pin<Box<F>>,
}

impl<F> Boundary<F> {
    fn new(inner: F) -> Self {
        Self {
            inner: Box::pin(inner),
        }
    }
}

impl<F: Future> Future for Boundary<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _scope = BoundaryScope::enter();
        self.inner.as_mut().poll(cx)
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        format!("{payload:?}")
    }
}
