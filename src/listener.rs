//! Process-wide last-resort failure channels.
//!
//! Two channels feed unhandled failures into attached handlers:
//! - uncaught panics on any thread, through the process panic hook
//! - failed detached tasks, through [`ErrorHandler::spawn_guarded`]
//!
//! The first attach saves the panic hook that was installed at the time and
//! chains in front of it. Panics are handled by every live attached handler
//! and are not forwarded: the handler (and its `on_error` hook) owns
//! user-facing presentation. With no live handler left, for example after
//! every attached handler was dropped, panics go to the saved hook. The last
//! detach puts the saved hook back. Panics raised inside a
//! [`FailureBoundary`](crate::FailureBoundary) are left to the boundary so
//! they are handled once.

use crate::core_types::{metadata, Failure};
use crate::handler::ErrorHandler;
use crate::logging::log_debug;

use parking_lot::{const_mutex, Mutex};
use serde_json::json;
use std::cell::Cell;
use std::future::Future;
use std::panic::{self, catch_unwind, AssertUnwindSafe, PanicHookInfo};
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Hook that was installed before the first attach, while the chain is in place.
///
/// Only touched by attach and detach. The panic hook itself never locks it,
/// so swapping hooks under this lock cannot deadlock with a panicking thread.
static SAVED_HOOK: Mutex<Option<Arc<PanicHook>>> = const_mutex(None);

/// Handlers receiving uncaught panics.
static ATTACHED: Mutex<Vec<Weak<ErrorHandler>>> = const_mutex(Vec::new());

thread_local! {
    static SUPERVISION_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Marks the current thread as running supervised code until dropped.
pub(crate) struct SupervisedScope {
    _private: (),
}

impl SupervisedScope {
    pub(crate) fn enter() -> Self {
        SUPERVISION_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self { _private: () }
    }
}

impl Drop for SupervisedScope {
    fn drop(&mut self) {
        SUPERVISION_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

fn is_supervised() -> bool {
    SUPERVISION_DEPTH.with(|depth| depth.get() > 0)
}

/// Run `f` as supervised code, catching any panic it raises.
pub(crate) fn catch_supervised<T>(f: impl FnOnce() -> T) -> std::thread::Result<T> {
    let _scope = SupervisedScope::enter();
    catch_unwind(AssertUnwindSafe(f))
}

/// Future adapter that marks every poll of `inner` as supervised.
pub(crate) struct Supervised<F> {
    inner: Pin<Box<F>>,
}

impl<F: Future> Supervised<F> {
    pub(crate) fn new(inner: F) -> Self {
        Self {
            inner: Box::pin(inner),
        }
    }
}

impl<F: Future> Future for Supervised<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _scope = SupervisedScope::enter();
        self.inner.as_mut().poll(cx)
    }
}

/// Add `handler` to the panic hook chain, installing the chain on first use.
pub(crate) fn attach(handler: &Arc<ErrorHandler>) {
    let mut saved = SAVED_HOOK.lock();
    {
        let mut attached = ATTACHED.lock();
        attached.retain(|weak| weak.strong_count() > 0);
        attached.push(Arc::downgrade(handler));
    }

    if saved.is_none() {
        let previous = Arc::new(panic::take_hook());
        let forward = Arc::clone(&previous);
        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            dispatch_panic(info, &forward)
        }));
        *saved = Some(previous);
        log_debug!("Panic hook chain installed");
    }
}

/// Remove `handler` from the chain; the last one out restores the saved hook.
pub(crate) fn detach(handler: &ErrorHandler) {
    let mut saved = SAVED_HOOK.lock();
    let remaining = {
        let mut attached = ATTACHED.lock();
        attached.retain(|weak| {
            weak.strong_count() > 0 && !std::ptr::eq(weak.as_ptr(), handler)
        });
        attached.len()
    };

    if remaining == 0 {
        if let Some(previous) = saved.take() {
            drop(panic::take_hook());
            panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| previous(info)));
            log_debug!("Panic hook chain removed, previous hook restored");
        }
    }
}

fn live_handlers() -> Vec<Arc<ErrorHandler>> {
    ATTACHED.lock().iter().filter_map(Weak::upgrade).collect()
}

fn dispatch_panic(info: &PanicHookInfo<'_>, previous: &PanicHook) {
    let handlers = live_handlers();
    if handlers.is_empty() {
        previous(info);
        return;
    }
    if is_supervised() {
        return;
    }

    let context = info.location().map(|location| {
        metadata(json!({ "panicLocation": format!("{}:{}", location.file(), location.line()) }))
    });
    for handler in handlers {
        let failure = Failure::from_panic(info.payload());
        let error = handler.categorize_error_with(failure, context.clone());
        handler.handle(&error);
    }
}
