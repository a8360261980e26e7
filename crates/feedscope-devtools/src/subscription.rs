//! Subscription handles and snapshot streams.
//!
//! Every pipeline subscription collects the teardown callbacks of the
//! listeners it registers in a [`CancelRegistry`]. A [`Subscription`] pairs
//! that registry with a [`CancellationToken`] gating emissions and deferred
//! work. [`SnapshotStream`] adapts a callback subscription into a
//! [`futures::Stream`].
//!
//! Snapshot delivery holds a per-subscription gate from the cancellation
//! check until the sink returns. Snapshots of one subscription are therefore
//! delivered one at a time in the order they were computed, and none is
//! delivered once [`Subscription::cancel`] has returned.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use feedscope_feeds::Unsubscribe;
use futures::Stream;
use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// Callback receiving each snapshot of a subscription.
pub type Sink<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Reentrant so a sink may cancel its own subscription or trigger a nested
/// recompute on the delivering thread.
type Gate = Arc<ReentrantMutex<()>>;

#[derive(Default)]
struct RegistryState {
    closed: bool,
    callbacks: Vec<Unsubscribe>,
}

/// Teardown callbacks collected for one subscription.
///
/// Once [`run_all`](Self::run_all) has been called the registry is closed:
/// callbacks added afterwards run immediately.
#[derive(Default)]
pub struct CancelRegistry {
    state: Mutex<RegistryState>,
}

impl CancelRegistry {
    /// Create an open, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a teardown callback.
    pub fn add(&self, callback: Unsubscribe) {
        let mut state = self.state.lock();
        if state.closed {
            drop(state);
            callback();
        } else {
            state.callbacks.push(callback);
        }
    }

    /// Run every registered callback and close the registry.
    pub fn run_all(&self) {
        let callbacks = {
            let mut state = self.state.lock();
            state.closed = true;
            std::mem::take(&mut state.callbacks)
        };
        for callback in callbacks {
            callback();
        }
    }

    /// Whether [`run_all`](Self::run_all) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of pending callbacks.
    pub fn len(&self) -> usize {
        self.state.lock().callbacks.len()
    }

    /// Whether no callbacks are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a running subscription.
///
/// [`cancel`](Self::cancel) is idempotent. Dropping the handle does not
/// cancel the subscription.
#[must_use = "a subscription keeps running until cancelled"]
#[derive(Clone)]
pub struct Subscription {
    token: CancellationToken,
    registry: Arc<CancelRegistry>,
    gate: Gate,
}

impl Subscription {
    /// Wrap a token and its teardown registry.
    pub fn new(token: CancellationToken, registry: Arc<CancelRegistry>) -> Self {
        Self::gated(token, registry, Gate::default())
    }

    fn gated(token: CancellationToken, registry: Arc<CancelRegistry>, gate: Gate) -> Self {
        Self {
            token,
            registry,
            gate,
        }
    }

    /// A subscription that never emits. `sink` is held until cancel, so a
    /// stream attached to it stays open rather than ending.
    pub fn inert<T: 'static>(sink: Sink<T>) -> Self {
        let registry = Arc::new(CancelRegistry::new());
        registry.add(Box::new(move || drop(sink)));
        Self::new(CancellationToken::new(), registry)
    }

    /// Stop emissions, clear pending deferred work and remove every listener.
    ///
    /// Blocks while a snapshot of this subscription is being delivered on
    /// another thread.
    pub fn cancel(&self) {
        self.token.cancel();
        drop(self.gate.lock());
        self.registry.run_all();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.is_cancelled())
            .field("listeners", &self.registry.len())
            .finish()
    }
}

/// Sink wrapper that drops snapshots once the subscription is cancelled.
pub(crate) struct Emitter<T> {
    token: CancellationToken,
    gate: Gate,
    sink: Sink<T>,
}

impl<T> Emitter<T> {
    pub(crate) fn new(token: CancellationToken, sink: Sink<T>) -> Self {
        Self {
            token,
            gate: Gate::default(),
            sink,
        }
    }

    /// Handle cancelling this emitter and the listeners in `registry`.
    pub(crate) fn subscription(&self, registry: Arc<CancelRegistry>) -> Subscription {
        Subscription::gated(self.token.clone(), registry, Arc::clone(&self.gate))
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Compute and deliver a snapshot unless cancelled, holding the gate
    /// throughout. Returns whether it was delivered.
    pub(crate) fn emit_with(&self, compute: impl FnOnce() -> T) -> bool {
        let _gate = self.gate.lock();
        if self.token.is_cancelled() {
            return false;
        }
        (self.sink)(compute());
        true
    }
}

/// A subscription's snapshots as a [`Stream`].
///
/// Dropping the stream cancels the subscription. The stream ends once the
/// subscription has released every reference to its sink; an inert
/// subscription releases it on cancel.
pub struct SnapshotStream<T> {
    inner: UnboundedReceiverStream<T>,
    subscription: Subscription,
}

impl<T: Send + 'static> SnapshotStream<T> {
    /// Run `subscribe` with a sink feeding this stream.
    pub fn attach(subscribe: impl FnOnce(Sink<T>) -> Subscription) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink: Sink<T> = Arc::new(move |snapshot: T| {
            let _ = tx.send(snapshot);
        });
        let subscription = subscribe(sink);
        Self {
            inner: UnboundedReceiverStream::new(rx),
            subscription,
        }
    }
}

impl<T> SnapshotStream<T> {
    /// The underlying subscription.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Cancel the subscription. Snapshots already buffered are still yielded.
    pub fn cancel(&self) {
        self.subscription.cancel();
    }
}

impl<T> Stream for SnapshotStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

impl<T> Drop for SnapshotStream<T> {
    fn drop(&mut self) {
        self.subscription.cancel();
    }
}
