//! # Asynchronous Operation Bridge
//!
//! Generic machinery shared by every control surface call.
//!
//! An operation is a small, single-use value implementing [`Operation`]:
//!
//! - `begin` issues exactly one native call, handing the engine a completion
//!   callback owned by the bridge.
//! - `end` runs inside that callback, on whatever thread the engine used, and
//!   turns the completion token into a value or a [`NativeError`].
//! - `result` runs on the caller's [`EventLoop`](crate::EventLoop) thread and
//!   converts the value into what the caller sees. It only runs on success.
//!
//! ## Lifecycle
//!
//! ```text
//! Created -> Scheduled -> NativeCallInFlight -> Completed -> Settled
//! ```
//!
//! Each step consumes the state of the previous one (the completion callback
//! is `FnOnce`, the settlement is queued once, the result sink is a oneshot
//! sender), so an operation cannot complete or settle twice. The only
//! shortcut is `Scheduled -> Settled`, taken when the event loop is already
//! gone and no native call is issued.
//!
//! ## Lifetime of the target
//!
//! [`schedule`] takes its own [`NativeHandle`] on the target and moves it
//! through the callback into the settlement. The engine object therefore
//! stays alive until the operation settles, whatever the caller does with
//! its own wrapper in the meantime.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::error::{TetherError, TetherResult};
use crate::event_loop::{LoopHandle, Settlement};
use crate::handle::NativeHandle;
use crate::native::{AsyncResult, Completion, NativeError, NativeResult};

/// Lifecycle phase of an operation, as reported in trace logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase
{
    /// Constructed, not yet handed to the engine
    Created,
    /// Holding its own reference to the target
    Scheduled,
    /// Native call issued, waiting for the completion callback
    NativeCallInFlight,
    /// Completion callback ran and the outcome was extracted
    Completed,
    /// Future resolved or rejected on the event loop
    Settled,
}

impl fmt::Display for Phase
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(match self {
            Self::Created => "created",
            Self::Scheduled => "scheduled",
            Self::NativeCallInFlight => "in-flight",
            Self::Completed => "completed",
            Self::Settled => "settled",
        })
    }
}

/// One kind of device command
///
/// Implemented only by the operation types of this crate, one per control
/// surface method.
pub(crate) trait Operation: Send + Sync + 'static
{
    /// Engine object the operation runs against
    type Target: ?Sized + Send + Sync + 'static;
    /// Value extracted from the completion token
    type Native: Send + 'static;
    /// Value delivered to the caller
    type Output: Send + 'static;

    /// Name used in logs
    const NAME: &'static str;

    /// Issue the native call. Must pass `done` to exactly one `begin` entry point.
    fn begin(&self, target: &Self::Target, done: Completion<Self::Native>);

    /// Extract the outcome through the matching `*_finish` entry point.
    fn end(&self, target: &Self::Target, result: AsyncResult<Self::Native>) -> NativeResult<Self::Native>;

    /// Convert a successful outcome into the caller-visible value.
    fn result(&self, value: Self::Native) -> Self::Output;
}

/// Anything that owns a native handle and knows its caller's event loop
pub(crate) trait HandleOwner
{
    type Target: ?Sized + Send + Sync + 'static;

    fn native_handle(&self) -> &NativeHandle<Self::Target>;

    fn event_loop(&self) -> &LoopHandle;
}

/// Start `operation` against `owner`'s handle and return its future.
///
/// Never blocks; the native call does the waiting.
pub(crate) fn schedule<O, W>(owner: &W, operation: O) -> Pending<O::Output>
where
    O: Operation,
    W: HandleOwner<Target = O::Target>,
{
    let event_loop = owner.event_loop().clone();
    let id = event_loop.next_operation_id();
    let (sink, receiver) = oneshot::channel();
    let pending = Pending {
        id,
        receiver: Some(receiver),
    };
    trace!(id, operation = O::NAME, phase = %Phase::Created);

    if event_loop.is_closed() {
        warn!(id, operation = O::NAME, "event loop is gone, rejecting without a native call");
        // The receiver is alive in `pending`, so this cannot fail.
        let _ = sink.send(Err(TetherError::Abandoned));
        trace!(id, operation = O::NAME, phase = %Phase::Settled);
        return pending;
    }

    let target = owner.native_handle().share();
    let operation = Arc::new(operation);
    trace!(id, operation = O::NAME, refs = target.ref_count(), phase = %Phase::Scheduled);

    let in_flight = InFlight {
        id,
        operation: Arc::clone(&operation),
        target: target.share(),
        event_loop,
        sink,
    };

    trace!(id, operation = O::NAME, phase = %Phase::NativeCallInFlight);
    operation.begin(target.borrow(), Box::new(move |result| in_flight.complete(result)));
    target.release();

    pending
}

/// State carried from `begin` to settlement
struct InFlight<O: Operation>
{
    id: u64,
    operation: Arc<O>,
    target: NativeHandle<O::Target>,
    event_loop: LoopHandle,
    sink: oneshot::Sender<TetherResult<O::Output>>,
}

impl<O: Operation> InFlight<O>
{
    /// Completion callback body; runs on an engine thread.
    fn complete(self, result: AsyncResult<O::Native>)
    {
        let Self {
            id,
            operation,
            target,
            event_loop,
            sink,
        } = self;

        let outcome = operation.end(target.borrow(), result);
        trace!(id, operation = O::NAME, ok = outcome.is_ok(), phase = %Phase::Completed);

        let settlement = Settlement::new(id, O::NAME, move || {
            settle(id, operation.as_ref(), outcome, sink);
            target.release();
        });

        if event_loop.post(settlement).is_err() {
            // Dropping the settlement drops the sink; the caller sees Abandoned.
            warn!(id, operation = O::NAME, "event loop shut down before settlement could be delivered");
        }
    }
}

/// Settlement body; runs on the event loop thread.
fn settle<O: Operation>(
    id: u64,
    operation: &O,
    outcome: Result<O::Native, NativeError>,
    sink: oneshot::Sender<TetherResult<O::Output>>,
)
{
    let settled = match outcome {
        Ok(value) => Ok(operation.result(value)),
        Err(err) => {
            debug!(id, operation = O::NAME, error = %err, "native call failed");
            Err(TetherError::Native(err))
        }
    };
    trace!(id, operation = O::NAME, phase = %Phase::Settled);

    if sink.send(settled).is_err() {
        debug!(id, operation = O::NAME, "caller dropped the future before it settled");
    }
}

/// Caller-visible future of one operation
///
/// Resolves once the operation settles on its event loop. Resolves to
/// [`TetherError::Abandoned`] if that can no longer happen.
#[must_use = "an operation's outcome is only observable through its Pending"]
pub struct Pending<T>
{
    id: u64,
    /// `None` once the outcome has been taken
    receiver: Option<oneshot::Receiver<TetherResult<T>>>,
}

impl<T> Pending<T>
{
    /// Identifier of the operation, as it appears in logs.
    pub fn id(&self) -> u64
    {
        self.id
    }

    /// Take the outcome if the operation has already settled.
    ///
    /// Returns `None` while it is still pending. The outcome can be taken
    /// once; later calls report [`TetherError::Abandoned`].
    pub fn try_take(&mut self) -> Option<TetherResult<T>>
    {
        let Some(receiver) = self.receiver.as_mut() else {
            return Some(Err(TetherError::Abandoned));
        };
        let taken = match receiver.try_recv() {
            Ok(settled) => settled,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Err(TetherError::Abandoned),
        };
        self.receiver = None;
        Some(taken)
    }
}

impl<T> Future for Pending<T>
{
    type Output = TetherResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output>
    {
        let this = self.get_mut();
        let Some(receiver) = this.receiver.as_mut() else {
            return Poll::Ready(Err(TetherError::Abandoned));
        };
        let settled = ready!(Pin::new(receiver).poll(cx)).unwrap_or(Err(TetherError::Abandoned));
        this.receiver = None;
        Poll::Ready(settled)
    }
}

impl<T> fmt::Debug for Pending<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Pending").field("id", &self.id).finish_non_exhaustive()
    }
}
