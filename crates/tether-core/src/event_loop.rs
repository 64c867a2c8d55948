//! # Caller Event Loop
//!
//! The settlement side of the bridge.
//!
//! Native completions fire on engine threads. They never touch a caller's
//! future directly: each one posts a single [`Settlement`] to the queue owned
//! by an [`EventLoop`], and the loop runs it on its own thread. That queue is
//! the only cross-thread synchronization point in the crate.
//!
//! [`EventLoop`] is deliberately `!Send`: it stays on the thread that created
//! it, so every settlement (and every result conversion) runs there.
//! [`LoopHandle`] is the cloneable, thread-safe producer side.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tether_core::native::simulated::SimulatedDevice;
//! use tether_core::native::NativeDevice;
//! use tether_core::{Device, EventLoop};
//!
//! # async fn demo() -> tether_core::TetherResult<()> {
//! let mut event_loop = EventLoop::new();
//! let raw: Arc<dyn NativeDevice> = Arc::new(SimulatedDevice::new());
//! let device = Device::new(&event_loop.handle(), &raw);
//!
//! let processes = event_loop.drive(device.enumerate_processes()).await?;
//! println!("{} processes", processes.len());
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace};

/// One queued settlement: resolves or rejects exactly one operation
pub(crate) struct Settlement
{
    id: u64,
    operation: &'static str,
    job: Box<dyn FnOnce() + Send + 'static>,
}

impl Settlement
{
    pub(crate) fn new(id: u64, operation: &'static str, job: impl FnOnce() + Send + 'static) -> Self
    {
        Self {
            id,
            operation,
            job: Box::new(job),
        }
    }

    fn run(self)
    {
        trace!(id = self.id, operation = self.operation, "running settlement");
        (self.job)();
    }
}

/// Thread-safe handle used to post settlements to an [`EventLoop`]
#[derive(Clone)]
pub struct LoopHandle
{
    queue: mpsc::UnboundedSender<Settlement>,
    next_id: Arc<AtomicU64>,
}

impl LoopHandle
{
    /// Whether the owning [`EventLoop`] is gone.
    ///
    /// Operations scheduled against a closed loop are rejected immediately
    /// with [`crate::TetherError::Abandoned`].
    #[must_use]
    pub fn is_closed(&self) -> bool
    {
        self.queue.is_closed()
    }

    pub(crate) fn next_operation_id(&self) -> u64
    {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Queue a settlement; hands it back if the loop has shut down.
    pub(crate) fn post(&self, settlement: Settlement) -> Result<(), Settlement>
    {
        self.queue.send(settlement).map_err(|err| err.0)
    }
}

impl std::fmt::Debug for LoopHandle
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("LoopHandle").field("closed", &self.is_closed()).finish()
    }
}

/// Single-threaded event loop that settles operations
pub struct EventLoop
{
    queue: mpsc::UnboundedReceiver<Settlement>,
    handle: LoopHandle,
    _not_send: PhantomData<Rc<()>>,
}

impl EventLoop
{
    /// Create a loop bound to the current thread.
    #[must_use]
    pub fn new() -> Self
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            queue: receiver,
            handle: LoopHandle {
                queue: sender,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            _not_send: PhantomData,
        }
    }

    /// Producer handle for control surfaces and engine callbacks.
    #[must_use]
    pub fn handle(&self) -> LoopHandle
    {
        self.handle.clone()
    }

    /// Run every settlement that is already queued, without waiting.
    ///
    /// Returns how many settlements ran.
    pub fn run_pending(&mut self) -> usize
    {
        let mut settled = 0;
        while let Ok(settlement) = self.queue.try_recv() {
            settlement.run();
            settled += 1;
        }
        settled
    }

    /// Await `future` while settling operations as their completions arrive.
    pub async fn drive<F: Future>(&mut self, future: F) -> F::Output
    {
        tokio::pin!(future);
        loop {
            tokio::select! {
                biased;
                output = &mut future => return output,
                Some(settlement) = self.queue.recv() => settlement.run(),
            }
        }
    }

    /// Settle operations until no [`LoopHandle`] remains anywhere.
    ///
    /// Devices and in-flight operations hold handles, so this returns once
    /// all of them have been dropped.
    pub async fn run(self)
    {
        let Self { mut queue, handle, .. } = self;
        drop(handle);

        let mut settled = 0_u64;
        while let Some(settlement) = queue.recv().await {
            settlement.run();
            settled += 1;
        }
        debug!(settled, "event loop finished");
    }
}

impl Default for EventLoop
{
    fn default() -> Self
    {
        Self::new()
    }
}
