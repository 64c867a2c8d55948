//! # tether-core
//!
//! Asynchronous control of a remote instrumentation device.
//!
//! This crate drives a native device engine (discover applications and
//! processes, spawn, resume, kill, attach) and delivers every result back to
//! a caller that lives on its own single-threaded event loop.
//!
//! ## Architecture
//!
//! - [`native`]: the engine interface consumed here (`begin` / `*_finish`
//!   entry points, reference-counted engine objects) plus a simulated engine
//! - [`handle`]: owning wrapper around one engine reference
//! - [`event_loop`]: the caller's loop and the thread-safe settlement queue
//! - [`operation`]: the bridge that starts a native call, collects its
//!   completion on an engine thread and settles the caller's future on the loop
//! - [`device`] / [`device_manager`]: the control surfaces
//! - [`types`]: validated arguments and result descriptors
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
//! let pid = event_loop.drive(device.spawn(["/bin/sleep", "10"])?).await?;
//! let session = event_loop.drive(device.attach(pid)?).await?;
//! event_loop.drive(device.resume(pid)?).await?;
//! println!("attached to {}", session.pid());
//! # Ok(())
//! # }
//! ```
//!
//! ## Limitations
//!
//! There is no cancellation and no timeout: once scheduled, an operation runs
//! until the engine completes it, successfully or with an error.

pub mod device;
pub mod device_manager;
pub mod error;
pub mod event_loop;
pub mod handle;
pub mod native;
pub mod operation;
pub mod prelude;
pub mod types;

pub use device::Device;
pub use device_manager::DeviceManager;
// Re-export commonly used types
pub use error::{TetherError, TetherResult};
pub use event_loop::{EventLoop, LoopHandle};
pub use handle::NativeHandle;
pub use native::DeviceType;
pub use operation::{Pending, Phase};
pub use types::{Application, Argv, Icon, Process, ProcessId, Session, Value};
