//! Common module for library exports

pub use crate::device::Device;
pub use crate::device_manager::DeviceManager;
pub use crate::error::{TetherError, TetherResult};
pub use crate::event_loop::{EventLoop, LoopHandle};
pub use crate::native::{DeviceType, NativeDevice, NativeDeviceManager};
pub use crate::operation::Pending;
pub use crate::types::{Application, Argv, Process, ProcessId, Session, Value};
