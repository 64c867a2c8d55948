//! # Device Manager Surface
//!
//! Entry point for discovering devices. Built on the same operation bridge
//! as [`Device`].

use std::fmt;
use std::sync::Arc;

use crate::device::Device;
use crate::event_loop::LoopHandle;
use crate::handle::NativeHandle;
use crate::native::{AsyncResult, Completion, NativeDevice, NativeDeviceManager, NativeList, NativeResult};
use crate::operation::{schedule, HandleOwner, Operation, Pending};

/// Control surface of a native device manager
#[derive(Clone)]
pub struct DeviceManager
{
    handle: NativeHandle<dyn NativeDeviceManager>,
    event_loop: LoopHandle,
}

impl DeviceManager
{
    /// Wrap `raw`, taking a reference of our own.
    #[must_use]
    pub fn new(event_loop: &LoopHandle, raw: &Arc<dyn NativeDeviceManager>) -> Self
    {
        Self {
            handle: NativeHandle::acquire(raw),
            event_loop: event_loop.clone(),
        }
    }

    /// Every device currently known to the manager, in engine order.
    ///
    /// Each [`Device`] holds its own reference to its native device.
    pub fn enumerate_devices(&self) -> Pending<Vec<Device>>
    {
        schedule(
            self,
            EnumerateDevicesOperation {
                event_loop: self.event_loop.clone(),
            },
        )
    }

    /// Close the manager. Always resolves successfully.
    pub fn close(&self) -> Pending<()>
    {
        schedule(self, CloseOperation)
    }
}

impl HandleOwner for DeviceManager
{
    type Target = dyn NativeDeviceManager;

    fn native_handle(&self) -> &NativeHandle<dyn NativeDeviceManager>
    {
        &self.handle
    }

    fn event_loop(&self) -> &LoopHandle
    {
        &self.event_loop
    }
}

impl fmt::Debug for DeviceManager
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("DeviceManager").field("handle", &self.handle).finish()
    }
}

struct EnumerateDevicesOperation
{
    event_loop: LoopHandle,
}

impl Operation for EnumerateDevicesOperation
{
    type Target = dyn NativeDeviceManager;
    type Native = NativeList<dyn NativeDevice>;
    type Output = Vec<Device>;

    const NAME: &'static str = "enumerate_devices";

    fn begin(&self, target: &dyn NativeDeviceManager, done: Completion<Self::Native>)
    {
        target.enumerate_devices(done);
    }

    fn end(&self, target: &dyn NativeDeviceManager, result: AsyncResult<Self::Native>) -> NativeResult<Self::Native>
    {
        target.enumerate_devices_finish(result)
    }

    fn result(&self, devices: Self::Native) -> Vec<Device>
    {
        let size = devices.size();
        let mut wrappers = Vec::with_capacity(size);
        for index in 0..size {
            if let Some(device) = devices.get(index) {
                wrappers.push(Device::new(&self.event_loop, &device));
            }
        }
        wrappers
    }
}

struct CloseOperation;

impl Operation for CloseOperation
{
    type Target = dyn NativeDeviceManager;
    type Native = ();
    type Output = ();

    const NAME: &'static str = "close";

    fn begin(&self, target: &dyn NativeDeviceManager, done: Completion<()>)
    {
        target.close(done);
    }

    fn end(&self, target: &dyn NativeDeviceManager, result: AsyncResult<()>) -> NativeResult<()>
    {
        target.close_finish(result);
        Ok(())
    }

    fn result(&self, (): ()) {}
}
