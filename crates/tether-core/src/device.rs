//! # Device Control Surface
//!
//! [`Device`] wraps one native device handle and exposes its commands as
//! futures:
//!
//! | Method                         | Resolves to                 |
//! |--------------------------------|-----------------------------|
//! | [`Device::get_frontmost_application`] | `Option<Application>` |
//! | [`Device::enumerate_applications`] | `Vec<Application>`      |
//! | [`Device::enumerate_processes`] | `Vec<Process>`             |
//! | [`Device::spawn`]              | pid of the new process      |
//! | [`Device::resume`]             | `()`                        |
//! | [`Device::kill`]               | `()`                        |
//! | [`Device::attach`]             | [`Session`]                 |
//!
//! Methods taking arguments validate them first and return
//! `Err(InvalidArgument)` without scheduling anything when they are bad.
//! Everything the engine reports comes back through the returned
//! [`Pending`].

use std::ffi::OsString;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{TetherError, TetherResult};
use crate::event_loop::LoopHandle;
use crate::handle::NativeHandle;
use crate::native::{
    AsyncResult, Completion, DeviceType, NativeApplication, NativeDevice, NativeList, NativeProcess, NativeResult,
    NativeSession,
};
use crate::operation::{schedule, HandleOwner, Operation, Pending};
use crate::types::{Application, Argv, Icon, Process, ProcessId, Session};

/// Control surface of one device
///
/// Holds one reference to the native device for as long as it lives.
/// Cloning takes another reference.
#[derive(Clone)]
pub struct Device
{
    handle: NativeHandle<dyn NativeDevice>,
    event_loop: LoopHandle,
}

impl Device
{
    /// Wrap `raw`, taking a reference of our own.
    #[must_use]
    pub fn new(event_loop: &LoopHandle, raw: &Arc<dyn NativeDevice>) -> Self
    {
        Self {
            handle: NativeHandle::acquire(raw),
            event_loop: event_loop.clone(),
        }
    }

    /// Wrap a raw handle that may be missing.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` ("expected raw handle") when `raw` is `None`.
    pub fn from_raw(event_loop: &LoopHandle, raw: Option<&Arc<dyn NativeDevice>>) -> TetherResult<Self>
    {
        Ok(Self {
            handle: NativeHandle::try_acquire(raw)?,
            event_loop: event_loop.clone(),
        })
    }

    /// Numeric device identifier.
    #[must_use]
    pub fn id(&self) -> u32
    {
        self.handle.borrow().id()
    }

    /// Human-readable device name.
    #[must_use]
    pub fn name(&self) -> String
    {
        self.handle.borrow().name()
    }

    /// Device icon, if any.
    #[must_use]
    pub fn icon(&self) -> Option<Icon>
    {
        self.handle.borrow().icon().as_ref().map(Icon::from_native)
    }

    /// How the device is reached.
    #[must_use]
    pub fn device_type(&self) -> DeviceType
    {
        self.handle.borrow().device_type()
    }

    /// Application currently in the foreground.
    ///
    /// Resolves to `None` when nothing is in the foreground; that is not an
    /// error.
    pub fn get_frontmost_application(&self) -> Pending<Option<Application>>
    {
        schedule(self, GetFrontmostApplicationOperation)
    }

    /// All applications installed on the device, in engine order.
    pub fn enumerate_applications(&self) -> Pending<Vec<Application>>
    {
        schedule(self, EnumerateApplicationsOperation)
    }

    /// All processes running on the device, in engine order.
    pub fn enumerate_processes(&self) -> Pending<Vec<Process>>
    {
        schedule(self, EnumerateProcessesOperation)
    }

    /// Spawn `argv[0]` with `argv`, suspended, in the host's environment.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` when `argv` is empty or holds anything but strings.
    ///
    /// ## Example
    ///
    /// ```rust,no_run
    /// # async fn demo(device: tether_core::Device, mut event_loop: tether_core::EventLoop) -> tether_core::TetherResult<()> {
    /// let pid = event_loop.drive(device.spawn(["/bin/cat", "/etc/hosts"])?).await?;
    /// event_loop.drive(device.resume(pid)?).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn<A>(&self, argv: A) -> TetherResult<Pending<u32>>
    where
        A: TryInto<Argv>,
        TetherError: From<A::Error>,
    {
        let argv = argv.try_into()?;
        let envp = host_environment();
        debug!(path = argv.path(), args = argv.len(), env = envp.len(), "spawning");
        Ok(schedule(self, SpawnOperation { argv, envp }))
    }

    /// Resume a spawned (suspended) process.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` unless `pid` is a positive integer.
    pub fn resume<P>(&self, pid: P) -> TetherResult<Pending<()>>
    where
        P: TryInto<ProcessId>,
        TetherError: From<P::Error>,
    {
        let pid = pid.try_into()?;
        Ok(schedule(self, ResumeOperation { pid }))
    }

    /// Kill a process.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` unless `pid` is a positive integer.
    pub fn kill<P>(&self, pid: P) -> TetherResult<Pending<()>>
    where
        P: TryInto<ProcessId>,
        TetherError: From<P::Error>,
    {
        let pid = pid.try_into()?;
        Ok(schedule(self, KillOperation { pid }))
    }

    /// Attach an instrumentation session to a process.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` unless `pid` is a positive integer.
    pub fn attach<P>(&self, pid: P) -> TetherResult<Pending<Session>>
    where
        P: TryInto<ProcessId>,
        TetherError: From<P::Error>,
    {
        let pid = pid.try_into()?;
        Ok(schedule(self, AttachOperation { pid }))
    }
}

impl HandleOwner for Device
{
    type Target = dyn NativeDevice;

    fn native_handle(&self) -> &NativeHandle<dyn NativeDevice>
    {
        &self.handle
    }

    fn event_loop(&self) -> &LoopHandle
    {
        &self.event_loop
    }
}

impl fmt::Debug for Device
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Device")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("type", &self.device_type())
            .finish()
    }
}

/// Snapshot of the host environment as `KEY=VALUE` entries.
fn host_environment() -> Vec<String>
{
    environment_entries(std::env::vars_os())
}

/// Entries that are not valid UTF-8 are left out rather than mangled.
fn environment_entries(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Vec<String>
{
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some(format!("{key}={value}")),
            (Ok(key), Err(_)) => {
                debug!(key = %key, "skipping environment variable with a non-UTF-8 value");
                None
            }
            (Err(key), _) => {
                debug!(key = ?key, "skipping environment variable with a non-UTF-8 name");
                None
            }
        })
        .collect()
}

/// Convert every element of `list` in order, releasing each element
/// reference right after its descriptor is built, then the list itself.
fn convert_list<T, D>(list: NativeList<T>, convert: impl Fn(&T) -> D) -> Vec<D>
{
    let size = list.size();
    let mut converted = Vec::with_capacity(size);
    for index in 0..size {
        if let Some(element) = list.get(index) {
            converted.push(convert(&element));
        }
    }
    drop(list);
    converted
}

struct GetFrontmostApplicationOperation;

impl Operation for GetFrontmostApplicationOperation
{
    type Target = dyn NativeDevice;
    type Native = Option<Arc<NativeApplication>>;
    type Output = Option<Application>;

    const NAME: &'static str = "get_frontmost_application";

    fn begin(&self, target: &dyn NativeDevice, done: Completion<Self::Native>)
    {
        target.get_frontmost_application(done);
    }

    fn end(&self, target: &dyn NativeDevice, result: AsyncResult<Self::Native>) -> NativeResult<Self::Native>
    {
        target.get_frontmost_application_finish(result)
    }

    fn result(&self, application: Self::Native) -> Option<Application>
    {
        application.map(|application| Application::from_native(&application))
    }
}

struct EnumerateApplicationsOperation;

impl Operation for EnumerateApplicationsOperation
{
    type Target = dyn NativeDevice;
    type Native = NativeList<NativeApplication>;
    type Output = Vec<Application>;

    const NAME: &'static str = "enumerate_applications";

    fn begin(&self, target: &dyn NativeDevice, done: Completion<Self::Native>)
    {
        target.enumerate_applications(done);
    }

    fn end(&self, target: &dyn NativeDevice, result: AsyncResult<Self::Native>) -> NativeResult<Self::Native>
    {
        target.enumerate_applications_finish(result)
    }

    fn result(&self, applications: Self::Native) -> Vec<Application>
    {
        convert_list(applications, Application::from_native)
    }
}

struct EnumerateProcessesOperation;

impl Operation for EnumerateProcessesOperation
{
    type Target = dyn NativeDevice;
    type Native = NativeList<NativeProcess>;
    type Output = Vec<Process>;

    const NAME: &'static str = "enumerate_processes";

    fn begin(&self, target: &dyn NativeDevice, done: Completion<Self::Native>)
    {
        target.enumerate_processes(done);
    }

    fn end(&self, target: &dyn NativeDevice, result: AsyncResult<Self::Native>) -> NativeResult<Self::Native>
    {
        target.enumerate_processes_finish(result)
    }

    fn result(&self, processes: Self::Native) -> Vec<Process>
    {
        convert_list(processes, Process::from_native)
    }
}

struct SpawnOperation
{
    argv: Argv,
    envp: Vec<String>,
}

impl Operation for SpawnOperation
{
    type Target = dyn NativeDevice;
    type Native = u32;
    type Output = u32;

    const NAME: &'static str = "spawn";

    fn begin(&self, target: &dyn NativeDevice, done: Completion<u32>)
    {
        target.spawn(self.argv.path(), self.argv.as_slice(), &self.envp, done);
    }

    fn end(&self, target: &dyn NativeDevice, result: AsyncResult<u32>) -> NativeResult<u32>
    {
        target.spawn_finish(result)
    }

    fn result(&self, pid: u32) -> u32
    {
        pid
    }
}

struct ResumeOperation
{
    pid: ProcessId,
}

impl Operation for ResumeOperation
{
    type Target = dyn NativeDevice;
    type Native = ();
    type Output = ();

    const NAME: &'static str = "resume";

    fn begin(&self, target: &dyn NativeDevice, done: Completion<()>)
    {
        target.resume(self.pid.raw(), done);
    }

    fn end(&self, target: &dyn NativeDevice, result: AsyncResult<()>) -> NativeResult<()>
    {
        target.resume_finish(result)
    }

    fn result(&self, (): ()) {}
}

struct KillOperation
{
    pid: ProcessId,
}

impl Operation for KillOperation
{
    type Target = dyn NativeDevice;
    type Native = ();
    type Output = ();

    const NAME: &'static str = "kill";

    fn begin(&self, target: &dyn NativeDevice, done: Completion<()>)
    {
        target.kill(self.pid.raw(), done);
    }

    fn end(&self, target: &dyn NativeDevice, result: AsyncResult<()>) -> NativeResult<()>
    {
        target.kill_finish(result)
    }

    fn result(&self, (): ()) {}
}

struct AttachOperation
{
    pid: ProcessId,
}

impl Operation for AttachOperation
{
    type Target = dyn NativeDevice;
    type Native = Arc<NativeSession>;
    type Output = Session;

    const NAME: &'static str = "attach";

    fn begin(&self, target: &dyn NativeDevice, done: Completion<Self::Native>)
    {
        target.attach(self.pid.raw(), done);
    }

    fn end(&self, target: &dyn NativeDevice, result: AsyncResult<Self::Native>) -> NativeResult<Self::Native>
    {
        target.attach_finish(result)
    }

    fn result(&self, session: Self::Native) -> Session
    {
        Session::from_native(session)
    }
}
