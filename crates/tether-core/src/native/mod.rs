//! # Native Engine Interface
//!
//! The contract this crate consumes from the underlying device engine.
//!
//! The engine performs every device operation asynchronously on threads of
//! its own. Each operation is a pair of entry points:
//!
//! - `begin(args..., done)` starts the call and returns immediately. The engine
//!   invokes `done` exactly once, on a thread of its choosing, with an
//!   [`AsyncResult`] completion token.
//! - `*_finish(token)` turns that token into the typed value or a
//!   [`NativeError`]. It is called exactly once per completion.
//!
//! Objects handed out by the engine (devices, applications, processes,
//! sessions and the lists holding them) are reference counted through `Arc`.
//!
//! [`simulated`] provides an in-process engine used by the demo and tests.

pub mod simulated;

use std::fmt;
use std::sync::Arc;

/// Result of a `*_finish` call
pub type NativeResult<T> = std::result::Result<T, NativeError>;

/// Completion callback passed to every `begin` entry point
///
/// May be invoked from any thread, including synchronously from within
/// `begin` itself.
pub type Completion<T> = Box<dyn FnOnce(AsyncResult<T>) + Send + 'static>;

/// Completion token produced by the engine for one call
///
/// Opaque to the bridge: it is only ever handed back to the matching
/// `*_finish` entry point.
#[derive(Debug)]
pub struct AsyncResult<T>
{
    outcome: NativeResult<T>,
}

impl<T> AsyncResult<T>
{
    /// Token for a call that succeeded with `value`.
    pub fn succeeded(value: T) -> Self
    {
        Self { outcome: Ok(value) }
    }

    /// Token for a call that failed with `error`.
    pub fn failed(error: NativeError) -> Self
    {
        Self { outcome: Err(error) }
    }

    /// Extract the outcome. Used by the default `*_finish` implementations.
    pub fn propagate(self) -> NativeResult<T>
    {
        self.outcome
    }
}

impl<T> From<NativeResult<T>> for AsyncResult<T>
{
    fn from(outcome: NativeResult<T>) -> Self
    {
        Self { outcome }
    }
}

/// Error domain of the native engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeErrorCode
{
    /// The device-side agent is not running
    ServerNotRunning,
    /// The executable to spawn does not exist
    ExecutableNotFound,
    /// The executable exists but cannot be spawned on this device
    ExecutableNotSupported,
    /// No process with the requested pid
    ProcessNotFound,
    /// The process exists but stopped responding
    ProcessNotResponding,
    /// The engine rejected an argument
    InvalidArgument,
    /// The operation is not valid in the current state
    InvalidOperation,
    /// Insufficient privileges on the device
    PermissionDenied,
    /// A required address or port is already in use
    AddressInUse,
    /// The engine gave up waiting
    TimedOut,
    /// The device does not support the operation
    NotSupported,
    /// The device spoke out of turn
    ProtocolViolation,
    /// The transport to the device failed or disconnected
    Transport,
}

impl NativeErrorCode
{
    /// Generic description used when the engine supplies no message.
    #[must_use]
    pub fn description(self) -> &'static str
    {
        match self {
            Self::ServerNotRunning => "Unable to connect to remote server",
            Self::ExecutableNotFound => "Unable to find executable",
            Self::ExecutableNotSupported => "Unable to spawn executable",
            Self::ProcessNotFound => "Unable to find process",
            Self::ProcessNotResponding => "Process is not responding",
            Self::InvalidArgument => "Invalid argument",
            Self::InvalidOperation => "Invalid operation",
            Self::PermissionDenied => "Permission denied",
            Self::AddressInUse => "Address already in use",
            Self::TimedOut => "Timed out",
            Self::NotSupported => "Not supported",
            Self::ProtocolViolation => "Protocol violation",
            Self::Transport => "Connection to device lost",
        }
    }
}

/// Error object reported by the native engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError
{
    /// Error domain code
    pub code: NativeErrorCode,
    /// Human-readable message, passed through to callers untouched
    pub message: String,
}

impl NativeError
{
    /// Create a new native error.
    pub fn new(code: NativeErrorCode, message: impl Into<String>) -> Self
    {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for NativeError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.message.is_empty() {
            f.write_str(self.code.description())
        } else {
            f.write_str(&self.message)
        }
    }
}

impl std::error::Error for NativeError {}

/// Kind of device behind a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType
{
    /// The machine the engine runs on
    Local,
    /// A device reached over a tethered link (USB)
    Tether,
    /// A device reached over the network
    Remote,
}

impl fmt::Display for DeviceType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(match self {
            Self::Local => "local",
            Self::Tether => "tether",
            Self::Remote => "remote",
        })
    }
}

/// Raw RGBA bitmap as the engine stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeIcon
{
    pub width: u32,
    pub height: u32,
    pub rowstride: u32,
    pub pixels: Vec<u8>,
}

/// Installed application known to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeApplication
{
    pub identifier: String,
    pub name: String,
    /// Pid of the running instance, 0 when not running
    pub pid: u32,
    pub small_icon: Option<NativeIcon>,
    pub large_icon: Option<NativeIcon>,
}

/// Running process on the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeProcess
{
    pub pid: u32,
    pub name: String,
    pub small_icon: Option<NativeIcon>,
    pub large_icon: Option<NativeIcon>,
}

/// Instrumentation session attached to one process
#[derive(Debug, PartialEq, Eq)]
pub struct NativeSession
{
    pid: u32,
}

impl NativeSession
{
    pub fn new(pid: u32) -> Self
    {
        Self { pid }
    }

    /// Pid of the process this session is attached to.
    pub fn pid(&self) -> u32
    {
        self.pid
    }
}

/// Ordered, reference-counted list returned by enumeration calls
///
/// Like the engine's own list types, [`NativeList::get`] hands out a new
/// reference to the element; the caller releases it by dropping it.
pub struct NativeList<T: ?Sized>
{
    items: Vec<Arc<T>>,
}

impl<T: ?Sized> NativeList<T>
{
    pub fn new(items: Vec<Arc<T>>) -> Self
    {
        Self { items }
    }

    /// Number of elements.
    pub fn size(&self) -> usize
    {
        self.items.len()
    }

    /// New reference to element `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<Arc<T>>
    {
        self.items.get(index).map(Arc::clone)
    }
}

impl<T: ?Sized> FromIterator<Arc<T>> for NativeList<T>
{
    fn from_iter<I: IntoIterator<Item = Arc<T>>>(iter: I) -> Self
    {
        Self::new(iter.into_iter().collect())
    }
}

impl<T: ?Sized> fmt::Debug for NativeList<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("NativeList").field("size", &self.items.len()).finish()
    }
}

/// Native device handle
///
/// Property getters are synchronous; everything else follows the
/// begin / finish shape described in the module docs. The `*_finish`
/// methods have default implementations that simply unwrap the token, which
/// is what every engine in this crate needs.
pub trait NativeDevice: Send + Sync
{
    /// Numeric device identifier.
    fn id(&self) -> u32;

    /// Human-readable device name.
    fn name(&self) -> String;

    /// Device icon, if the device has one.
    fn icon(&self) -> Option<NativeIcon>;

    /// How the device is reached.
    fn device_type(&self) -> DeviceType;

    /// Query the application currently in the foreground.
    ///
    /// Completing with `None` means no application is in the foreground.
    fn get_frontmost_application(&self, done: Completion<Option<Arc<NativeApplication>>>);

    fn get_frontmost_application_finish(
        &self,
        result: AsyncResult<Option<Arc<NativeApplication>>>,
    ) -> NativeResult<Option<Arc<NativeApplication>>>
    {
        result.propagate()
    }

    fn enumerate_applications(&self, done: Completion<NativeList<NativeApplication>>);

    fn enumerate_applications_finish(
        &self,
        result: AsyncResult<NativeList<NativeApplication>>,
    ) -> NativeResult<NativeList<NativeApplication>>
    {
        result.propagate()
    }

    fn enumerate_processes(&self, done: Completion<NativeList<NativeProcess>>);

    fn enumerate_processes_finish(&self, result: AsyncResult<NativeList<NativeProcess>>) -> NativeResult<NativeList<NativeProcess>>
    {
        result.propagate()
    }

    /// Spawn `path` suspended. `envp` holds `KEY=VALUE` entries.
    fn spawn(&self, path: &str, argv: &[String], envp: &[String], done: Completion<u32>);

    fn spawn_finish(&self, result: AsyncResult<u32>) -> NativeResult<u32>
    {
        result.propagate()
    }

    fn resume(&self, pid: u32, done: Completion<()>);

    fn resume_finish(&self, result: AsyncResult<()>) -> NativeResult<()>
    {
        result.propagate()
    }

    fn kill(&self, pid: u32, done: Completion<()>);

    fn kill_finish(&self, result: AsyncResult<()>) -> NativeResult<()>
    {
        result.propagate()
    }

    fn attach(&self, pid: u32, done: Completion<Arc<NativeSession>>);

    fn attach_finish(&self, result: AsyncResult<Arc<NativeSession>>) -> NativeResult<Arc<NativeSession>>
    {
        result.propagate()
    }
}

/// Native device manager handle
pub trait NativeDeviceManager: Send + Sync
{
    fn enumerate_devices(&self, done: Completion<NativeList<dyn NativeDevice>>);

    fn enumerate_devices_finish(&self, result: AsyncResult<NativeList<dyn NativeDevice>>) -> NativeResult<NativeList<dyn NativeDevice>>
    {
        result.propagate()
    }

    fn close(&self, done: Completion<()>);

    /// Closing reports no error; a failed close is final either way.
    fn close_finish(&self, result: AsyncResult<()>)
    {
        if let Err(err) = result.propagate() {
            tracing::debug!(error = %err, "device manager close reported an error");
        }
    }
}
