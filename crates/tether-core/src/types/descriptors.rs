//! Caller-visible result objects and the converters that build them from
//! engine objects.
//!
//! Converters never keep the engine reference they are given: applications,
//! processes and icons are plain value copies. The one exception is
//! [`Session`], which owns a handle to its engine session.

use std::fmt;
use std::sync::Arc;

use crate::handle::NativeHandle;
use crate::native::{NativeApplication, NativeIcon, NativeProcess, NativeSession};
use crate::types::ProcessId;

/// RGBA bitmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon
{
    pub width: u32,
    pub height: u32,
    pub rowstride: u32,
    pub pixels: Vec<u8>,
}

impl Icon
{
    pub(crate) fn from_native(icon: &NativeIcon) -> Self
    {
        Self {
            width: icon.width,
            height: icon.height,
            rowstride: icon.rowstride,
            pixels: icon.pixels.clone(),
        }
    }
}

/// Application installed on a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application
{
    /// Bundle or package identifier
    pub identifier: String,
    /// Display name
    pub name: String,
    /// Pid of the running instance, `None` when not running
    pub pid: Option<ProcessId>,
    pub small_icon: Option<Icon>,
    pub large_icon: Option<Icon>,
}

impl Application
{
    /// Build the descriptor; the engine reference stays with the caller.
    pub(crate) fn from_native(application: &NativeApplication) -> Self
    {
        Self {
            identifier: application.identifier.clone(),
            name: application.name.clone(),
            pid: ProcessId::try_from(application.pid).ok(),
            small_icon: application.small_icon.as_ref().map(Icon::from_native),
            large_icon: application.large_icon.as_ref().map(Icon::from_native),
        }
    }

    /// Whether the application currently has a running process.
    #[must_use]
    pub fn is_running(&self) -> bool
    {
        self.pid.is_some()
    }
}

/// Process running on a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process
{
    pub pid: u32,
    pub name: String,
    pub small_icon: Option<Icon>,
    pub large_icon: Option<Icon>,
}

impl Process
{
    /// Build the descriptor; the engine reference stays with the caller.
    pub(crate) fn from_native(process: &NativeProcess) -> Self
    {
        Self {
            pid: process.pid,
            name: process.name.clone(),
            small_icon: process.small_icon.as_ref().map(Icon::from_native),
            large_icon: process.large_icon.as_ref().map(Icon::from_native),
        }
    }
}

/// Instrumentation session attached to a process
///
/// Owns one reference to the engine session for as long as it lives.
pub struct Session
{
    handle: NativeHandle<NativeSession>,
}

impl Session
{
    /// Take ownership of the session; `session` itself is released here.
    pub(crate) fn from_native(session: Arc<NativeSession>) -> Self
    {
        let handle = NativeHandle::acquire(&session);
        drop(session);
        Self { handle }
    }

    /// Pid of the process this session is attached to.
    #[must_use]
    pub fn pid(&self) -> u32
    {
        self.handle.borrow().pid()
    }
}

impl fmt::Debug for Session
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Session").field("pid", &self.pid()).finish()
    }
}
