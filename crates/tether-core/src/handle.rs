//! # Native Resource Handles
//!
//! Owning wrapper around one reference to an engine object.
//!
//! A [`NativeHandle`] holds exactly one strong reference for its whole
//! lifetime: taken in [`NativeHandle::acquire`] (the caller's reference is
//! borrowed, never stolen) and given back when the handle is dropped or
//! [`released`](NativeHandle::release). Because release consumes the handle,
//! the engine object can never be reached through it afterwards.
//!
//! Every component that may outlive its creator takes its own handle with
//! [`NativeHandle::share`]. In-flight operations do exactly that, which is
//! what keeps a device alive while a call is pending even if the caller
//! dropped its `Device`.

use std::fmt;
use std::sync::Arc;

use crate::error::{TetherError, TetherResult};

/// Owning reference to an engine object of type `T`
pub struct NativeHandle<T: ?Sized>
{
    raw: Arc<T>,
}

impl<T: ?Sized> NativeHandle<T>
{
    /// Take a new reference to `raw`.
    #[must_use]
    pub fn acquire(raw: &Arc<T>) -> Self
    {
        Self { raw: Arc::clone(raw) }
    }

    /// Take a new reference to `raw`, rejecting a missing handle.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` when `raw` is `None`; no handle is constructed.
    pub fn try_acquire(raw: Option<&Arc<T>>) -> TetherResult<Self>
    {
        raw.map(Self::acquire).ok_or_else(|| TetherError::bad_argument("raw handle"))
    }

    /// Another owning handle to the same object.
    #[must_use]
    pub fn share(&self) -> Self
    {
        Self::acquire(&self.raw)
    }

    /// Access the engine object for the duration of a call.
    pub fn borrow(&self) -> &T
    {
        &self.raw
    }

    /// Give the reference back to the engine.
    pub fn release(self)
    {
        drop(self);
    }

    /// Current strong count of the underlying object, this handle included.
    #[must_use]
    pub fn ref_count(&self) -> usize
    {
        Arc::strong_count(&self.raw)
    }
}

impl<T: ?Sized> Clone for NativeHandle<T>
{
    fn clone(&self) -> Self
    {
        self.share()
    }
}

impl<T: ?Sized> fmt::Debug for NativeHandle<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("NativeHandle")
            .field("object", &Arc::as_ptr(&self.raw).cast::<()>())
            .field("ref_count", &Arc::strong_count(&self.raw))
            .finish()
    }
}
