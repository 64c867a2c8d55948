//! # Error Types
//!
//! Errors surfaced by the device control bridge.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! ## Propagation
//!
//! - Argument errors are returned synchronously by the control surface
//!   methods, before anything is scheduled.
//! - Native errors only ever arrive through a rejected [`crate::Pending`].

use std::convert::Infallible;

use thiserror::Error;

use crate::native::NativeError;

/// Main error type for device control operations
///
/// ## Error Categories
///
/// 1. **Argument errors**: InvalidArgument (detected before scheduling)
/// 2. **Native errors**: Native (reported by the engine when an operation finishes)
/// 3. **Lifecycle errors**: Abandoned (the caller's event loop went away)
#[derive(Error, Debug)]
pub enum TetherError
{
    /// Malformed input from the caller
    ///
    /// Examples:
    /// - A pid that is not a number, or not positive
    /// - An empty argv, or an argv element that is not a string
    /// - A missing raw device handle
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The native engine failed the operation
    ///
    /// Displays the engine's message verbatim. Never retried by this layer.
    #[error("{0}")]
    Native(#[from] NativeError),

    /// The operation can no longer settle
    ///
    /// This happens when the [`crate::EventLoop`] that owns the settlement
    /// queue was dropped while the operation was still in flight.
    #[error("Operation abandoned: the event loop shut down before it settled")]
    Abandoned,
}

impl TetherError
{
    /// Build an argument error.
    pub(crate) fn bad_argument(what: &str) -> Self
    {
        Self::InvalidArgument(format!("Bad argument, expected {what}"))
    }

    /// The native error behind this failure, if any.
    #[must_use]
    pub fn native(&self) -> Option<&NativeError>
    {
        match self {
            Self::Native(err) => Some(err),
            _ => None,
        }
    }
}

/// Lets already-validated arguments (a `ProcessId`, an `Argv`) go through the
/// same fallible conversions as raw ones.
impl From<Infallible> for TetherError
{
    fn from(never: Infallible) -> Self
    {
        match never {}
    }
}

/// Convenience type alias for `Result<T, TetherError>`
///
/// ```rust
/// use tether_core::error::TetherResult;
/// fn foo() -> TetherResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type TetherResult<T> = std::result::Result<T, TetherError>;
