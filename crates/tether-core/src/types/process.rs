//! Process identifiers and spawn arguments, with the validation the control
//! surface applies before anything is scheduled.

use std::fmt;

use tracing::debug;

use super::Value;
use crate::error::{TetherError, TetherResult};

/// Process identifier (PID)
///
/// Always positive. The only way to obtain one is through the `TryFrom`
/// conversions below, which is how the control surface rejects bad pids
/// before issuing a native call.
///
/// ## Why wrap it in a struct?
///
/// A raw integer could be zero, negative, or simply the wrong number; the
/// newtype carries the "already validated" guarantee through the API.
///
/// ## Example
///
/// ```rust
/// use tether_core::types::ProcessId;
///
/// let pid = ProcessId::try_from(1234).unwrap();
/// assert_eq!(pid.raw(), 1234);
/// assert!(ProcessId::try_from(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(u32);

impl ProcessId
{
    /// Get the raw `u32` representation of the pid
    #[must_use]
    pub fn raw(&self) -> u32
    {
        self.0
    }

    fn expected() -> TetherError
    {
        TetherError::bad_argument("pid")
    }
}

impl fmt::Display for ProcessId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

impl From<ProcessId> for u32
{
    fn from(pid: ProcessId) -> Self
    {
        pid.0
    }
}

impl TryFrom<i64> for ProcessId
{
    type Error = TetherError;

    fn try_from(value: i64) -> TetherResult<Self>
    {
        match u32::try_from(value) {
            Ok(pid) if pid > 0 => Ok(Self(pid)),
            _ => Err(Self::expected()),
        }
    }
}

impl TryFrom<i32> for ProcessId
{
    type Error = TetherError;

    fn try_from(value: i32) -> TetherResult<Self>
    {
        Self::try_from(i64::from(value))
    }
}

impl TryFrom<u32> for ProcessId
{
    type Error = TetherError;

    fn try_from(value: u32) -> TetherResult<Self>
    {
        Self::try_from(i64::from(value))
    }
}

/// Numbers are truncated toward zero first, so `12.9` is pid 12.
impl TryFrom<f64> for ProcessId
{
    type Error = TetherError;

    #[allow(clippy::cast_possible_truncation)]
    fn try_from(value: f64) -> TetherResult<Self>
    {
        if !value.is_finite() {
            return Err(Self::expected());
        }
        let truncated = value.trunc();
        if truncated < 1.0 || truncated > f64::from(u32::MAX) {
            return Err(Self::expected());
        }
        Ok(Self(truncated as u32))
    }
}

impl TryFrom<&Value> for ProcessId
{
    type Error = TetherError;

    fn try_from(value: &Value) -> TetherResult<Self>
    {
        match value {
            Value::Number(number) => Self::try_from(*number),
            other => {
                debug!(got = other.type_name(), "pid argument is not a number");
                Err(Self::expected())
            }
        }
    }
}

impl TryFrom<Value> for ProcessId
{
    type Error = TetherError;

    fn try_from(value: Value) -> TetherResult<Self>
    {
        Self::try_from(&value)
    }
}

/// Argument vector for spawn
///
/// Non-empty; element 0 is the path of the executable. Holds its own copy of
/// every string, so nothing the caller does after the call can change what
/// gets spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argv(Vec<String>);

impl Argv
{
    /// Path of the executable (`argv[0]`).
    #[must_use]
    pub fn path(&self) -> &str
    {
        &self.0[0]
    }

    /// All arguments, path included.
    #[must_use]
    pub fn as_slice(&self) -> &[String]
    {
        &self.0
    }

    /// Number of arguments, path included. Never zero.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.0.len()
    }

    /// Always `false`; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.0.is_empty()
    }

    fn expected() -> TetherError
    {
        TetherError::bad_argument("argv as an array of strings")
    }
}

impl TryFrom<Vec<String>> for Argv
{
    type Error = TetherError;

    fn try_from(args: Vec<String>) -> TetherResult<Self>
    {
        if args.is_empty() {
            return Err(Self::expected());
        }
        Ok(Self(args))
    }
}

impl TryFrom<&[&str]> for Argv
{
    type Error = TetherError;

    fn try_from(args: &[&str]) -> TetherResult<Self>
    {
        Self::try_from(args.iter().map(|arg| (*arg).to_string()).collect::<Vec<_>>())
    }
}

impl<const N: usize> TryFrom<[&str; N]> for Argv
{
    type Error = TetherError;

    fn try_from(args: [&str; N]) -> TetherResult<Self>
    {
        Self::try_from(&args[..])
    }
}

impl TryFrom<&Value> for Argv
{
    type Error = TetherError;

    fn try_from(value: &Value) -> TetherResult<Self>
    {
        let Value::Array(elements) = value else {
            debug!(got = value.type_name(), "argv argument is not an array");
            return Err(Self::expected());
        };
        let args = elements
            .iter()
            .enumerate()
            .map(|(index, element)| match element {
                Value::String(arg) => Ok(arg.clone()),
                other => {
                    debug!(index, got = other.type_name(), "argv element is not a string");
                    Err(Self::expected())
                }
            })
            .collect::<TetherResult<Vec<_>>>()?;
        Self::try_from(args)
    }
}

impl TryFrom<Value> for Argv
{
    type Error = TetherError;

    fn try_from(value: Value) -> TetherResult<Self>
    {
        Self::try_from(&value)
    }
}
