//! # Types
//!
//! Values that cross the control surface: validated arguments going in,
//! descriptors and sessions coming out.

pub mod descriptors;
pub mod process;
pub mod value;

// Re-export all public types
pub use descriptors::{Application, Icon, Process, Session};
pub use process::{Argv, ProcessId};
pub use value::Value;
