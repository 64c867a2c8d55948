//! Loosely-typed argument values handed over by a binding layer.

/// Dynamically typed value
///
/// Mirrors what a scripting-language binding passes through before any
/// validation happened. Conversions into [`super::ProcessId`] and
/// [`super::Argv`] do the validating.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value
{
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
}

impl Value
{
    /// Name of the value's type, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str
    {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
        }
    }
}

impl From<bool> for Value
{
    fn from(value: bool) -> Self
    {
        Self::Bool(value)
    }
}

impl From<i32> for Value
{
    fn from(value: i32) -> Self
    {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for Value
{
    fn from(value: u32) -> Self
    {
        Self::Number(f64::from(value))
    }
}

impl From<f64> for Value
{
    fn from(value: f64) -> Self
    {
        Self::Number(value)
    }
}

impl From<&str> for Value
{
    fn from(value: &str) -> Self
    {
        Self::String(value.to_string())
    }
}

impl From<String> for Value
{
    fn from(value: String) -> Self
    {
        Self::String(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value
{
    fn from(values: Vec<T>) -> Self
    {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value
{
    fn from(value: Option<T>) -> Self
    {
        value.map_or(Self::Null, Into::into)
    }
}
