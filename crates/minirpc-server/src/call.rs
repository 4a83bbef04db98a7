//! Arguments handed to registered callables, and the error they fail with.

use minirpc_common::protocol::{RemoteErrorKind, RpcArgs, RpcKwargs};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Failure raised by a registered callable.
///
/// `kind` travels to the client as the response's `exc_type` and `message` as
/// its `message`; nothing else about the failure crosses the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct CallError {
    pub kind: String,
    pub message: String,
}

impl CallError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn key_error(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::KEY_ERROR, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::TYPE_ERROR, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::VALUE_ERROR, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::RUNTIME_ERROR, message)
    }
}

/// A value that could not be turned into JSON is reported as a type error.
impl From<serde_json::Error> for CallError {
    fn from(err: serde_json::Error) -> Self {
        Self::type_error(err.to_string())
    }
}

/// Positional and keyword arguments of one call.
///
/// The accessors deserialize on demand and fail with a `TypeError`
/// [`CallError`] when an argument is missing or has the wrong shape, so a
/// callable can use `?` throughout:
///
/// ```
/// use minirpc_server::{CallArgs, CallError};
/// use serde_json::{json, Value};
///
/// fn add(args: CallArgs) -> Result<Value, CallError> {
///     let a: i64 = args.arg(0)?;
///     let b: i64 = args.arg(1)?;
///     Ok(json!(a + b))
/// }
///
/// let args = CallArgs::new(vec![json!(2), json!(3)], Default::default());
/// assert_eq!(add(args).unwrap(), json!(5));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    args: RpcArgs,
    kwargs: RpcKwargs,
}

impl CallArgs {
    pub fn new(args: RpcArgs, kwargs: RpcKwargs) -> Self {
        Self { args, kwargs }
    }

    pub fn positional(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &RpcKwargs {
        &self.kwargs
    }

    pub fn into_parts(self) -> (RpcArgs, RpcKwargs) {
        (self.args, self.kwargs)
    }

    /// Positional argument `index`, required.
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, CallError> {
        let value = self.args.get(index).ok_or_else(|| {
            CallError::type_error(format!(
                "missing positional argument {} (got {})",
                index,
                self.args.len()
            ))
        })?;
        convert(value, || format!("argument {}", index))
    }

    /// Keyword argument `name`, if present.
    pub fn kwarg<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CallError> {
        self.kwargs
            .get(name)
            .map(|value| convert(value, || format!("argument '{}'", name)))
            .transpose()
    }

    /// A parameter that may be passed either at position `index` or as the
    /// keyword `name`, but not both.
    pub fn param<T: DeserializeOwned>(&self, index: usize, name: &str) -> Result<T, CallError> {
        match (self.args.get(index), self.kwargs.get(name)) {
            (Some(_), Some(_)) => Err(CallError::type_error(format!(
                "got multiple values for argument '{}'",
                name
            ))),
            (Some(value), None) | (None, Some(value)) => {
                convert(value, || format!("argument '{}'", name))
            }
            (None, None) => Err(CallError::type_error(format!(
                "missing required argument '{}'",
                name
            ))),
        }
    }

    /// Like [`CallArgs::param`], but absent is `None` rather than an error.
    pub fn optional_param<T: DeserializeOwned>(
        &self,
        index: usize,
        name: &str,
    ) -> Result<Option<T>, CallError> {
        match (self.args.get(index), self.kwargs.get(name)) {
            (None, None) => Ok(None),
            _ => self.param(index, name).map(Some),
        }
    }

    /// Rejects calls carrying more than `max` positional arguments or any
    /// keyword outside `allowed`.
    pub fn expect_at_most(&self, max: usize, allowed: &[&str]) -> Result<(), CallError> {
        if self.args.len() > max {
            return Err(CallError::type_error(format!(
                "takes at most {} positional arguments but {} were given",
                max,
                self.args.len()
            )));
        }
        if let Some(unexpected) = self.kwargs.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(CallError::type_error(format!(
                "got an unexpected keyword argument '{}'",
                unexpected
            )));
        }
        Ok(())
    }
}

fn convert<T: DeserializeOwned>(
    value: &Value,
    describe: impl FnOnce() -> String,
) -> Result<T, CallError> {
    serde_json::from_value(value.clone())
        .map_err(|e| CallError::type_error(format!("{} has the wrong type: {}", describe(), e)))
}
