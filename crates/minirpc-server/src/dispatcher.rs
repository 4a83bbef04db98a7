use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use minirpc_common::protocol::{RemoteErrorKind, Request, Response};
use serde_json::Value;

use crate::call::{CallArgs, CallError};

/// A registered callable.
pub type Handler = Box<dyn Fn(CallArgs) -> Result<Value, CallError> + Send + Sync>;

/// The registered callable table: method name to handler.
///
/// The dispatcher knows nothing about sockets. It turns one decoded
/// [`Request`] into one [`Response`], so every failure mode of a call
/// (unknown method, callable error, callable panic) ends up as an `Error`
/// envelope rather than escaping to the caller.
#[derive(Default)]
pub struct Dispatcher {
    methods: HashMap<String, Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any previous handler with
    /// the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(CallArgs) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.methods.insert(name.clone(), Box::new(handler)).is_some() {
            tracing::debug!("Replaced handler for method: {}", name);
        } else {
            tracing::debug!("Registered method: {}", name);
        }
    }

    /// Removes a method. Returns whether it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.methods.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Looks up and invokes the requested method.
    ///
    /// # Errors
    ///
    /// - `KeyError` if the method is not registered
    /// - whatever the callable fails with
    /// - `RuntimeError` if the callable panics
    pub fn invoke(&self, request: Request) -> Result<Value, CallError> {
        let Request {
            method,
            args,
            kwargs,
        } = request;

        let handler = self
            .methods
            .get(&method)
            .ok_or_else(|| CallError::key_error(format!("no such method: '{}'", method)))?;

        let call_args = CallArgs::new(args, kwargs);
        match panic::catch_unwind(AssertUnwindSafe(|| handler(call_args))) {
            Ok(result) => result,
            Err(payload) => Err(CallError::new(
                RemoteErrorKind::RUNTIME_ERROR,
                format!("method '{}' panicked: {}", method, panic_message(payload.as_ref())),
            )),
        }
    }

    /// Handles one request, always producing a response envelope.
    pub fn handle_request(&self, request: Request) -> Response {
        tracing::debug!("Handling request for method: {}", request.method);

        match self.invoke(request) {
            Ok(content) => Response::result(content),
            Err(err) => Response::error(err.kind, err.message),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("methods", &self.methods())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic payload"
    }
}
