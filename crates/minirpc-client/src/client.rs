use minirpc_common::protocol::error::{MiniRpcError, Result};
use minirpc_common::protocol::{RemoteErrorKind, Request, Response, RpcArgs, RpcKwargs};
use minirpc_common::transport::TcpTransport;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// minirpc client for making RPC calls
///
/// Holds nothing but the server address: every call opens its own connection,
/// sends one request, reads one response and closes. Clones can be used from
/// several threads at once; each call is independent.
///
/// Failures are kept apart by variant:
/// - [`MiniRpcError::Remote`]: the callable (or the server's lookup) failed
/// - [`MiniRpcError::InvalidResponse`]: the reply was not a valid envelope
/// - transport variants (`Connection`, `Io`, `ShortRead`, `MessageTooLarge`)
///
/// # Example
///
/// ```no_run
/// use minirpc_client::RpcClient;
/// use serde_json::json;
///
/// let client = RpcClient::new("localhost", 8800);
/// let sum = client.call_positional("add", vec![json!(2), json!(3)]).unwrap();
/// assert_eq!(sum, json!(5));
///
/// let sum: i64 = client.method("add").arg(2).arg(3).invoke().unwrap();
/// assert_eq!(sum, 5);
/// ```
#[derive(Debug, Clone)]
pub struct RpcClient {
    addr: String,
    transport: TcpTransport,
}

impl RpcClient {
    /// Creates a client for the server at `host:port`.
    pub fn new(host: &str, port: u16) -> Self {
        let addr = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        };
        Self::connect_to(addr)
    }

    /// Creates a client for a `host:port` address string.
    ///
    /// Nothing is resolved or connected until the first call.
    pub fn connect_to(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            transport: TcpTransport::new(),
        }
    }

    /// Rejects responses whose frame declares more than `max` bytes.
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.transport = self.transport.with_max_message_size(max);
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Calls `method` with positional and keyword arguments.
    ///
    /// # Errors
    ///
    /// - `Remote` if the server answered with an error envelope
    /// - `InvalidResponse` if the reply could not be decoded
    /// - `Connection`, `Io`, `ShortRead` or `MessageTooLarge` for transport failures
    pub fn call(&self, method: &str, args: RpcArgs, kwargs: RpcKwargs) -> Result<Value> {
        tracing::debug!(
            "[Server {}][Method {}][Args {:?}][Kwargs {:?}]",
            self.addr,
            method,
            args,
            kwargs
        );
        let request = Request::new(method, args).with_kwargs(kwargs);

        let mut stream = self.transport.connect(&self.addr)?;
        let response = self
            .transport
            .send_request(&mut stream, &request)
            .map_err(|e| match e {
                MiniRpcError::MalformedEnvelope(msg) => MiniRpcError::InvalidResponse(msg),
                other => other,
            })?;
        // Connection is closed here when stream is dropped

        match response {
            Response::Result { content } => Ok(content),
            Response::Error { exc_type, message } => {
                tracing::debug!("[Server {}][Method {}] {}: {}", self.addr, method, exc_type, message);
                Err(MiniRpcError::Remote {
                    kind: RemoteErrorKind::from_name(&exc_type),
                    message,
                })
            }
        }
    }

    /// Calls `method` with positional arguments only.
    pub fn call_positional(&self, method: &str, args: RpcArgs) -> Result<Value> {
        self.call(method, args, RpcKwargs::new())
    }

    /// Starts a typed call to `method`.
    pub fn method(&self, method: impl Into<String>) -> MethodCall<'_> {
        MethodCall {
            client: self,
            method: method.into(),
            args: RpcArgs::new(),
            kwargs: RpcKwargs::new(),
            error: None,
        }
    }
}

/// Builder for one call with serde-serialized arguments.
///
/// An argument that cannot be represented as JSON is remembered and reported
/// by [`MethodCall::invoke`] as `Serialization`, before any connection is made.
#[must_use = "a MethodCall does nothing until invoked"]
pub struct MethodCall<'a> {
    client: &'a RpcClient,
    method: String,
    args: RpcArgs,
    kwargs: RpcKwargs,
    error: Option<serde_json::Error>,
}

impl MethodCall<'_> {
    /// Appends a positional argument.
    pub fn arg<T: Serialize>(mut self, value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => self.args.push(value),
            Err(e) => self.record(e),
        }
        self
    }

    /// Sets a keyword argument.
    pub fn kwarg<T: Serialize>(mut self, name: impl Into<String>, value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.kwargs.insert(name.into(), value);
            }
            Err(e) => self.record(e),
        }
        self
    }

    /// Performs the call and returns the raw JSON result.
    pub fn invoke_value(self) -> Result<Value> {
        if let Some(e) = self.error {
            return Err(MiniRpcError::Serialization(e));
        }
        self.client.call(&self.method, self.args, self.kwargs)
    }

    /// Performs the call and deserializes the result into `T`.
    ///
    /// # Errors
    ///
    /// Besides the errors of [`RpcClient::call`], returns `InvalidResponse` if
    /// the result does not fit `T`.
    pub fn invoke<T: DeserializeOwned>(self) -> Result<T> {
        let method = self.method.clone();
        let value = self.invoke_value()?;
        serde_json::from_value(value).map_err(|e| {
            MiniRpcError::InvalidResponse(format!(
                "result of '{}' has an unexpected shape: {}",
                method, e
            ))
        })
    }

    fn record(&mut self, err: serde_json::Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::TcpListener;

    #[test]
    fn test_client_addr() {
        assert_eq!(RpcClient::new("localhost", 8800).addr(), "localhost:8800");
        assert_eq!(RpcClient::new("::1", 8800).addr(), "[::1]:8800");
        assert_eq!(RpcClient::connect_to("127.0.0.1:9").addr(), "127.0.0.1:9");
    }

    #[test]
    fn test_client_is_clonable() {
        let client = RpcClient::new("localhost", 8800);
        let client2 = client.clone();
        assert_eq!(client.addr(), client2.addr());
    }

    #[test]
    fn test_connection_refused_is_transport_error() {
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let client = RpcClient::connect_to(addr.to_string());

        let err = client.call_positional("add", vec![]).unwrap_err();
        assert!(matches!(err, MiniRpcError::Connection(_)));
        assert!(err.is_transport());
        assert!(!err.is_remote());
    }

    #[test]
    fn test_unserializable_argument_fails_before_connecting() {
        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple keys are not JSON");

        // Nothing listens on this address; the error must come first.
        let client = RpcClient::connect_to("127.0.0.1:1");
        let err = client.method("store").arg(1).arg(bad).invoke_value().unwrap_err();
        assert!(matches!(err, MiniRpcError::Serialization(_)));
    }

    #[test]
    fn test_builder_collects_arguments() {
        let client = RpcClient::connect_to("127.0.0.1:1");
        let call = client.method("greet").arg("ada").kwarg("loud", true);
        assert_eq!(call.method, "greet");
        assert_eq!(call.args, vec![Value::from("ada")]);
        assert_eq!(call.kwargs.get("loud"), Some(&Value::Bool(true)));
        assert!(call.error.is_none());
    }
}
