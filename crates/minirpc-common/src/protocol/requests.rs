use serde::{Deserialize, Serialize};

pub type MethodName = String;
pub type RpcArgs = Vec<serde_json::Value>;
pub type RpcKwargs = serde_json::Map<String, serde_json::Value>;

/// A call to a named method on the server.
///
/// On the wire the method name travels under the `_name` key:
///
/// ```text
/// {"_name": "add", "args": [2, 3], "kwargs": {}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    #[serde(rename = "_name")]
    pub method: MethodName,
    pub args: RpcArgs,
    pub kwargs: RpcKwargs,
}

impl Request {
    pub fn new(method: impl Into<String>, args: RpcArgs) -> Self {
        Request {
            method: method.into(),
            args,
            kwargs: RpcKwargs::new(),
        }
    }

    pub fn with_kwargs(mut self, kwargs: RpcKwargs) -> Self {
        self.kwargs = kwargs;
        self
    }

    pub fn with_kwarg(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.kwargs.insert(name.into(), value);
        self
    }
}
