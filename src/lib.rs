//! minirpc
//!
//! A minimal RPC mechanism over TCP. A server exposes named callables; a
//! client calls them by name with positional and keyword arguments and gets
//! back either the result or a structured error.
//!
//! Each call is one TCP connection carrying one request frame and one
//! response frame. A frame is a 16-byte little-endian length followed by a
//! UTF-8 JSON payload:
//!
//! ```text
//! request:  {"_name": "add", "args": [2, 3], "kwargs": {}}
//! response: {"type": "result", "content": 5}
//!           {"type": "error", "exc_type": "KeyError", "message": "..."}
//! ```
//!
//! # Example
//!
//! ```no_run
//! use minirpc::{CallArgs, RpcClient, RpcServer, ServerConfig};
//! use serde_json::json;
//! use std::thread;
//!
//! let mut server = RpcServer::bind(ServerConfig::new("127.0.0.1:0")).unwrap();
//! server.register("add", |args: CallArgs| {
//!     let a: i64 = args.arg(0)?;
//!     let b: i64 = args.arg(1)?;
//!     Ok(json!(a + b))
//! });
//! let addr = server.local_addr();
//! let shutdown = server.shutdown_handle();
//! let serving = thread::spawn(move || server.run());
//!
//! let client = RpcClient::connect_to(addr.to_string());
//! let sum: i64 = client.method("add").arg(2).arg(3).invoke().unwrap();
//! assert_eq!(sum, 5);
//!
//! shutdown.shutdown();
//! serving.join().unwrap().unwrap();
//! ```

pub use minirpc_client::{MethodCall, RpcClient};
pub use minirpc_common::protocol::{MiniRpcError, RemoteErrorKind, Request, Response, Result};
pub use minirpc_common::{protocol, transport};
pub use minirpc_server::{
    CallArgs, CallError, Dispatcher, RpcServer, ServerConfig, ServerState, ShutdownHandle,
};
