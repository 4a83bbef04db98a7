//! minirpc Server
//!
//! A registered callable table ([`Dispatcher`]) and the sequential TCP server
//! ([`RpcServer`]) that serves it, one connection and one call at a time.

pub mod call;
pub mod dispatcher;
pub mod server;

pub use call::{CallArgs, CallError};
pub use dispatcher::{Dispatcher, Handler};
pub use server::{RpcServer, ServerConfig, ServerState, ShutdownHandle, DEFAULT_BIND, DEFAULT_MAX_MESSAGE_SIZE};
