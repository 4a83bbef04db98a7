pub mod error;
pub mod requests;
pub mod responses;


pub use error::{MiniRpcError, Result};
pub use requests::{MethodName, Request, RpcArgs, RpcKwargs};
pub use responses::{RemoteErrorKind, Response, RpcResult};
