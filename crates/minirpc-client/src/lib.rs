pub mod client;

pub use client::{MethodCall, RpcClient};
