//! minirpc Common Types and Transport
//!
//! Protocol definitions and the blocking TCP transport shared by the minirpc
//! server and client.
//!
//! # Architecture
//!
//! - **Transport**: one TCP connection per call
//! - **Serialization**: JSON
//! - **Message Format**: `[16-byte length prefix as u128 little-endian] + [JSON data]`
//!
//! # Components
//!
//! - [`protocol`] - Request/Response envelopes and the error type
//! - [`transport`] - Framing, codec and TCP transport
//!
//! # Example
//!
//! ```
//! use minirpc_common::{Request, Response};
//! use serde_json::json;
//!
//! let request = Request::new("add", vec![json!(2), json!(3)]);
//! let response = Response::result(json!(5));
//! assert_eq!(request.method, "add");
//! assert!(response.is_result());
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
