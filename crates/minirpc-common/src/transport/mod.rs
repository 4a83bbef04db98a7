//! minirpc Transport Layer
//!
//! Length-prefixed framing, the JSON envelope codec, and a blocking TCP
//! transport built on both.
//!
//! # Wire Format
//!
//! ```text
//! [16-byte length, u128 little-endian] [UTF-8 JSON payload]
//! ```
//!
//! # Components
//!
//! - [`write_frame`] / [`read_frame`] / [`read_frame_limited`]: framing over any
//!   `Write` / `Read`
//! - [`JsonCodec`]: request and response envelopes to and from JSON
//! - [`TcpTransport`]: one request/response cycle over a `TcpStream`

pub mod codec;
pub mod framing;
pub mod tcp;

pub use codec::JsonCodec;
pub use framing::{read_frame, read_frame_limited, write_frame, LENGTH_PREFIX_WIDTH};
pub use tcp::TcpTransport;
