use std::net::{TcpStream, ToSocketAddrs};

use crate::protocol::error::{MiniRpcError, Result};
use crate::protocol::{Request, Response};
use crate::transport::codec::JsonCodec;
use crate::transport::framing::{read_frame_limited, write_frame};

/// TCP transport for minirpc (synchronous).
///
/// Every call uses a fresh connection: connect, write one request frame, read
/// one response frame, drop the stream. No read or write timeouts are set, so
/// a silent peer blocks the caller.
///
/// # Wire Protocol
///
/// ```text
/// [16-byte length, u128 little-endian] [JSON data]
/// ```
///
/// # Example
///
/// ```no_run
/// use minirpc_common::transport::TcpTransport;
/// use minirpc_common::protocol::Request;
/// use serde_json::json;
///
/// let transport = TcpTransport::new();
/// let mut stream = transport.connect("127.0.0.1:8800").unwrap();
///
/// let request = Request::new("add", vec![json!(2), json!(3)]);
/// let response = transport.send_request(&mut stream, &request).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    max_message_size: Option<usize>,
}

impl TcpTransport {
    /// Creates a transport that accepts responses of any size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects response frames declaring more than `max` bytes.
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = Some(max);
        self
    }

    /// Connects to a remote endpoint.
    ///
    /// The address may resolve to several socket addresses; each is tried in
    /// turn until one accepts.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the address cannot be resolved or every
    /// resolved address refuses the connection.
    pub fn connect(&self, addr: &str) -> Result<TcpStream> {
        let socket_addrs = addr
            .to_socket_addrs()
            .map_err(|e| MiniRpcError::Connection(format!("Invalid address '{}': {}", addr, e)))?;

        let mut last_err = None;
        for socket_addr in socket_addrs {
            match TcpStream::connect(socket_addr) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", socket_addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(MiniRpcError::Connection(format!(
            "Failed to connect to {}: {}",
            addr,
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "address resolved to nothing".to_string())
        )))
    }

    /// Sends a request and waits for the response.
    ///
    /// # Errors
    ///
    /// Transport failures come back as `Connection`, `Io`, `ShortRead` or
    /// `MessageTooLarge`; an undecodable reply as `MalformedEnvelope`.
    pub fn send_request(&self, stream: &mut TcpStream, request: &Request) -> Result<Response> {
        let encoded = JsonCodec::encode_request(request)?;
        write_frame(stream, &encoded)?;

        let response_data = read_frame_limited(stream, self.max_len())?;
        JsonCodec::decode_response(&response_data)
    }

    /// Reads one request frame and decodes it.
    pub fn receive_request(&self, stream: &mut TcpStream) -> Result<Request> {
        let data = read_frame_limited(stream, self.max_len())?;
        JsonCodec::decode_request(&data)
    }

    /// Encodes a response and writes it as one frame.
    pub fn send_response(stream: &mut TcpStream, response: &Response) -> Result<()> {
        let encoded = JsonCodec::encode_response(response)?;
        write_frame(stream, &encoded)
    }

    fn max_len(&self) -> usize {
        self.max_message_size.unwrap_or(usize::MAX)
    }
}
