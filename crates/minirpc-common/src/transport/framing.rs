use std::io::{ErrorKind, Read, Write};

use crate::protocol::error::{MiniRpcError, Result};

/// Width of the length prefix in bytes.
///
/// The prefix is an unsigned little-endian integer. Both peers must agree on
/// this value; it is part of the wire format.
pub const LENGTH_PREFIX_WIDTH: usize = 16;

/// Upper bound on the buffer reserved before any payload bytes arrive.
const INITIAL_READ_CAPACITY: usize = 64 * 1024;

/// Writes one frame: the length prefix of `payload` followed by the payload.
///
/// Wire format: `[16-byte length as u128 little-endian] + [payload]`
///
/// # Errors
///
/// Returns an error if writing to or flushing the stream fails. A failed write
/// leaves the peer with a short frame, which it reports as a short read.
pub fn write_frame<W: Write>(stream: &mut W, payload: &[u8]) -> Result<()> {
    let len = payload.len() as u128;

    stream
        .write_all(&len.to_le_bytes())
        .map_err(|e| map_io_error(e, "writing length prefix"))?;

    stream
        .write_all(payload)
        .map_err(|e| map_io_error(e, "writing payload"))?;

    stream
        .flush()
        .map_err(|e| map_io_error(e, "flushing stream"))?;

    Ok(())
}

/// Reads one frame and returns its payload.
///
/// No bound is placed on the declared length; see [`read_frame_limited`].
///
/// # Errors
///
/// Returns [`MiniRpcError::ShortRead`] if the stream ends before the prefix or
/// the full payload has been received.
pub fn read_frame<R: Read>(stream: &mut R) -> Result<Vec<u8>> {
    read_frame_limited(stream, usize::MAX)
}

/// Reads one frame, rejecting frames whose declared length exceeds `max_len`.
///
/// The payload is accumulated over as many reads as the stream needs. The
/// buffer grows with the data actually received, so a large declared length
/// from a peer that then goes quiet does not allocate the whole amount.
///
/// # Errors
///
/// Returns an error if:
/// - The stream ends early (`ShortRead`)
/// - The declared length is above `max_len` (`MessageTooLarge`)
/// - Reading from the stream fails
pub fn read_frame_limited<R: Read>(stream: &mut R, max_len: usize) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; LENGTH_PREFIX_WIDTH];
    read_exact_counted(stream, &mut len_buf)?;

    let declared = u128::from_le_bytes(len_buf);
    let len = usize::try_from(declared)
        .ok()
        .filter(|len| *len <= max_len)
        .ok_or(MiniRpcError::MessageTooLarge {
            size: declared,
            max: max_len,
        })?;

    let mut payload = Vec::with_capacity(len.min(INITIAL_READ_CAPACITY));
    let received = stream
        .by_ref()
        .take(len as u64)
        .read_to_end(&mut payload)
        .map_err(|e| map_io_error(e, "reading payload"))?;

    if received < len {
        return Err(MiniRpcError::ShortRead {
            expected: len,
            received,
        });
    }

    Ok(payload)
}

/// Fills `buf` completely or reports how many bytes arrived before EOF.
fn read_exact_counted<R: Read>(stream: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(MiniRpcError::ShortRead {
                    expected: buf.len(),
                    received: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(map_io_error(e, "reading length prefix")),
        }
    }
    Ok(())
}

/// Map IO errors to appropriate MiniRpcError variants
///
/// - Lost connections -> `Connection`
/// - Other IO errors -> `Io`
pub(crate) fn map_io_error(err: std::io::Error, context: &str) -> MiniRpcError {
    match err.kind() {
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::BrokenPipe => {
            MiniRpcError::Connection(format!("{}: connection lost ({})", context, err))
        }
        _ => MiniRpcError::Io(err),
    }
}
