use std::env;
use std::io::{Cursor, Read};

use bytes::{Buf, BytesMut};

use crate::reply::{self, Reply};
use crate::value::Value;
use crate::Result;

/// Encodes one command as the wire bytes of a RESP array of bulk strings.
///
/// Clients send commands to the Redis server as RESP arrays; every argument,
/// including an empty one, is framed as a length-prefixed bulk string. An
/// empty argument list never reaches the wire.
pub fn encode(args: &[Value]) -> Result<Vec<u8>> {
    if args.is_empty() {
        return Err("empty command".into());
    }

    let request = Reply::Array(args.iter().cloned().map(Reply::Bulk).collect());
    Ok(request.serialize())
}

/// Reads whole reply frames off a blocking byte stream.
///
/// Data is read from the stream into the read buffer. When a reply is parsed,
/// the corresponding data is removed from the buffer; bytes belonging to a
/// following frame stay buffered for the next call.
pub struct ReplyReader<R> {
    src: R,
    buffer: BytesMut,
}

impl<R: Read> ReplyReader<R> {
    pub fn new(src: R) -> ReplyReader<R> {
        ReplyReader {
            src,
            // Allocate the buffer with 4kb of capacity.
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Mutable access to the underlying stream, for the writing side of a
    /// request/response round trip. Writes are not buffered here.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.src
    }

    fn max_reply_size() -> usize {
        env::var("MAX_REPLY_SIZE")
            .map(|s| s.parse().expect("MAX_REPLY_SIZE must be a number"))
            .unwrap_or(512 * 1024 * 1024)
    }

    /// Blocks until exactly one whole reply is buffered and parses it.
    ///
    /// The parse-then-fill loop makes the result independent of how the bytes
    /// were fragmented by the transport. A zero-byte read while a frame is
    /// still incomplete is a fatal EOF, never silently retried.
    pub fn read_reply(&mut self) -> Result<Reply> {
        loop {
            if self.buffer.len() > Self::max_reply_size() {
                return Err("reply size exceeds limit".into());
            }

            let mut cursor = Cursor::new(&self.buffer[..]);
            match Reply::parse(&mut cursor) {
                Ok(reply) => {
                    let position: usize = cursor
                        .position()
                        .try_into()
                        .expect("cursor position is too large");

                    // Remove the parsed reply from the buffer.
                    self.buffer.advance(position);

                    return Ok(reply);
                }
                // Not enough data to parse a reply.
                Err(reply::Error::Incomplete) => self.fill()?,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; 4096];
        let n = self.src.read(&mut chunk)?;

        if n == 0 {
            return Err("connection closed by server before a full reply arrived".into());
        }

        self.buffer.extend_from_slice(&chunk[..n]);
        Ok(())
    }
}
