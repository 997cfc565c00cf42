use std::io::Write;
use std::net::TcpStream;

use tracing::{debug, warn};

use crate::codec::{self, ReplyReader};
use crate::reply::Reply;
use crate::value::Value;
use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    NotConnected,
    Connected,
}

/// A single blocking connection to a Redis server.
///
/// Exactly one request may be in flight at a time: `issue_command` writes the
/// whole request and then blocks until one full reply has been parsed. The
/// connection holds no lock and must not be driven from multiple threads.
///
/// After a transport or decode failure the stream position is unknown and no
/// resynchronization is attempted; callers must drop the connection and
/// create a new one.
pub struct Connection {
    reader: Option<ReplyReader<TcpStream>>,
}

impl Connection {
    pub fn new() -> Connection {
        Connection { reader: None }
    }

    pub fn status(&self) -> Status {
        match self.reader {
            Some(_) => Status::Connected,
            None => Status::NotConnected,
        }
    }

    /// Opens a TCP stream to the given endpoint. On failure the connection
    /// stays `NotConnected`.
    pub fn connect(&mut self, host: &str, port: u16) -> Status {
        match TcpStream::connect((host, port)) {
            Ok(stream) => {
                debug!(host, port, "connected to Redis server");
                self.reader = Some(ReplyReader::new(stream));
            }
            Err(err) => {
                warn!(host, port, %err, "failed to connect to Redis server");
            }
        }

        self.status()
    }

    /// Sends one command and blocks until its reply has been parsed.
    ///
    /// Transport and decode failures are surfaced as `Reply::Error` alongside
    /// server-reported errors; the three classes share the error channel.
    pub fn issue_command(&mut self, args: &[Value]) -> Reply {
        if args.is_empty() {
            return Reply::Error("Empty command".to_string());
        }

        match self.round_trip(args) {
            Ok(reply) => {
                debug!(reply = %reply, "received reply");
                reply
            }
            Err(err) => {
                warn!(%err, "command round trip failed");
                Reply::Error(err.to_string())
            }
        }
    }

    fn round_trip(&mut self, args: &[Value]) -> Result<Reply> {
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Err("Not connected to Redis server".into()),
        };

        let request = codec::encode(args)?;
        reader.get_mut().write_all(&request)?;

        reader.read_reply()
    }
}

impl Default for Connection {
    fn default() -> Connection {
        Connection::new()
    }
}
