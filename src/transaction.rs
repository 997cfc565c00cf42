use tracing::{debug, warn};

use crate::connection::Connection;
use crate::reply::Reply;
use crate::value::Value;

/// A client-side batch of commands run atomically via MULTI/EXEC.
///
/// Commands are queued in memory; nothing touches the wire until `execute`.
/// The transaction exclusively borrows its connection and `execute` consumes
/// the transaction, so a batch can never be extended or replayed after it has
/// run.
///
/// An empty batch is legal and still performs the MULTI/EXEC round trip,
/// yielding an empty array.
pub struct Transaction<'a> {
    connection: &'a mut Connection,
    commands: Vec<Vec<Value>>,
}

impl<'a> Transaction<'a> {
    pub fn new(connection: &'a mut Connection) -> Transaction<'a> {
        Transaction {
            connection,
            commands: Vec::new(),
        }
    }

    /// Appends one command to the batch. Purely in-memory, no I/O.
    pub fn queue<I>(mut self, args: I) -> Transaction<'a>
    where
        I: IntoIterator<Item = Value>,
    {
        self.commands.push(args.into_iter().collect());
        self
    }

    /// Runs the batch and returns the EXEC reply verbatim, normally an array
    /// holding one reply per queued command in queue order.
    ///
    /// If MULTI is refused, its reply is returned as-is and nothing else is
    /// sent. If the server answers anything but QUEUED while the commands are
    /// being queued, the transaction is discarded and the offending reply is
    /// returned; EXEC is never sent on that path.
    pub fn execute(self) -> Reply {
        let Transaction {
            connection,
            commands,
        } = self;

        let multi = connection.issue_command(&[Value::from("MULTI")]);
        match multi {
            Reply::Simple(ref status) if status == "OK" => {}
            other => {
                warn!(reply = %other, "MULTI was not acknowledged, aborting transaction");
                return other;
            }
        }

        for (index, command) in commands.iter().enumerate() {
            let reply = connection.issue_command(command);
            match reply {
                Reply::Simple(ref status) if status == "QUEUED" => {
                    debug!(index, "command queued");
                }
                other => {
                    warn!(index, reply = %other, "command rejected, discarding transaction");
                    // The DISCARD reply carries no information the caller
                    // wants; the offending reply is the result.
                    let _ = connection.issue_command(&[Value::from("DISCARD")]);
                    return other;
                }
            }
        }

        connection.issue_command(&[Value::from("EXEC")])
    }
}
