//! Interpreters that narrow a raw [`Reply`] into the typed result a caller
//! expects. All of them are pure functions: reply in, typed value or typed
//! failure out, no I/O.

use thiserror::Error as ThisError;

use crate::reply::Reply;
use crate::value::Value;

#[derive(Debug, ThisError, PartialEq)]
pub enum ResponseError {
    /// A well-formed error reported by the server. Does not invalidate the
    /// connection.
    #[error("{0}")]
    Server(String),
    /// The reply's variant does not match what the operation expects.
    #[error("unexpected reply: {0}")]
    Unexpected(Reply),
}

pub type ResponseResult<T> = Result<T, ResponseError>;

/// `Integer(n)` as `Some(n)`, `Null` as absent.
pub fn as_integer(reply: Reply) -> ResponseResult<Option<i64>> {
    match reply {
        Reply::Integer(n) => Ok(Some(n)),
        Reply::Null => Ok(None),
        Reply::Error(message) => Err(ResponseError::Server(message)),
        other => Err(ResponseError::Unexpected(other)),
    }
}

/// Strictly `Integer(0)` or `Integer(1)`; any other integer is as unexpected
/// as a non-integer reply.
pub fn as_boolean(reply: Reply) -> ResponseResult<bool> {
    match reply {
        Reply::Integer(0) => Ok(false),
        Reply::Integer(1) => Ok(true),
        Reply::Error(message) => Err(ResponseError::Server(message)),
        other => Err(ResponseError::Unexpected(other)),
    }
}

/// `Simple("OK")` as success. Some commands report "nothing to do" as `Null`
/// rather than an error; `absent_is_ok` decides which way that goes.
pub fn as_ok(reply: Reply, absent_is_ok: bool) -> ResponseResult<()> {
    match reply {
        Reply::Simple(ref status) if status == "OK" => Ok(()),
        Reply::Simple(status) => Err(ResponseError::Server(status)),
        Reply::Null if absent_is_ok => Ok(()),
        Reply::Error(message) => Err(ResponseError::Server(message)),
        other => Err(ResponseError::Unexpected(other)),
    }
}

/// `Bulk(value)` as `Some(value)`, `Null` as absent.
pub fn as_bulk(reply: Reply) -> ResponseResult<Option<Value>> {
    match reply {
        Reply::Bulk(value) => Ok(Some(value)),
        Reply::Null => Ok(None),
        Reply::Error(message) => Err(ResponseError::Server(message)),
        other => Err(ResponseError::Unexpected(other)),
    }
}

/// An array of bulk-or-null items, as commands like MGET return.
pub fn as_values(reply: Reply) -> ResponseResult<Option<Vec<Option<Value>>>> {
    let items = match reply {
        Reply::Array(items) => items,
        Reply::Null => return Ok(None),
        Reply::Error(message) => return Err(ResponseError::Server(message)),
        other => return Err(ResponseError::Unexpected(other)),
    };

    items
        .into_iter()
        .map(as_bulk)
        .collect::<ResponseResult<Vec<_>>>()
        .map(Some)
}

/// An array of two-element coordinate arrays, as GEOPOS returns. A missing
/// member shows up as `Null` in place of its pair.
pub fn as_position_pairs(reply: Reply) -> ResponseResult<Option<Vec<Option<(Value, Value)>>>> {
    let items = match reply {
        Reply::Array(items) => items,
        Reply::Null => return Ok(None),
        Reply::Error(message) => return Err(ResponseError::Server(message)),
        other => return Err(ResponseError::Unexpected(other)),
    };

    items
        .into_iter()
        .map(position_pair)
        .collect::<ResponseResult<Vec<_>>>()
        .map(Some)
}

fn position_pair(item: Reply) -> ResponseResult<Option<(Value, Value)>> {
    let pair = match item {
        Reply::Array(pair) => pair,
        Reply::Null => return Ok(None),
        Reply::Error(message) => return Err(ResponseError::Server(message)),
        other => return Err(ResponseError::Unexpected(other)),
    };

    let mut pair = pair.into_iter();
    match (pair.next(), pair.next(), pair.next()) {
        (Some(Reply::Bulk(first)), Some(Reply::Bulk(second)), None) => {
            Ok(Some((first, second)))
        }
        (first, second, third) => {
            // Rebuild the array so the error carries the offending reply.
            let items = [first, second, third].into_iter().flatten().chain(pair).collect();
            Err(ResponseError::Unexpected(Reply::Array(items)))
        }
    }
}

/// The `[cursor, elements]` shape of SCAN-family replies: the next cursor
/// plus the current page of elements.
pub fn as_scan(reply: Reply) -> ResponseResult<(String, Vec<Option<Value>>)> {
    let items = match reply {
        Reply::Array(items) => items,
        Reply::Error(message) => return Err(ResponseError::Server(message)),
        other => return Err(ResponseError::Unexpected(other)),
    };

    let mut items = items.into_iter();
    match (items.next(), items.next(), items.next()) {
        (Some(Reply::Simple(cursor)), Some(Reply::Array(elements)), None) => {
            let elements = elements
                .into_iter()
                .map(as_bulk)
                .collect::<ResponseResult<Vec<_>>>()?;

            Ok((cursor, elements))
        }
        (first, second, third) => {
            let rest = [first, second, third].into_iter().flatten().chain(items).collect();
            Err(ResponseError::Unexpected(Reply::Array(rest)))
        }
    }
}
