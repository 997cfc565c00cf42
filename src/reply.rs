// https://redis.io/docs/reference/protocol-spec

use std::fmt;
use std::io::Cursor;
use std::string::FromUtf8Error;

use bytes::Buf;
use thiserror::Error as ThisError;

use crate::value::Value;

static CRLF: &[u8; 2] = b"\r\n";

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("not enough data is available to parse an entire reply")]
    Incomplete,
    /// Invalid message encoding.
    #[error("{0}")]
    Other(crate::Error),
}

/// Every reply shape a Redis server can send back over RESP2.
///
/// `Null` is a first-class value: a bulk string or array of length `-1` on
/// the wire. It is never collapsed into an empty `Bulk` or empty `Array`.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Value),
    Null,
    Array(Vec<Reply>),
}

impl Reply {
    /// Parses exactly one reply frame starting at the cursor position.
    ///
    /// Returns `Error::Incomplete` when the buffer does not yet hold a whole
    /// frame; the caller is expected to read more bytes and retry. On success
    /// the cursor sits on the first byte after the frame.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        // The first byte in an RESP-serialized payload always identifies its
        // type. Subsequent bytes constitute the type's contents.
        let first_byte = get_byte(src)?;

        let data_type = match DataType::from_prefix(first_byte) {
            Some(data_type) => data_type,
            // A decode-level anomaly, reported in-band as an error reply
            // rather than as a parse failure. No further bytes are consumed.
            None => return Ok(Reply::Error("Unknown response type".to_string())),
        };

        match data_type {
            DataType::SimpleString => {
                let bytes = get_frame_bytes(src)?.to_vec();
                let string = String::from_utf8(bytes)?;
                Ok(Reply::Simple(string))
            }
            DataType::SimpleError => {
                let bytes = get_frame_bytes(src)?.to_vec();
                let string = String::from_utf8(bytes)?;
                Ok(Reply::Error(string))
            }
            DataType::Integer => {
                let integer = get_decimal::<i64>(src)?;
                Ok(Reply::Integer(integer))
            }
            // $<length>\r\n<data>\r\n
            DataType::BulkString => {
                let length = get_decimal::<isize>(src)?;

                if length < 0 {
                    return Ok(Reply::Null);
                }

                let length = length as usize;
                let start = src.position() as usize;

                // The payload is binary safe, so it is taken by length rather
                // than by scanning for the terminator.
                if src.get_ref().len() < start + length + CRLF.len() {
                    return Err(Error::Incomplete);
                }

                let data = Value::from(&src.get_ref()[start..start + length]);
                src.set_position((start + length + CRLF.len()) as u64);

                Ok(Reply::Bulk(data))
            }
            // *<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Array => {
                let length = get_decimal::<isize>(src)?;

                if length < 0 {
                    return Ok(Reply::Null);
                }

                let mut replies = Vec::with_capacity(length as usize);
                for _ in 0..length {
                    let reply = Self::parse(src)?;
                    replies.push(reply);
                }

                Ok(Reply::Array(replies))
            }
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Reply::Simple(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(u8::from(DataType::SimpleString));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Reply::Error(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(u8::from(DataType::SimpleError));
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Reply::Integer(i) => {
                let mut bytes = Vec::with_capacity(1 + i.to_string().len() + CRLF.len());
                bytes.push(u8::from(DataType::Integer));
                bytes.extend_from_slice(i.to_string().as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Reply::Bulk(value) => {
                let length_str = value.len().to_string();
                let mut bytes = Vec::with_capacity(
                    1 + length_str.len() + CRLF.len() + value.len() + CRLF.len(),
                );
                bytes.push(u8::from(DataType::BulkString));
                bytes.extend_from_slice(length_str.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes.extend_from_slice(value.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            // RESP2 has no dedicated null type; a null is a bulk string of
            // length -1.
            Reply::Null => b"$-1\r\n".to_vec(),
            Reply::Array(arr) => {
                let length_str = arr.len().to_string();
                let mut bytes = Vec::with_capacity(1 + length_str.len() + CRLF.len());
                bytes.push(u8::from(DataType::Array));
                bytes.extend_from_slice(length_str.as_bytes());
                bytes.extend_from_slice(CRLF);
                for reply in arr {
                    bytes.extend(reply.serialize());
                }
                bytes
            }
        }
    }
}

impl From<Reply> for Vec<u8> {
    fn from(reply: Reply) -> Self {
        reply.serialize()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Simple(s) => write!(f, "+{}", s),
            Reply::Error(s) => write!(f, "-{}", s),
            Reply::Integer(i) => write!(f, ":{}", i),
            Reply::Bulk(value) => write!(f, "${}", value),
            Reply::Null => write!(f, "$-1"),
            Reply::Array(arr) => {
                write!(f, "*{}", arr.len())?;
                for reply in arr {
                    write!(f, " {}", reply)?;
                }
                Ok(())
            }
        }
    }
}

fn get_frame_bytes<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let end = src.get_ref().len();

    let frame_end_position = src.get_ref()[start..end]
        .windows(2)
        .position(|window| window == CRLF)
        .ok_or(Error::Incomplete)
        .map(|index| start + index)?;

    src.set_position((frame_end_position + CRLF.len()) as u64);

    Ok(&src.get_ref()[start..frame_end_position])
}

fn get_decimal<T>(src: &mut Cursor<&[u8]>) -> Result<T, Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let bytes = get_frame_bytes(src)?.to_vec();
    let string = String::from_utf8(bytes)?;

    string
        .parse::<T>()
        .map_err(|e| -> crate::Error { Box::new(e) })
        .map_err(Error::Other)
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Array,        // '*'
}

impl DataType {
    fn from_prefix(byte: u8) -> Option<Self> {
        match byte {
            b'+' => Some(Self::SimpleString),
            b'-' => Some(Self::SimpleError),
            b':' => Some(Self::Integer),
            b'$' => Some(Self::BulkString),
            b'*' => Some(Self::Array),
            _ => None,
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::BulkString => b'$',
            DataType::Array => b'*',
        }
    }
}

impl From<FromUtf8Error> for Error {
    fn from(_src: FromUtf8Error) -> Error {
        "protocol error; invalid reply format".into()
    }
}

impl From<&str> for Error {
    fn from(src: &str) -> Error {
        src.to_string().into()
    }
}

impl From<String> for Error {
    fn from(src: String) -> Error {
        Error::Other(src.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_string_reply() {
        let data = b"+OK\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(reply, Ok(Reply::Simple(ref s)) if s == "OK"));
        assert_eq!(cursor.position(), data.len() as u64);
    }

    #[test]
    fn parse_simple_error_reply() {
        let data = b"-Error message\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(
            reply,
            Ok(Reply::Error(ref s)) if s == "Error message"
        ));
    }

    fn parse_integer_reply(data: &[u8], expected: i64) {
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(reply, Ok(Reply::Integer(i)) if i == expected));
    }

    #[test]
    fn parse_integer_reply_positive() {
        parse_integer_reply(b":1000\r\n", 1000);
    }

    #[test]
    fn parse_integer_reply_negative() {
        parse_integer_reply(b":-1000\r\n", -1000);
    }

    #[test]
    fn parse_integer_reply_zero() {
        parse_integer_reply(b":0\r\n", 0);
    }

    #[test]
    fn parse_integer_reply_positive_signed() {
        parse_integer_reply(b":+1000\r\n", 1000);
    }

    #[test]
    fn parse_integer_reply_malformed() {
        let data = b":10x0\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(reply, Err(Error::Other(_))));
    }

    #[test]
    fn parse_bulk_string_reply() {
        let data = b"$6\r\nfoobar\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(
            reply,
            Ok(Reply::Bulk(ref v)) if v == &Value::from("foobar")
        ));
        assert_eq!(cursor.position(), data.len() as u64);
    }

    #[test]
    fn parse_bulk_string_reply_empty() {
        let data = b"$0\r\n\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(
            reply,
            Ok(Reply::Bulk(ref v)) if v.is_empty()
        ));
    }

    #[test]
    fn parse_bulk_string_reply_null() {
        let data = b"$-1\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(reply, Ok(Reply::Null)));
        assert_eq!(cursor.position(), data.len() as u64);
    }

    #[test]
    fn parse_bulk_string_reply_with_embedded_crlf() {
        let data = b"$8\r\nfoo\r\nbar\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(
            reply,
            Ok(Reply::Bulk(ref v)) if v == &Value::from(&b"foo\r\nbar"[..])
        ));
    }

    #[test]
    fn parse_bulk_string_reply_partial_payload() {
        let data = b"$6\r\nfoo";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(reply, Err(Error::Incomplete)));
    }

    #[test]
    fn parse_array_reply_empty() {
        let data = b"*0\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(reply, Ok(Reply::Array(ref a)) if a.is_empty()));
    }

    #[test]
    fn parse_array_reply() {
        let data = b"*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor).unwrap();

        assert_eq!(
            reply,
            Reply::Array(vec![
                Reply::Bulk(Value::from("foo")),
                Reply::Bulk(Value::from("bar")),
            ])
        );
    }

    #[test]
    fn parse_array_reply_nested() {
        let data = b"*2\r\n*3\r\n:1\r\n:2\r\n:3\r\n*2\r\n+Hello\r\n-World\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor).unwrap();

        assert_eq!(
            reply,
            Reply::Array(vec![
                Reply::Array(vec![
                    Reply::Integer(1),
                    Reply::Integer(2),
                    Reply::Integer(3),
                ]),
                Reply::Array(vec![
                    Reply::Simple("Hello".to_string()),
                    Reply::Error("World".to_string()),
                ]),
            ])
        );
    }

    #[test]
    fn parse_array_reply_null() {
        let data = b"*-1\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(reply, Ok(Reply::Null)));
    }

    #[test]
    fn parse_array_reply_null_in_the_middle() {
        let data = b"*3\r\n$5\r\nhello\r\n$-1\r\n$5\r\nworld\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor).unwrap();

        assert_eq!(
            reply,
            Reply::Array(vec![
                Reply::Bulk(Value::from("hello")),
                Reply::Null,
                Reply::Bulk(Value::from("world")),
            ])
        );
    }

    #[test]
    fn parse_array_reply_partial_elements() {
        let data = b"*2\r\n$3\r\nfoo\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(reply, Err(Error::Incomplete)));
    }

    #[test]
    fn parse_unknown_prefix() {
        let data = b"?what\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(
            reply,
            Ok(Reply::Error(ref s)) if s == "Unknown response type"
        ));
        // Only the prefix byte is consumed.
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn parse_empty_buffer() {
        let data = b"";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(reply, Err(Error::Incomplete)));
    }

    #[test]
    fn parse_non_utf8_simple_string() {
        let data = b"+\xff\xfe\r\n";
        let mut cursor = Cursor::new(&data[..]);

        let reply = Reply::parse(&mut cursor);

        assert!(matches!(reply, Err(Error::Other(_))));
    }

    #[test]
    fn serialize_null_as_negative_length_bulk() {
        assert_eq!(Reply::Null.serialize(), b"$-1\r\n");
    }

    #[test]
    fn serialize_parse_identity() {
        let reply = Reply::Array(vec![
            Reply::Simple("OK".to_string()),
            Reply::Integer(-7),
            Reply::Null,
            Reply::Bulk(Value::from(&b"bin\r\ndata"[..])),
        ]);

        let bytes = reply.serialize();
        let mut cursor = Cursor::new(&bytes[..]);

        assert_eq!(Reply::parse(&mut cursor).unwrap(), reply);
        assert_eq!(cursor.position(), bytes.len() as u64);
    }
}
