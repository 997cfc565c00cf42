use std::fmt;
use std::str;

use bytes::Bytes;

use crate::Error;

/// An owned, immutable, binary-safe byte sequence.
///
/// Command arguments and bulk reply payloads are all `Value`s. Text and
/// numbers are stored in their decimal/UTF-8 wire encoding, so equality is
/// always byte-wise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Value(Bytes);

impl Value {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads the value back as UTF-8 text. Fails on non-UTF-8 payloads.
    pub fn as_str(&self) -> Result<&str, Error> {
        str::from_utf8(self.0.as_ref()).map_err(Into::into)
    }

    /// Reads the value back as a signed 64-bit integer in decimal text form.
    pub fn to_i64(&self) -> Result<i64, Error> {
        Ok(self.as_str()?.parse::<i64>()?)
    }

    /// Reads the value back as a float in decimal text form.
    pub fn to_f64(&self) -> Result<f64, Error> {
        Ok(self.as_str()?.parse::<f64>()?)
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Value(bytes)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value(Bytes::copy_from_slice(bytes))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value(Bytes::from(s.into_bytes()))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value(Bytes::from(i.to_string().into_bytes()))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value(Bytes::from(f.to_string().into_bytes()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.0.as_ref()))
    }
}
