pub mod codec;
pub mod connection;
pub mod reply;
pub mod response;
pub mod transaction;
pub mod value;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
