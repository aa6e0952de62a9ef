//! Parsing of raw RFC 5322 messages into the inbound model.

pub mod mime;

pub use mime::parse_message;
