#![forbid(unsafe_code)]

//! Raw line- and chunk-framed TCP primitives for the Freenet Client
//! Protocol.
//!
//! This crate knows the shape of the wire — handshake magic bytes, one
//! `Field=Value` per line, `DataChunk`/`Length=`/`Data` binary framing —
//! but nothing about what any particular message means. Message semantics
//! (`ClientGet`, `ClientHello`, the response state machines) live in
//! `freenet-client`, built on top of [`FcpConnection`].

mod chunk;
mod connection;
mod error;

pub use connection::{parse_hex_field, FcpConnection, HANDSHAKE_MAGIC};
pub use error::TransportError;
