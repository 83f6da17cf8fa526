//! Parsing, rendering, and resolution of Freenet metadata documents.
//!
//! A metadata document is the small text format that rides alongside most
//! Freenet keys, describing how a client should get from a fetched key to
//! the data it actually wants: a plain redirect, a date-indexed redirect
//! whose target is re-derived at resolve time, a splitfile manifest, or
//! simply "this key's payload is the data".

mod action;
mod document;
mod error;
mod metadata;
mod target_uri;

pub use action::{Action, DEFAULT_INCREMENT};
pub use document::Document;
pub use error::MetadataError;
pub use metadata::Metadata;
pub use target_uri::TargetUri;
