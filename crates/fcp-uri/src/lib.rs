//! Key URI parsing, rendering, and date-based redirect (DBR) prefix
//! computation for the Freenet Client Protocol.
//!
//! A [`Uri`] is an immutable value; there is no mutable "builder" form here —
//! callers construct a new `Uri` with [`Uri::new`] or derive one with
//! [`Uri::dbr`].

mod dbr;
mod error;
mod key_type;
mod pub_suffix;
mod uri;

pub use dbr::dbr;
pub use error::UriError;
pub use key_type::KeyType;
pub use pub_suffix::PubSuffix;
pub use uri::Uri;
