#![forbid(unsafe_code)]

//! A pure-Rust async client for the Freenet Client Protocol (FCP v2):
//! session handshake, raw key fetch/insert, the smart resolver that
//! follows redirects and splitfiles, a forward-error-correction engine
//! for large inserts and fetches, a bounded worker-pool dispatcher,
//! sequenced keys, and a freesite composer.
//!
//! Built on [`fcp_uri`], [`fcp_metadata`] and [`fcp_transport`].

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fec;
pub mod key;
pub mod node_info;
pub mod put;
pub mod raw;
pub mod resolver;
pub mod seq;
pub mod session;
pub mod site;

pub use client::Client;
pub use config::ClientConfig;
pub use dispatcher::Dispatcher;
pub use error::Error;
pub use key::{InsertResult, Key};
pub use node_info::NodeInfo;
pub use session::FcpSession;
pub use site::{DirectoryReader, FileEntry, FreesiteConfig, PutSiteResult, RetrievedFile, SiteOptions, SiteType};

#[cfg(feature = "fs-directory-reader")]
pub use site::FsDirectoryReader;

pub use fcp_metadata::{Action, Document, Metadata, TargetUri};
pub use fcp_uri::{KeyType, PubSuffix, Uri, UriError};

/// This crate's result type.
pub type Result<T> = std::result::Result<T, Error>;
