//! Freesite composer: scans a directory, inserts each file as a CHK in
//! parallel, builds a manifest metadata document, and publishes it under
//! one of three disciplines (oneshot / date-indexed / incrementing
//! edition). Spec.md component I, grounded on `site.__init__`/`site.put`/
//! `site.get`/`site.readdir` in `examples/original_source/freenet.py`.

use std::future::Future;

use serde::{Deserialize, Serialize};

use fcp_metadata::{Action, Document, Metadata};
use fcp_uri::Uri;

use crate::config::ClientConfig;
use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::fec;
use crate::put;
use crate::resolver;
use crate::session::FcpSession;

const DEFAULT_SITE_NAME: &str = "site";
const DEFAULT_DEFAULT_FILE: &str = "index.html";
const DEFAULT_EDITION_MAX_TRIES: u64 = 1_000_000;
const INITIAL_BACKOFF_SECS: f64 = 3.0;
const BACKOFF_FACTOR: f64 = 1.25;

/// One file a [`DirectoryReader`] knows about: a slash-separated path
/// relative to the site root, and the MIME type it should be published
/// under. Guessing that MIME type is an external collaborator's job (spec.md
/// §1 names MIME tables as out of scope); this struct only carries the
/// result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub relpath: String,
    pub mimetype: String,
}

/// Abstracts walking a site's source files so the composer doesn't depend on
/// a concrete filesystem. Uses return-position `impl Future` rather than
/// `async-trait`, so implementors pay no boxing cost and no extra
/// dependency is needed; the tradeoff is that `put_site` takes this as a
/// generic parameter rather than a trait object.
pub trait DirectoryReader: Send + Sync {
    fn entries(&self) -> impl Future<Output = Result<Vec<FileEntry>, Error>> + Send;
    fn read(&self, entry: &FileEntry) -> impl Future<Output = Result<Vec<u8>, Error>> + Send;
}

/// The publishing discipline a freesite is inserted under (spec.md §4.I).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteType {
    /// A single, never-updated SSK insert.
    Oneshot,
    /// A `DateRedirect` pointer at a stable SSK path, re-published every
    /// `increment` seconds at a DBR-prefixed path.
    Dbr,
    /// An incrementing numeric suffix, advanced on every publish.
    Edition,
}

/// Persisted freesite configuration — the Rust analogue of the original's
/// `.freesiterc` (there pickled; here TOML via `serde` + `toml`, per
/// SPEC_FULL.md §3). Every field is optional so a caller's explicit
/// [`SiteOptions`] can override whatever was last persisted, which in turn
/// overrides the hard defaults in [`resolve`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FreesiteConfig {
    pub name: Option<String>,
    pub pub_key: Option<String>,
    pub priv_key: Option<String>,
    pub default: Option<String>,
    pub htl: Option<u32>,
    pub offset: Option<u32>,
    pub increment: Option<u32>,
    pub site_type: Option<SiteType>,
    pub edition: Option<u64>,
    pub edition_max_tries: Option<u64>,
}

#[cfg(feature = "fs-directory-reader")]
impl FreesiteConfig {
    /// Loads a persisted config, or the default (all-`None`) config if
    /// `path` doesn't exist or doesn't parse.
    pub async fn load(path: &std::path::Path) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => toml::from_str(&text).unwrap_or_default(),
            Err(_) => FreesiteConfig::default(),
        }
    }

    pub async fn save(&self, path: &std::path::Path) -> Result<(), Error> {
        let text = toml::to_string_pretty(self).map_err(|err| Error::SiteConfig(err.to_string()))?;
        tokio::fs::write(path, text).await?;
        Ok(())
    }
}

/// Caller-supplied publish options. Every field left `None` falls back to
/// whatever a persisted [`FreesiteConfig`] has, and failing that, a hard
/// default — see [`resolve`].
#[derive(Debug, Clone, Default)]
pub struct SiteOptions {
    pub name: Option<String>,
    pub default: Option<String>,
    pub htl: Option<u32>,
    pub offset: Option<u32>,
    pub increment: Option<u32>,
    pub site_type: Option<SiteType>,
    pub edition: Option<u64>,
    pub edition_max_tries: Option<u64>,
    pub pub_key: Option<String>,
    pub priv_key: Option<String>,
    /// How many `increment`s ahead of "now" a `Dbr` discipline should
    /// target; passed straight through to [`fcp_uri::dbr`].
    pub future: i64,
}

struct Resolved {
    name: String,
    default: String,
    htl: u32,
    offset: u32,
    increment: u32,
    site_type: SiteType,
    edition: u64,
    edition_max_tries: u64,
    pub_key: Option<String>,
    priv_key: Option<String>,
}

fn resolve(options: &SiteOptions, persisted: &FreesiteConfig, config: &ClientConfig) -> Resolved {
    let edition_max_tries = options
        .edition_max_tries
        .or(persisted.edition_max_tries)
        .unwrap_or(0);
    Resolved {
        name: options
            .name
            .clone()
            .or_else(|| persisted.name.clone())
            .unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
        default: options
            .default
            .clone()
            .or_else(|| persisted.default.clone())
            .unwrap_or_else(|| DEFAULT_DEFAULT_FILE.to_string()),
        htl: options.htl.or(persisted.htl).unwrap_or(config.htl),
        offset: options.offset.or(persisted.offset).unwrap_or(0),
        increment: options
            .increment
            .or(persisted.increment)
            .unwrap_or(fcp_metadata::DEFAULT_INCREMENT),
        site_type: options.site_type.or(persisted.site_type).unwrap_or(SiteType::Oneshot),
        edition: options.edition.or(persisted.edition).unwrap_or(0),
        edition_max_tries: if edition_max_tries == 0 {
            DEFAULT_EDITION_MAX_TRIES
        } else {
            edition_max_tries
        },
        pub_key: options.pub_key.clone().or_else(|| persisted.pub_key.clone()),
        priv_key: options.priv_key.clone().or_else(|| persisted.priv_key.clone()),
    }
}

/// What publishing a site produced, suitable for persisting back into a
/// [`FreesiteConfig`] (the edition discipline needs the advanced `edition`
/// on the next call).
#[derive(Debug, Clone)]
pub struct PutSiteResult {
    pub pub_uri: Uri,
    pub priv_uri: Uri,
    pub manifest_uri: Uri,
    pub edition: Option<u64>,
    pub resolved: FreesiteConfig,
}

/// Inserts one file's bytes under a fresh CHK, retrying `RouteNotFound`
/// forever with exponential backoff (spec.md §7's file-insert retry
/// policy for the site composer); any other error is fatal to the whole
/// publish.
async fn insert_file_with_backoff(config: &ClientConfig, data: &[u8], mimetype: &str, htl: u32) -> Result<Uri, Error> {
    let mut backoff = INITIAL_BACKOFF_SECS;
    loop {
        match put::put(config, data, None, htl, Some(mimetype)).await {
            Ok(result) => return Ok(result.uri),
            Err(Error::RouteNotFound(_)) => {
                log::warn!("site: file insert found no route, retrying in {backoff:.1}s");
                tokio::time::sleep(std::time::Duration::from_secs_f64(backoff)).await;
                backoff *= BACKOFF_FACTOR;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Scans `reader`, inserts every file in parallel, builds the manifest, and
/// publishes it per `options.site_type`.
pub async fn put_site<R: DirectoryReader>(
    config: &ClientConfig,
    reader: &R,
    options: &SiteOptions,
    persisted: &FreesiteConfig,
) -> Result<PutSiteResult, Error> {
    let resolved = resolve(options, persisted, config);

    let entries = reader.entries().await?;
    if entries.is_empty() {
        return Err(Error::SiteConfig("directory has no files to publish".to_string()));
    }
    if !entries.iter().any(|e| e.relpath == resolved.default) {
        return Err(Error::SiteConfig(format!(
            "default file {:?} is not among the site's files",
            resolved.default
        )));
    }

    let (pub_key, priv_key) = match (&resolved.pub_key, &resolved.priv_key) {
        (Some(pub_key), Some(priv_key)) => (pub_key.clone(), priv_key.clone()),
        (None, None) => crate::raw::gen_svk_pair(config).await?,
        _ => {
            return Err(Error::SiteConfig(
                "site has only one half of an SSK keypair persisted".to_string(),
            ));
        }
    };

    let mut dispatcher: Dispatcher<(String, String, Result<Uri, Error>)> = Dispatcher::new(config.site_workers);
    for entry in &entries {
        let data = reader.read(entry).await?;
        let config = config.clone();
        let relpath = entry.relpath.clone();
        let mimetype = entry.mimetype.clone();
        let htl = resolved.htl;
        dispatcher.add(async move {
            let uri = insert_file_with_backoff(&config, &data, &mimetype, htl).await;
            (relpath, mimetype, uri)
        });
    }

    let mut manifest = Metadata::empty();
    for (relpath, mimetype, uri) in dispatcher.wait().await {
        let uri = uri?;
        manifest.insert(relpath, Document::new(Action::Redirect(uri)).with_mimetype(mimetype));
    }
    let default_doc = manifest
        .document(&resolved.default)
        .cloned()
        .expect("checked above that the default file is among the site's entries");
    manifest.insert("", default_doc);

    let pub_suffix = FcpSession::handshake(&config.host, config.port).await?.pub_suffix;

    let priv_uri = Uri::new(fcp_uri::KeyType::Ssk, priv_key.clone()).with_ssk_path(resolved.name.clone());
    let pub_uri = Uri::ssk_public(pub_key.clone(), pub_suffix, resolved.name.clone());

    let (manifest_uri, edition) = match resolved.site_type {
        SiteType::Oneshot => {
            let result = fec::put_metadata(config, manifest.render().as_bytes(), &priv_uri, resolved.htl).await?;
            (result.uri, None)
        }
        SiteType::Dbr => {
            let dbr_prefix = fcp_uri::dbr(options.future, resolved.increment, resolved.offset);
            let mut pointer = Metadata::empty();
            pointer.add_date_redirect("", pub_uri.clone(), resolved.increment, resolved.offset);
            crate::raw::put_raw(config, &[], pointer.render().as_bytes(), Some(&priv_uri), resolved.htl).await?;

            let dated_uri = priv_uri
                .clone()
                .with_ssk_path(format!("{dbr_prefix}-{}", resolved.name));
            let result = fec::put_metadata(config, manifest.render().as_bytes(), &dated_uri, resolved.htl).await?;
            (result.uri, None)
        }
        SiteType::Edition => {
            let mut edition = resolved.edition;
            let end = edition.saturating_add(resolved.edition_max_tries);
            loop {
                if edition >= end {
                    return Err(Error::EditionsExhausted {
                        start: resolved.edition,
                        tries: resolved.edition_max_tries,
                    });
                }
                let edition_uri = priv_uri
                    .clone()
                    .with_ssk_path(format!("{}/{edition}", resolved.name));
                match fec::put_metadata(config, manifest.render().as_bytes(), &edition_uri, resolved.htl).await {
                    Ok(result) => break (result.uri, Some(edition)),
                    Err(Error::KeyCollision { .. }) => edition += 1,
                    Err(err) => return Err(err),
                }
            }
        }
    };

    let persisted_out = FreesiteConfig {
        name: Some(resolved.name),
        pub_key: Some(pub_key),
        priv_key: Some(priv_key),
        default: Some(resolved.default),
        htl: Some(resolved.htl),
        offset: Some(resolved.offset),
        increment: Some(resolved.increment),
        site_type: Some(resolved.site_type),
        edition: edition.map(|e| e + 1).or(Some(resolved.edition)),
        edition_max_tries: Some(resolved.edition_max_tries),
    };

    Ok(PutSiteResult {
        pub_uri,
        priv_uri,
        manifest_uri,
        edition,
        resolved: persisted_out,
    })
}

/// One file fetched back out of a published freesite.
#[derive(Debug, Clone)]
pub struct RetrievedFile {
    pub relpath: String,
    pub mimetype: Option<String>,
    pub data: Vec<u8>,
}

/// Fetches every named document out of the manifest at `manifest_uri`,
/// reconstructing the full set of files a [`put_site`] call published. The
/// empty-named default document is skipped — it's always an alias for one
/// of the other entries.
///
/// `manifest_uri` must already point directly at the manifest key — the
/// URI [`PutSiteResult::manifest_uri`] names, or (for the oneshot
/// discipline only) [`PutSiteResult::pub_uri`]. A `dbr`/`edition` site's
/// published pointer is itself a redirect to the current manifest; resolve
/// that hop first with [`resolver::get_smart`] on a single known file
/// before calling this to enumerate the rest.
pub async fn get_site(config: &ClientConfig, manifest_uri: &Uri, htl: u32, past: i64) -> Result<Vec<RetrievedFile>, Error> {
    let bare = manifest_uri.clone().with_msk_path_opt(None);
    let (_, meta_bytes) = crate::raw::get_raw_bytes(config, &bare, htl, 1).await?;
    let metadata = Metadata::parse(&String::from_utf8_lossy(&meta_bytes), false)?;

    let names: Vec<String> = metadata
        .documents()
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, _)| name.to_string())
        .collect();

    let mut files = Vec::with_capacity(names.len());
    for name in names {
        let target = bare.clone().with_msk_path(name.clone());
        let key = resolver::get_smart(config, &target, htl, past, 1).await?;
        files.push(RetrievedFile {
            relpath: name,
            mimetype: key.mimetype,
            data: key.data,
        });
    }
    Ok(files)
}

/// Convenience wrapper over [`get_site`] that writes every retrieved file
/// into `out_dir`, mirroring the directory layout of the original publish.
#[cfg(feature = "fs-directory-reader")]
pub async fn get_site_to_dir(
    config: &ClientConfig,
    site_uri: &Uri,
    htl: u32,
    past: i64,
    out_dir: &std::path::Path,
) -> Result<(), Error> {
    for file in get_site(config, site_uri, htl, past).await? {
        let path = out_dir.join(&file.relpath);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &file.data).await?;
    }
    Ok(())
}

/// A [`DirectoryReader`] backed by `tokio::fs`, for consumers that don't
/// want to supply their own filesystem walker. MIME-type guessing is left
/// to the caller's `guess_mimetype` closure (spec.md §1 names MIME tables
/// as an external collaborator, not this crate's concern).
#[cfg(feature = "fs-directory-reader")]
pub struct FsDirectoryReader<F> {
    root: std::path::PathBuf,
    guess_mimetype: F,
}

#[cfg(feature = "fs-directory-reader")]
impl<F> FsDirectoryReader<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    pub fn new(root: impl Into<std::path::PathBuf>, guess_mimetype: F) -> Self {
        FsDirectoryReader {
            root: root.into(),
            guess_mimetype,
        }
    }
}

#[cfg(feature = "fs-directory-reader")]
impl<F> DirectoryReader for FsDirectoryReader<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    async fn entries(&self) -> Result<Vec<FileEntry>, Error> {
        let mut out = Vec::new();
        let mut stack = vec![std::path::PathBuf::new()];
        while let Some(rel_dir) = stack.pop() {
            let mut dir = tokio::fs::read_dir(self.root.join(&rel_dir)).await?;
            while let Some(entry) = dir.next_entry().await? {
                let file_type = entry.file_type().await?;
                let rel_path = rel_dir.join(entry.file_name());
                if file_type.is_dir() {
                    stack.push(rel_path);
                } else if file_type.is_file() {
                    let relpath = rel_path.to_string_lossy().replace('\\', "/");
                    if relpath == ".freesiterc" {
                        continue;
                    }
                    let mimetype = (self.guess_mimetype)(&relpath);
                    out.push(FileEntry { relpath, mimetype });
                }
            }
        }
        Ok(out)
    }

    async fn read(&self, entry: &FileEntry) -> Result<Vec<u8>, Error> {
        Ok(tokio::fs::read(self.root.join(&entry.relpath)).await?)
    }
}
