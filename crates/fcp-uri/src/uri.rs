use std::fmt;

use crate::{KeyType, PubSuffix, UriError, dbr::dbr};

/// A parsed Freenet key URI.
///
/// `ssk_path` is carried on every key type (mirroring the reference
/// implementation) but is only ever rendered for [`KeyType::Ssk`] — other key
/// types simply have no subpath syntax. [`Uri::dbr`] sets it uniformly; for
/// non-SSK types the result renders identically to the input because the
/// subpath never appears in text form for those types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uri {
    kind: KeyType,
    hash: String,
    pub_suffix: Option<PubSuffix>,
    ssk_path: String,
    msk_path: Option<String>,
}

impl Uri {
    /// Builds a URI from its parts without going through text parsing.
    pub fn new(kind: KeyType, hash: impl Into<String>) -> Self {
        Uri {
            kind,
            hash: hash.into(),
            pub_suffix: None,
            ssk_path: String::new(),
            msk_path: None,
        }
    }

    pub fn kind(&self) -> KeyType {
        self.kind
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn pub_suffix(&self) -> Option<PubSuffix> {
        self.pub_suffix
    }

    pub fn ssk_path(&self) -> &str {
        &self.ssk_path
    }

    pub fn msk_path(&self) -> Option<&str> {
        self.msk_path.as_deref()
    }

    pub fn with_pub_suffix(mut self, suffix: PubSuffix) -> Self {
        self.pub_suffix = Some(suffix);
        self
    }

    pub fn with_ssk_path(mut self, path: impl Into<String>) -> Self {
        self.ssk_path = path.into();
        self
    }

    pub fn with_msk_path(mut self, path: impl Into<String>) -> Self {
        self.msk_path = Some(path.into());
        self
    }

    /// Returns a copy of this URI with its `msk_path` replaced, or removed
    /// when `path` is `None`. Used by the resolver to peel off path segments
    /// as it descends through nested document lookups.
    pub fn with_msk_path_opt(mut self, path: Option<String>) -> Self {
        self.msk_path = path;
        self
    }

    /// `CHK@` — the insert template used when no explicit URI is given to a
    /// `put`.
    pub fn chk_template() -> Self {
        Uri::new(KeyType::Chk, "")
    }

    /// Builds a public SSK URI from a bare hash and a suffix learned out of
    /// band — e.g. the node's handshake-reported flavor, or the public half
    /// of a freshly generated keypair.
    pub fn ssk_public(hash: impl Into<String>, suffix: PubSuffix, ssk_path: impl Into<String>) -> Self {
        Uri {
            kind: KeyType::Ssk,
            hash: hash.into(),
            pub_suffix: Some(suffix),
            ssk_path: ssk_path.into(),
            msk_path: None,
        }
    }

    /// Parses a URI string.
    ///
    /// The `pub_suffix` of an SSK, if any, is read off the trailing 4
    /// characters of its hash (`PAgM` or `BCMA`); a hash without one of
    /// those tags is a private-key SSK and carries no suffix. See
    /// [`Uri::ssk_public`] for attaching a suffix that was learned out of
    /// band (e.g. from the node's handshake) rather than parsed from text.
    pub fn parse(raw: &str) -> Result<Self, UriError> {
        if raw.is_empty() {
            return Err(UriError::Empty);
        }

        let raw = raw
            .strip_prefix("freenet:")
            .or_else(|| raw.strip_prefix("entropy:"))
            .unwrap_or(raw);

        let mut at_parts = raw.splitn(3, '@');
        let type_part = at_parts.next().unwrap_or("");
        let rest = match at_parts.next() {
            Some(r) => r,
            None => return Err(UriError::MissingAt(raw.to_string())),
        };
        if at_parts.next().is_some() {
            return Err(UriError::MultipleAt(raw.to_string()));
        }

        let kind = KeyType::from_str_opt(type_part)
            .ok_or_else(|| UriError::UnknownKeyType(type_part.to_string(), raw.to_string()))?;

        // Split off the msk_path: everything after the first "//", with any
        // further "//" occurrences inside the msk_path preserved verbatim.
        let mut msk_split = rest.splitn(2, "//");
        let pre_msk = msk_split.next().unwrap_or("");
        let msk_path = msk_split.next().map(|s| s.to_string());

        let (hash, pub_suffix, ssk_path) = if kind == KeyType::Ssk {
            let mut ssk_split = pre_msk.splitn(2, '/');
            let hash_with_suffix = ssk_split.next().unwrap_or("");
            let ssk_path = ssk_split.next().unwrap_or("").to_string();

            if hash_with_suffix.len() > 4 {
                let (head, tag) = hash_with_suffix.split_at(hash_with_suffix.len() - 4);
                match PubSuffix::from_tag(tag) {
                    Some(suffix) => (head.to_string(), Some(suffix), ssk_path),
                    None => (hash_with_suffix.to_string(), None, ssk_path),
                }
            } else {
                (hash_with_suffix.to_string(), None, ssk_path)
            }
        } else {
            (pre_msk.to_string(), None, String::new())
        };

        if hash.is_empty() && kind != KeyType::Chk {
            return Err(UriError::EmptyHash(raw.to_string()));
        }

        Ok(Uri {
            kind,
            hash,
            pub_suffix,
            ssk_path,
            msk_path,
        })
    }

    /// Renders this URI back to its text form.
    pub fn render(&self) -> String {
        let msk_bits = match &self.msk_path {
            Some(p) => format!("//{p}"),
            None => String::new(),
        };

        if self.kind == KeyType::Ssk {
            let suffix = self.pub_suffix.map(|s| s.as_str()).unwrap_or("");
            let ssk_bits = if self.ssk_path.is_empty() {
                String::new()
            } else {
                format!("/{}", self.ssk_path)
            };
            format!("SSK@{}{}{}{}", self.hash, suffix, ssk_bits, msk_bits)
        } else {
            format!("{}@{}{}", self.kind, self.hash, msk_bits)
        }
    }

    /// Computes a DBR-adjusted copy of this URI: prepends the DBR hex prefix
    /// to `ssk_path`. Only valid for [`KeyType::Ksk`] and [`KeyType::Ssk`].
    pub fn dbr(&self, future: i64, increment: u32, offset: u32) -> Result<Self, UriError> {
        if self.kind != KeyType::Ksk && self.kind != KeyType::Ssk {
            return Err(UriError::DbrNotAllowed(self.kind));
        }
        let prefix = dbr(future, increment, offset);
        let new_path = if self.ssk_path.is_empty() {
            prefix
        } else {
            format!("{prefix}-{}", self.ssk_path)
        };
        Ok(Uri {
            ssk_path: new_path,
            ..self.clone()
        })
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl std::str::FromStr for Uri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uri::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chk() {
        let u = Uri::parse("CHK@abc123").unwrap();
        assert_eq!(u.kind(), KeyType::Chk);
        assert_eq!(u.hash(), "abc123");
        assert_eq!(u.msk_path(), None);
    }

    #[test]
    fn parses_chk_with_msk_path() {
        let u = Uri::parse("CHK@abc123//docs/index.html").unwrap();
        assert_eq!(u.msk_path(), Some("docs/index.html"));
        assert_eq!(u.render(), "CHK@abc123//docs/index.html");
    }

    #[test]
    fn scenario_1_from_spec() {
        let u = Uri::parse("freenet:SSK@abcdefPAgM/site//docs/index.html").unwrap();
        assert_eq!(u.kind(), KeyType::Ssk);
        assert_eq!(u.hash(), "abcdef");
        assert_eq!(u.pub_suffix(), Some(PubSuffix::Standard));
        assert_eq!(u.ssk_path(), "site");
        assert_eq!(u.msk_path(), Some("docs/index.html"));
        assert_eq!(u.render(), "SSK@abcdefPAgM/site//docs/index.html");
    }

    #[test]
    fn private_ssk_has_no_suffix() {
        let u = Uri::parse("SSK@privatehashnosuffix/site").unwrap();
        assert_eq!(u.pub_suffix(), None);
        assert_eq!(u.hash(), "privatehashnosuffix");
        assert_eq!(u.render(), "SSK@privatehashnosuffix/site");
    }

    #[test]
    fn rejects_multiple_at() {
        assert_eq!(
            Uri::parse("CHK@a@b"),
            Err(UriError::MultipleAt("CHK@a@b".to_string()))
        );
    }

    #[test]
    fn rejects_missing_at() {
        assert!(matches!(Uri::parse("CHKabc"), Err(UriError::MissingAt(_))));
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(matches!(
            Uri::parse("FOO@bar"),
            Err(UriError::UnknownKeyType(_, _))
        ));
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(Uri::parse(""), Err(UriError::Empty));
    }

    #[test]
    fn chk_template_allows_empty_hash() {
        let u = Uri::parse("CHK@").unwrap();
        assert_eq!(u.hash(), "");
        assert_eq!(u.render(), "CHK@");
    }

    #[test]
    fn ksk_rejects_empty_hash() {
        assert!(matches!(Uri::parse("KSK@"), Err(UriError::EmptyHash(_))));
    }

    #[test]
    fn dbr_fails_for_chk() {
        let u = Uri::parse("CHK@abc").unwrap();
        assert_eq!(u.dbr(0, 86400, 0), Err(UriError::DbrNotAllowed(KeyType::Chk)));
    }

    #[test]
    fn dbr_prefixes_ssk_path() {
        let u = Uri::parse("SSK@hashPAgM/site").unwrap();
        let d = u.dbr(0, 0x15180, 0).unwrap();
        assert!(d.ssk_path().ends_with("-site"));
    }
}
