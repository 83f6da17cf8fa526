use std::fmt;

/// The type tag of a Freenet key URI, taken from the text before its `@`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Content Hash Key — content-addressed.
    Chk,
    /// Keyword-Signed Key — human-readable name.
    Ksk,
    /// Signed Subspace Key — asymmetric-key-bound namespace with subpaths.
    Ssk,
    /// Signature-Verified Key — raw signed key pair.
    Svk,
    /// Nested document lookup path marker, used only after `//` in another URI.
    Msk,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Chk => "CHK",
            KeyType::Ksk => "KSK",
            KeyType::Ssk => "SSK",
            KeyType::Svk => "SVK",
            KeyType::Msk => "MSK",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "CHK" => Some(KeyType::Chk),
            "KSK" => Some(KeyType::Ksk),
            "SSK" => Some(KeyType::Ssk),
            "SVK" => Some(KeyType::Svk),
            "MSK" => Some(KeyType::Msk),
            _ => None,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
