use std::collections::BTreeMap;

use fcp_uri::Uri;

use crate::action::{Action, DEFAULT_INCREMENT};
use crate::document::Document;
use crate::error::MetadataError;
use crate::target_uri::TargetUri;

/// A parsed Freenet metadata document: the text blob that accompanies most
/// keys and tells a client how to find the actual data (or that the key's
/// own payload already is the data).
///
/// Documents are keyed by name; the empty name `""` is the default document
/// a `ClientGet` without an explicit sub-path resolves against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    revision: u32,
    documents: BTreeMap<String, Document>,
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata::empty()
    }
}

impl Metadata {
    /// A metadata document with no documents in it at all, rendering as
    /// nothing having been fetched yet. Distinct from a default document
    /// whose action is [`Action::None`].
    pub fn empty() -> Self {
        Metadata {
            revision: 1,
            documents: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }

    pub fn document(&self, name: &str) -> Option<&Document> {
        self.documents.get(name)
    }

    pub fn documents(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.documents.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn insert(&mut self, name: impl Into<String>, document: Document) {
        self.documents.insert(name.into(), document);
    }

    pub fn add_redirect(&mut self, name: impl Into<String>, target: Uri) {
        self.insert(name, Document::new(Action::Redirect(target)));
    }

    pub fn add_date_redirect(
        &mut self,
        name: impl Into<String>,
        target: Uri,
        increment: u32,
        offset: u32,
    ) {
        self.insert(
            name,
            Document::new(Action::DateRedirect {
                target,
                increment,
                offset,
            }),
        );
    }

    pub fn add_splitfile(&mut self, name: impl Into<String>, splitsize: u32, chunks: Vec<Uri>) {
        self.insert(name, Document::new(Action::SplitFile { splitsize, chunks }));
    }

    /// Resolves `doc` to whatever it ultimately points at.
    ///
    /// If `doc` has no entry but a default document (`""`) exists, the
    /// default's target is returned with its `msk_path` overridden to
    /// `doc` so a nested lookup under a manifest-style container still
    /// reaches the right sub-path.
    pub fn target_uri(&self, doc: &str, future: i64) -> Result<TargetUri, MetadataError> {
        if let Some(d) = self.documents.get(doc) {
            return match &d.action {
                Action::None => Ok(TargetUri::Terminal),
                Action::Redirect(target) => Ok(TargetUri::Single(target.clone())),
                Action::DateRedirect {
                    target,
                    increment,
                    offset,
                } => Ok(TargetUri::Single(target.dbr(future, *increment, *offset)?)),
                Action::SplitFile { chunks, .. } => Ok(TargetUri::SplitFile(chunks.clone())),
            };
        }

        if doc.is_empty() {
            return Ok(TargetUri::Terminal);
        }

        match self.target_uri("", future)? {
            TargetUri::Single(u) => Ok(TargetUri::Single(u.with_msk_path(doc.to_string()))),
            other => Ok(other),
        }
    }

    /// Parses wire-format metadata text.
    ///
    /// In strict mode, a missing header/footer or a malformed field line is
    /// an error. In non-strict mode these are tolerated: a missing header
    /// or footer yields an empty metadata, and malformed lines are skipped.
    pub fn parse(text: &str, strict: bool) -> Result<Metadata, MetadataError> {
        if text.is_empty() {
            return Ok(Metadata::empty());
        }

        let mut lines = text.lines();

        let header = lines.next().map(str::trim).unwrap_or_default();
        if header != "Version" {
            if strict {
                return Err(MetadataError::MissingHeader);
            }
            return Ok(Metadata::empty());
        }

        let revision_line = lines.next().map(str::trim).unwrap_or_default();
        let revision = match revision_line.strip_prefix("Revision=") {
            Some(v) => hex_u32(v).map_err(|_| MetadataError::BadRevision(revision_line.into()))?,
            None => {
                if strict {
                    return Err(MetadataError::BadRevision(revision_line.into()));
                }
                1
            }
        };

        let remaining: Vec<&str> = lines.collect();
        let end_idx = remaining.iter().rposition(|l| l.trim() == "End");
        let end_idx = match end_idx {
            Some(i) => i,
            None => {
                if strict {
                    return Err(MetadataError::MissingFooter);
                }
                remaining.len()
            }
        };
        let body = &remaining[..end_idx];

        let mut parts: Vec<Vec<&str>> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut i = 0;
        while i < body.len() {
            let line = body[i].trim();
            if line == "EndPart" && body.get(i + 1).map(|s| s.trim()) == Some("Document") {
                parts.push(std::mem::take(&mut current));
                i += 2;
                continue;
            }
            if !line.is_empty() {
                current.push(line);
            }
            i += 1;
        }
        parts.push(current);

        let mut documents = BTreeMap::new();
        for part in parts {
            if part.is_empty() {
                continue;
            }
            let (name, document) = parse_document(&part, strict)?;
            documents.insert(name, document);
        }

        Ok(Metadata {
            revision,
            documents,
        })
    }

    /// Renders this metadata back to wire-format text. The default document
    /// (if present) is always emitted first.
    pub fn render(&self) -> String {
        let mut out = format!("Version\nRevision={:x}\n", self.revision);

        let mut first = true;
        for (name, doc) in &self.documents {
            if !first {
                out.push_str("EndPart\nDocument\n");
            }
            first = false;

            if !name.is_empty() {
                out.push_str(&format!("Name={name}\n"));
            }

            match &doc.action {
                Action::None => {}
                Action::Redirect(target) => {
                    out.push_str(&format!("Redirect.Target={}\n", target.render()));
                }
                Action::DateRedirect {
                    target,
                    increment,
                    offset,
                } => {
                    out.push_str(&format!("DateRedirect.Target={}\n", target.render()));
                    if *offset != 0 {
                        out.push_str(&format!("DateRedirect.Offset={offset:x}\n"));
                    }
                    if *increment != DEFAULT_INCREMENT {
                        out.push_str(&format!("DateRedirect.Increment={increment:x}\n"));
                    }
                }
                Action::SplitFile { splitsize, chunks } => {
                    out.push_str(&format!("SplitFile.Size={splitsize:x}\n"));
                    out.push_str(&format!("SplitFile.BlockCount={:x}\n", chunks.len()));
                    for (idx, chunk) in chunks.iter().enumerate() {
                        out.push_str(&format!(
                            "SplitFile.Block.{:x}={}\n",
                            idx + 1,
                            chunk.render()
                        ));
                    }
                }
            }

            if let Some(m) = &doc.mimetype {
                out.push_str(&format!("Info.Format={m}\n"));
            }
            if let Some(d) = &doc.description {
                out.push_str(&format!("Info.Description={d}\n"));
            }
            for (k, v) in &doc.extras {
                out.push_str(&format!("{k}={v}\n"));
            }
        }

        out.push_str("End\n");
        out
    }
}

fn hex_u32(s: &str) -> Result<u32, std::num::ParseIntError> {
    u32::from_str_radix(s.trim(), 16)
}

fn parse_document(lines: &[&str], strict: bool) -> Result<(String, Document), MetadataError> {
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    for line in lines {
        match line.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => {
                fields.insert(k.trim().to_string(), v.trim().to_string());
            }
            _ => {
                if strict {
                    return Err(MetadataError::MalformedLine((*line).to_string()));
                }
            }
        }
    }

    let name = fields.remove("Name").unwrap_or_default();

    let action = if let Some(target) = fields.remove("Redirect.Target") {
        Action::Redirect(Uri::parse(&target)?)
    } else if let Some(target) = fields.remove("DateRedirect.Target") {
        let increment = match fields.remove("DateRedirect.Increment") {
            Some(v) => hex_u32(&v).map_err(|_| MetadataError::MalformedLine(v))?,
            None => DEFAULT_INCREMENT,
        };
        let offset = match fields.remove("DateRedirect.Offset") {
            Some(v) => hex_u32(&v).map_err(|_| MetadataError::MalformedLine(v))?,
            None => 0,
        };
        Action::DateRedirect {
            target: Uri::parse(&target)?,
            increment,
            offset,
        }
    } else if let Some(count) = fields.remove("SplitFile.BlockCount") {
        let blockcount = hex_u32(&count).map_err(|_| MetadataError::MalformedLine(count))?;
        let splitsize = match fields.remove("SplitFile.Size") {
            Some(v) => hex_u32(&v).map_err(|_| MetadataError::MalformedLine(v))?,
            None => {
                return Err(MetadataError::MissingField(
                    name.clone(),
                    "SplitFile.Size",
                ));
            }
        };
        let mut chunks = Vec::with_capacity(blockcount as usize);
        for idx in 1..=blockcount {
            let key = format!("SplitFile.Block.{idx:x}");
            match fields.remove(&key) {
                Some(v) => chunks.push(Uri::parse(&v)?),
                None => {
                    if strict {
                        return Err(MetadataError::MissingField(
                            name.clone(),
                            "SplitFile.Block.<n>",
                        ));
                    }
                }
            }
        }
        Action::SplitFile { splitsize, chunks }
    } else {
        Action::None
    };

    let mimetype = fields.remove("Info.Format");
    let description = fields.remove("Info.Description");

    Ok((
        name,
        Document {
            action,
            mimetype,
            description,
            extras: fields,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_empty_metadata() {
        let m = Metadata::parse("", true).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn scenario_default_redirect() {
        let text = "Version\nRevision=1\nEndPart\nDocument\nRedirect.Target=CHK@xyz\nEnd\n";
        let m = Metadata::parse(text, true).unwrap();
        assert_eq!(m.revision(), 1);
        let doc = m.document("").unwrap();
        match &doc.action {
            Action::Redirect(u) => assert_eq!(u.render(), "CHK@xyz"),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn render_round_trip_single_redirect() {
        let mut m = Metadata::empty();
        m.add_redirect("", Uri::parse("CHK@xyz").unwrap());
        let rendered = m.render();
        let reparsed = Metadata::parse(&rendered, true).unwrap();
        assert_eq!(m, reparsed);
    }

    #[test]
    fn render_round_trip_multi_document() {
        let mut m = Metadata::empty();
        m.add_redirect("", Uri::parse("CHK@default").unwrap());
        m.add_redirect("about.html", Uri::parse("CHK@about").unwrap());
        let rendered = m.render();
        let reparsed = Metadata::parse(&rendered, true).unwrap();
        assert_eq!(m, reparsed);
        assert!(rendered.find("Name=").unwrap() > rendered.find("Redirect.Target=CHK@default").unwrap());
    }

    #[test]
    fn splitfile_round_trip() {
        let mut m = Metadata::empty();
        m.add_splitfile(
            "",
            0x4_0000,
            vec![
                Uri::parse("CHK@a").unwrap(),
                Uri::parse("CHK@b").unwrap(),
                Uri::parse("CHK@c").unwrap(),
            ],
        );
        let rendered = m.render();
        let reparsed = Metadata::parse(&rendered, true).unwrap();
        assert_eq!(m, reparsed);
        match &reparsed.document("").unwrap().action {
            Action::SplitFile { chunks, splitsize } => {
                assert_eq!(*splitsize, 0x4_0000);
                assert_eq!(chunks.len(), 3);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn info_description_is_kept_distinct_from_mimetype() {
        // A past implementation this crate does not imitate aliased
        // Info.Description onto the mimetype field; here the two stay
        // independent attributes of a document.
        let text = "Version\nRevision=1\nInfo.Format=text/html\nInfo.Description=hello world\nEnd\n";
        let m = Metadata::parse(text, true).unwrap();
        let doc = m.document("").unwrap();
        assert_eq!(doc.mimetype.as_deref(), Some("text/html"));
        assert_eq!(doc.description.as_deref(), Some("hello world"));
    }

    #[test]
    fn unknown_fields_survive_as_extras() {
        let text = "Version\nRevision=1\nSome.Unknown.Field=value\nEnd\n";
        let m = Metadata::parse(text, true).unwrap();
        let doc = m.document("").unwrap();
        assert_eq!(doc.extras.get("Some.Unknown.Field"), Some(&"value".to_string()));
        let rendered = m.render();
        assert!(rendered.contains("Some.Unknown.Field=value"));
    }

    #[test]
    fn missing_header_is_error_in_strict_mode() {
        let text = "Revision=1\nEnd\n";
        assert!(matches!(
            Metadata::parse(text, true),
            Err(MetadataError::MissingHeader)
        ));
    }

    #[test]
    fn missing_header_is_tolerated_in_non_strict_mode() {
        let text = "Revision=1\nEnd\n";
        let m = Metadata::parse(text, false).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn target_uri_terminal_for_action_none() {
        let mut m = Metadata::empty();
        m.insert("", Document::new(Action::None));
        assert_eq!(m.target_uri("", 0).unwrap(), TargetUri::Terminal);
    }

    #[test]
    fn target_uri_absent_doc_inherits_default_with_msk_path() {
        let mut m = Metadata::empty();
        m.add_redirect("", Uri::parse("CHK@default").unwrap());
        match m.target_uri("some/path", 0).unwrap() {
            TargetUri::Single(u) => {
                assert_eq!(u.msk_path(), Some("some/path"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn target_uri_no_default_and_absent_doc_is_terminal() {
        let m = Metadata::empty();
        assert_eq!(m.target_uri("missing", 0).unwrap(), TargetUri::Terminal);
    }

    #[test]
    fn date_redirect_round_trip_with_explicit_params() {
        let mut m = Metadata::empty();
        m.add_date_redirect("", Uri::parse("SSK@hashPAgM/site").unwrap(), 3600, 100);
        let rendered = m.render();
        let reparsed = Metadata::parse(&rendered, true).unwrap();
        assert_eq!(m, reparsed);
        assert!(rendered.contains("DateRedirect.Offset=64\n"));
        assert!(rendered.contains("DateRedirect.Increment=e10\n"));
    }
}
