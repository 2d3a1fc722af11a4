//! Writing identifiers into a metadata record.
//!
//! [`write_identifiers`] sets three fields from one identifier:
//!
//! | Field | Path | Value |
//! |-------|------|-------|
//! | citation identifier | `dataIdInfo/idCitation/citId/identCode` | landing URI |
//! | metadata file ID | `mdFileID` | `ark:/<authority>/<name>` |
//! | dataset URI | `dataSetURI` | download URI |
//!
//! Each field is written at one fixed location, relative to the root. An existing
//! element has its text replaced; a missing one is created with only the
//! ancestors it lacks, so repeated writes never add sibling elements. Elements
//! with the same name elsewhere in the record (lineage source citations, for
//! instance) are left alone.

use crate::error::ArkError;
use crate::metadata::{MetadataDocument, MetadataField};
use crate::models::{ArkIdentifier, RightsLevel};
use crate::uri::UriConfig;

/// Where a written field lives: the parent it hangs off (the root when
/// `None`) and the element chain below that parent.
struct Target {
    parent: Option<&'static str>,
    chain: &'static [&'static str],
}

impl Target {
    fn path(&self) -> String {
        match self.parent {
            Some(parent) => format!("{}/{}", parent, self.chain.join("/")),
            None => self.chain.join("/"),
        }
    }
}

const CITATION_IDENTIFIER: Target = Target {
    parent: Some("dataIdInfo/idCitation"),
    chain: &["citId", "identCode"],
};
const METADATA_FILE_ID: Target = Target {
    parent: None,
    chain: &["mdFileID"],
};
const DATASET_URI: Target = Target {
    parent: None,
    chain: &["dataSetURI"],
};

/// Write the citation identifier, metadata file ID, and dataset URI.
///
/// The document is mutated in place and returned for chaining. When the
/// record has no `dataIdInfo/idCitation` block, nothing is written and
/// [`ArkError::SchemaViolation`] is returned.
pub fn write_identifiers<'d>(
    doc: &'d mut MetadataDocument,
    ark: &ArkIdentifier,
    uris: &UriConfig,
    rights: RightsLevel,
    title: &str,
) -> Result<&'d mut MetadataDocument, ArkError> {
    let landing = uris.landing_uri(ark);
    let file_id = ark.scheme_form();
    let download = uris.download_uri(rights, ark, title);

    if !doc.exists(MetadataField::CitationBlock.path()) {
        return Err(ArkError::SchemaViolation(format!(
            "record has no citation block ({}) to hold the citation identifier",
            MetadataField::CitationBlock.path()
        )));
    }

    upsert(doc, &CITATION_IDENTIFIER, &landing)?;
    upsert(doc, &METADATA_FILE_ID, &file_id)?;
    upsert(doc, &DATASET_URI, &download)?;

    tracing::debug!(ark = %ark, %landing, %download, "identifiers written");
    Ok(doc)
}

fn upsert(doc: &mut MetadataDocument, target: &Target, value: &str) -> Result<(), ArkError> {
    let path = target.path();
    let removed = doc.remove_duplicates(&path);
    if removed > 0 {
        tracing::warn!(%path, removed, "removed duplicate elements");
    }

    match doc.find_mut(&path) {
        Some(element) => element.set_text(value),
        None => doc.ensure_chain(target.parent, target.chain)?.set_text(value),
    }
    Ok(())
}

/// Rewrite every contact's hours; returns the number of elements updated.
pub fn set_contact_hours(doc: &mut MetadataDocument, hours: &str) -> Result<usize, ArkError> {
    let n = doc.set_text_all(MetadataField::ContactHours.path(), hours);
    if n == 0 {
        return Err(ArkError::SchemaViolation(format!(
            "record has no contact hours ({})",
            MetadataField::ContactHours.path()
        )));
    }
    Ok(n)
}

/// The dataset's alternate title, used as the download file name.
pub fn read_alt_title(doc: &MetadataDocument) -> Result<String, ArkError> {
    doc.get(MetadataField::AltTitle)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ArkError::SchemaViolation(format!(
                "record has no alternate title ({})",
                MetadataField::AltTitle.path()
            ))
        })
}

/// The rights level named in any of the record's constraint statements.
pub fn read_rights(doc: &MetadataDocument) -> Option<RightsLevel> {
    doc.find_all(MetadataField::Rights.path())
        .into_iter()
        .filter_map(|e| e.text())
        .find_map(|t| RightsLevel::detect(&t))
}
