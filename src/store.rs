//! Metadata document backends.
//!
//! The identifier workflow only needs to read a record and save it back; the
//! [`MetadataStore`] trait is that seam. [`XmlFileStore`] keeps each record as
//! a standalone XML file (e.g. an ArcGIS `.shp.xml` sidecar).

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::metadata::MetadataDocument;

pub trait MetadataStore {
    /// Human-readable location, used in logs and failure reports.
    fn location(&self) -> String;

    /// Read the full record as XML text.
    fn read_xml(&self) -> Result<String>;

    /// Persist the record.
    fn save(&mut self, doc: &MetadataDocument) -> Result<()>;

    /// Read and parse the record.
    fn load(&self) -> Result<MetadataDocument> {
        let xml = self.read_xml()?;
        MetadataDocument::parse(&xml)
            .with_context(|| format!("Failed to parse metadata at {}", self.location()))
    }
}

/// A record stored as one UTF-8 XML file.
pub struct XmlFileStore {
    path: PathBuf,
}

impl XmlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MetadataStore for XmlFileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn read_xml(&self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read metadata file: {}", self.path.display()))
    }

    /// Written to a sibling temp file first, then renamed over the original.
    fn save(&mut self, doc: &MetadataDocument) -> Result<()> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Not a file path: {}", self.path.display()))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        std::fs::write(&tmp, doc.to_xml())
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "metadata saved");
        Ok(())
    }
}
