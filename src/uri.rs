//! Public URIs derived from an identifier.
//!
//! Pure string construction, no I/O. Titles are used verbatim: callers must
//! supply a title that is already safe as a path segment.

use crate::models::{ArkIdentifier, RightsLevel};

/// Hosts the URIs are built against, taken from the active environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriConfig {
    pub app_url: String,
    pub file_server_url: String,
}

impl UriConfig {
    pub fn landing_uri(&self, ark: &ArkIdentifier) -> String {
        build_landing_uri(&self.app_url, ark.full_ark())
    }

    pub fn download_uri(&self, rights: RightsLevel, ark: &ArkIdentifier, title: &str) -> String {
        build_download_uri(&self.file_server_url, rights.as_str(), ark, title)
    }
}

/// Landing page: `<base>ark:-<authority>-<name>`.
pub fn build_landing_uri(base_app_url: &str, ark: &str) -> String {
    format!("{}ark:-{}", base_app_url, ark.replace('/', "-"))
}

/// Download link: `<file server><rights>/<assigned name>/<title>.zip`.
pub fn build_download_uri(
    file_server_url: &str,
    rights: &str,
    ark: &ArkIdentifier,
    title: &str,
) -> String {
    format!(
        "{}{}/{}/{}.zip",
        file_server_url,
        rights,
        ark.assigned_name(),
        title
    )
}
