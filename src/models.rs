//! Core data types for the identifier lifecycle.
//!
//! An [`ArkIdentifier`] is the structured form of a minted ARK. A
//! [`RightsLevel`] selects the visibility segment of a download URI, and a
//! [`BindRequest`] is the transient value sent to the resolver.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::ArkError;

lazy_static! {
    // Group 1 is the Name Assigning Authority Number, group 2 the assigned name.
    static ref ARK_SEARCH: Regex = Regex::new(r"([0-9]{5})/([0-9A-Za-z_]{11})").unwrap();
    static ref ARK_EXACT: Regex = Regex::new(r"^([0-9]{5})/([0-9A-Za-z_]{11})$").unwrap();
}

/// A minted Archival Resource Key: `<authority_number>/<assigned_name>`.
///
/// Fields are private so the `full == authority + "/" + name` invariant cannot
/// be broken after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArkIdentifier {
    full_ark: String,
    authority_number: String,
    assigned_name: String,
}

impl ArkIdentifier {
    /// Find the first ARK-shaped substring in a larger text.
    ///
    /// Returns `None` when the text has no `NNNNN/xxxxxxxxxxx` candidate.
    pub fn search(text: &str) -> Option<Self> {
        let caps = ARK_SEARCH.captures(text)?;
        Some(Self::from_parts(&caps[1], &caps[2]))
    }

    /// Parse a string that must be exactly one ARK, with no surrounding text.
    ///
    /// An `ark:/` scheme prefix is accepted and stripped.
    pub fn parse(s: &str) -> Result<Self, ArkError> {
        let bare = s.strip_prefix("ark:/").unwrap_or(s);
        let caps = ARK_EXACT
            .captures(bare)
            .ok_or_else(|| ArkError::InvalidArkFormat(s.to_string()))?;
        Ok(Self::from_parts(&caps[1], &caps[2]))
    }

    fn from_parts(authority: &str, name: &str) -> Self {
        Self {
            full_ark: format!("{}/{}", authority, name),
            authority_number: authority.to_string(),
            assigned_name: name.to_string(),
        }
    }

    pub fn full_ark(&self) -> &str {
        &self.full_ark
    }

    pub fn authority_number(&self) -> &str {
        &self.authority_number
    }

    pub fn assigned_name(&self) -> &str {
        &self.assigned_name
    }

    /// The identifier with its explicit scheme prefix, e.g. `ark:/77981/gmgssf2mb2h`.
    pub fn scheme_form(&self) -> String {
        format!("ark:/{}", self.full_ark)
    }
}

impl fmt::Display for ArkIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_ark)
    }
}

impl FromStr for ArkIdentifier {
    type Err = ArkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Whether a string is exactly one bare ARK (`NNNNN/xxxxxxxxxxx`).
pub fn is_valid_ark(s: &str) -> bool {
    ARK_EXACT.is_match(s)
}

/// Access level of a dataset; decides the download URI's visibility segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RightsLevel {
    Public,
    RestrictedUwSystem,
    RestrictedUwm,
}

impl RightsLevel {
    pub const ALL: [RightsLevel; 3] = [
        RightsLevel::Public,
        RightsLevel::RestrictedUwSystem,
        RightsLevel::RestrictedUwm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RightsLevel::Public => "public",
            RightsLevel::RestrictedUwSystem => "restricted-uw-system",
            RightsLevel::RestrictedUwm => "restricted-uwm",
        }
    }

    /// Detect the rights level named inside a free-text constraints statement.
    ///
    /// Restricted tokens are checked first since `public` may appear in
    /// prose around them.
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_ascii_lowercase();
        [
            RightsLevel::RestrictedUwSystem,
            RightsLevel::RestrictedUwm,
            RightsLevel::Public,
        ]
        .into_iter()
        .find(|level| lower.contains(level.as_str()))
    }
}

impl fmt::Display for RightsLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RightsLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RightsLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s.trim())
            .ok_or_else(|| {
                format!(
                    "unknown rights level '{}'. Must be public, restricted-uw-system, or restricted-uwm.",
                    s
                )
            })
    }
}

/// A single resolver bind: set `field` of `arkid` to `target_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    pub arkid: String,
    pub field: String,
    pub target_url: String,
}

impl BindRequest {
    /// Build a request binding `field` to `base_url + arkid`.
    ///
    /// Fails before anything else when `arkid` is not a bare ARK.
    pub fn new(arkid: &str, field: &str, base_url: &str) -> Result<Self, ArkError> {
        if !is_valid_ark(arkid) {
            return Err(ArkError::InvalidArkFormat(arkid.to_string()));
        }
        Ok(Self {
            arkid: arkid.to_string(),
            field: field.to_string(),
            target_url: format!("{}{}", base_url, arkid),
        })
    }

    /// The NOID bind URL for this request against `resolver_base`.
    pub fn url(&self, resolver_base: &str) -> String {
        format!(
            "{}bind+set+{}+{}+{}",
            resolver_base, self.arkid, self.field, self.target_url
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_extracts_ark_from_prose() {
        let text = "id: 77981/gmgssf2mb2h\nnoid minted 1 identifier";
        let ark = ArkIdentifier::search(text).unwrap();
        assert_eq!(ark.full_ark(), "77981/gmgssf2mb2h");
        assert_eq!(ark.authority_number(), "77981");
        assert_eq!(ark.assigned_name(), "gmgssf2mb2h");
    }

    #[test]
    fn search_takes_first_candidate() {
        let text = "12345/aaaaaaaaaaa then 67890/bbbbbbbbbbb";
        let ark = ArkIdentifier::search(text).unwrap();
        assert_eq!(ark.full_ark(), "12345/aaaaaaaaaaa");
    }

    #[test]
    fn search_without_candidate_is_none() {
        assert!(ArkIdentifier::search("").is_none());
        assert!(ArkIdentifier::search("123/abc").is_none());
        assert!(ArkIdentifier::search("77981/short").is_none());
    }

    #[test]
    fn parse_is_strict() {
        assert!(ArkIdentifier::parse("77981/gmgssf2mb2h").is_ok());
        assert!(ArkIdentifier::parse("ark:/77981/gmgssf2mb2h").is_ok());
        assert!(matches!(
            ArkIdentifier::parse("123/abc"),
            Err(ArkError::InvalidArkFormat(_))
        ));
        assert!(ArkIdentifier::parse("77981/gmgssf2mb2h-extra").is_err());
        assert!(ArkIdentifier::parse(" 77981/gmgssf2mb2h").is_err());
    }

    #[test]
    fn scheme_form_has_prefix() {
        let ark = ArkIdentifier::parse("77981/gmgssf2mb2h").unwrap();
        assert_eq!(ark.scheme_form(), "ark:/77981/gmgssf2mb2h");
        assert_eq!(ark.to_string(), "77981/gmgssf2mb2h");
    }

    #[test]
    fn rights_round_trip_through_str() {
        for level in RightsLevel::ALL {
            assert_eq!(level.as_str().parse::<RightsLevel>().unwrap(), level);
        }
        assert!("private".parse::<RightsLevel>().is_err());
    }

    #[test]
    fn rights_detect_prefers_restricted() {
        assert_eq!(
            RightsLevel::detect("Access: restricted-uwm. Not for public release."),
            Some(RightsLevel::RestrictedUwm)
        );
        assert_eq!(
            RightsLevel::detect("PUBLIC domain"),
            Some(RightsLevel::Public)
        );
        assert_eq!(RightsLevel::detect("none given"), None);
    }

    #[test]
    fn bind_request_rejects_malformed_ark() {
        let err = BindRequest::new("123/abc", "where", "https://x/").unwrap_err();
        assert!(matches!(err, ArkError::InvalidArkFormat(_)));
    }

    #[test]
    fn bind_request_url() {
        let req =
            BindRequest::new("77981/gmgssf2mb2h", "where", "https://uwm.edu/libraries/").unwrap();
        assert_eq!(
            req.url("https://noid.example.org/noidu_gmgs?"),
            "https://noid.example.org/noidu_gmgs?bind+set+77981/gmgssf2mb2h+where+https://uwm.edu/libraries/77981/gmgssf2mb2h"
        );
    }
}
