//! Error taxonomy for the identifier lifecycle.
//!
//! Every failure of a minting, writing, or binding step is reported through
//! [`ArkError`]. Transport failures, unexpected HTTP statuses, and unparseable
//! minter responses are distinct variants so callers can tell "the service was
//! unreachable" apart from "the service answered with something that is not an
//! identifier".

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ArkError {
    /// The request could not be sent or no response was received (includes timeouts).
    #[error("connection error for {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a status other than 200. The body is not trusted.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { url: String, status: StatusCode },

    /// A 200 response that contained no ARK-shaped substring.
    #[error("minter response contained no ARK identifier: {snippet:?}")]
    MintParse { snippet: String },

    /// An identifier handed to the binder or writer is not `NNNNN/xxxxxxxxxxx`.
    #[error("invalid ARK identifier format: {0:?}")]
    InvalidArkFormat(String),

    /// The metadata document lacks an element the write requires.
    #[error("metadata schema violation: {0}")]
    SchemaViolation(String),

    /// The metadata document is not well-formed XML.
    #[error("malformed metadata XML: {0}")]
    Xml(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_value() {
        let err = ArkError::InvalidArkFormat("123/abc".into());
        assert_eq!(err.to_string(), "invalid ARK identifier format: \"123/abc\"");
    }
}
