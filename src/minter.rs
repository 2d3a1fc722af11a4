//! ARK minting against a NOID service.
//!
//! [`ArkMinter::mint`] issues `GET <noid_url>mint+1` and extracts the first
//! `NNNNN/xxxxxxxxxxx` substring from the response text. Every successful call
//! consumes a fresh identifier from the service's namespace; nothing is pooled
//! or reused.

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::config::{EndpointsConfig, HttpConfig};
use crate::error::ArkError;
use crate::http;
use crate::models::ArkIdentifier;

/// Longest slice of a bad minter response kept in [`ArkError::MintParse`].
const SNIPPET_CHARS: usize = 200;

pub struct ArkMinter {
    client: Client,
    http: HttpConfig,
    mint_url: String,
}

impl ArkMinter {
    /// Create a minter for a full mint URL (e.g. `https://host/noidu_gmgs?mint+1`).
    pub fn new(mint_url: impl Into<String>, http_config: &HttpConfig) -> Result<Self, ArkError> {
        Ok(Self {
            client: http::build_client(http_config)?,
            http: http_config.clone(),
            mint_url: mint_url.into(),
        })
    }

    /// Create a minter for the environment's NOID service.
    pub fn from_endpoints(
        endpoints: &EndpointsConfig,
        http_config: &HttpConfig,
    ) -> Result<Self, ArkError> {
        Self::new(endpoints.mint_url(), http_config)
    }

    pub fn mint_url(&self) -> &str {
        &self.mint_url
    }

    /// Mint one new identifier.
    ///
    /// # Errors
    ///
    /// - [`ArkError::Connection`] when no response arrives after all retries.
    /// - [`ArkError::UnexpectedStatus`] for any status other than 200.
    /// - [`ArkError::MintParse`] when a 200 body holds no ARK.
    pub fn mint(&self) -> Result<ArkIdentifier, ArkError> {
        let response = http::get_with_retry(&self.client, &self.http, &self.mint_url)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ArkError::UnexpectedStatus {
                url: self.mint_url.clone(),
                status,
            });
        }

        let body = response.text().map_err(|source| ArkError::Connection {
            url: self.mint_url.clone(),
            source,
        })?;

        let ark = parse_minter_response(&body)?;
        tracing::info!(ark = %ark, "minted identifier");
        Ok(ark)
    }
}

/// Extract the first ARK from a minter response body.
pub fn parse_minter_response(body: &str) -> Result<ArkIdentifier, ArkError> {
    ArkIdentifier::search(body).ok_or_else(|| ArkError::MintParse {
        snippet: body.chars().take(SNIPPET_CHARS).collect(),
    })
}
