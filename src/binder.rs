//! Resolver binding.
//!
//! A bind associates a named field of an already-minted ARK (usually `where`)
//! with a URL at the NOID resolver:
//!
//! ```text
//! <noid_url>bind+set+<ark>+<field>+<base_url><ark>
//! ```
//!
//! The binder validates the identifier before building anything and returns
//! the resolver's raw status code; deciding whether a non-200 answer is worth
//! retrying is left to the caller. Re-binding the same value is safe on the
//! resolver side but not guaranteed idempotent, so treat binds as
//! at-least-once.

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::config::{EndpointsConfig, HttpConfig};
use crate::error::ArkError;
use crate::http;
use crate::models::BindRequest;

pub struct ResolverBinder {
    client: Client,
    http: HttpConfig,
    resolver_base: String,
}

impl ResolverBinder {
    pub fn new(resolver_base: impl Into<String>, http_config: &HttpConfig) -> Result<Self, ArkError> {
        Ok(Self {
            client: http::build_client(http_config)?,
            http: http_config.clone(),
            resolver_base: resolver_base.into(),
        })
    }

    pub fn from_endpoints(
        endpoints: &EndpointsConfig,
        http_config: &HttpConfig,
    ) -> Result<Self, ArkError> {
        Self::new(endpoints.noid_url.clone(), http_config)
    }

    pub fn resolver_base(&self) -> &str {
        &self.resolver_base
    }

    /// The bind URL for `arkid`, or [`ArkError::InvalidArkFormat`].
    pub fn bind_url(&self, arkid: &str, field: &str, base_url: &str) -> Result<String, ArkError> {
        Ok(BindRequest::new(arkid, field, base_url)?.url(&self.resolver_base))
    }

    /// Bind `field` of `arkid` to `base_url + arkid` and return the status code.
    pub fn bind(&self, arkid: &str, field: &str, base_url: &str) -> Result<StatusCode, ArkError> {
        let request = BindRequest::new(arkid, field, base_url)?;
        self.send(&request)
    }

    /// Send a prepared request.
    pub fn send(&self, request: &BindRequest) -> Result<StatusCode, ArkError> {
        let url = request.url(&self.resolver_base);
        let response = http::get_with_retry(&self.client, &self.http, &url)?;
        let status = response.status();
        tracing::info!(ark = %request.arkid, field = %request.field, %status, "bind sent");
        Ok(status)
    }
}
