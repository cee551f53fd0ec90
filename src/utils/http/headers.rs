//! HTTP header utilities for upstream APIs

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE,
};

/// Accept header value for the GitHub REST API v3
pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Common HTTP headers used across upstream APIs
pub struct CommonHeaders;

impl CommonHeaders {
    /// Content-Type: application/json
    pub fn json_content_type() -> (HeaderName, HeaderValue) {
        (CONTENT_TYPE, HeaderValue::from_static("application/json"))
    }

    /// Accept: application/json
    pub fn json_accept() -> (HeaderName, HeaderValue) {
        (ACCEPT, HeaderValue::from_static("application/json"))
    }

    /// Authorization header with Bearer token
    pub fn bearer_auth(token: &str) -> Result<(HeaderName, HeaderValue), InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
        value.set_sensitive(true);
        Ok((AUTHORIZATION, value))
    }

    /// Authorization header in GitHub's `token <oauth-token>` form
    pub fn github_token(token: &str) -> Result<(HeaderName, HeaderValue), InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&format!("token {}", token))?;
        value.set_sensitive(true);
        Ok((AUTHORIZATION, value))
    }
}

/// Builder for HTTP headers
pub struct HeaderBuilder {
    headers: HeaderMap,
}

impl HeaderBuilder {
    /// Create a new header builder
    pub fn new() -> Self {
        Self {
            headers: HeaderMap::new(),
        }
    }

    /// Add content type JSON
    pub fn json_content_type(mut self) -> Self {
        let (name, value) = CommonHeaders::json_content_type();
        self.headers.insert(name, value);
        self
    }

    /// Add `Accept: application/json`
    pub fn json_accept(mut self) -> Self {
        let (name, value) = CommonHeaders::json_accept();
        self.headers.insert(name, value);
        self
    }

    /// Add the GitHub v3 media type
    pub fn github_accept(mut self) -> Self {
        self.headers
            .insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        self
    }

    /// Add Bearer authorization
    pub fn bearer_auth(mut self, token: &str) -> Result<Self, InvalidHeaderValue> {
        let (name, value) = CommonHeaders::bearer_auth(token)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Add GitHub `token` authorization
    pub fn github_token(mut self, token: &str) -> Result<Self, InvalidHeaderValue> {
        let (name, value) = CommonHeaders::github_token(token)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Build the header map
    pub fn build(self) -> HeaderMap {
        self.headers
    }
}

impl Default for HeaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
