//! Common utilities for NetBox API client
//!
//! Provides the authenticated HTTP wrapper shared by all API groups.

pub mod query;

use crate::error::NetBoxError;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Paginated response wrapper from NetBox API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// HTTP client wrapper with authentication
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path; absolute URLs (pagination links) pass through
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
    }

    /// Map non-success responses onto `NetBoxError`
    async fn check(method: &str, path: &str, response: Response) -> Result<Response, NetBoxError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                NetBoxError::Authentication(format!("{} {} failed: {} - {}", method, path, status, body))
            }
            StatusCode::NOT_FOUND => {
                NetBoxError::NotFound(format!("{} ({})", path, body))
            }
            _ => NetBoxError::Api(format!("{} {} failed: {} - {}", method, path, status, body)),
        })
    }

    /// Fetch all pages of a paginated response
    pub async fn fetch_all_pages<T: DeserializeOwned>(
        &self,
        mut url: String,
    ) -> Result<Vec<T>, NetBoxError> {
        let mut all_results = Vec::new();

        loop {
            debug!("Fetching page: {}", url);

            let response = self.authorized(self.client.get(&url)).send().await?;
            let response = Self::check("GET", &url, response).await?;

            let response_text = response.text().await?;
            let page: PaginatedResponse<T> = serde_json::from_str(&response_text).map_err(|e| {
                NetBoxError::Api(format!(
                    "error decoding response body: {} - Response (first 500 chars): {}",
                    e,
                    response_text.chars().take(500).collect::<String>()
                ))
            })?;
            all_results.extend(page.results);

            match page.next {
                Some(next_url) => url = self.build_url(&next_url),
                None => break,
            }
        }

        Ok(all_results)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, NetBoxError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self.authorized(self.client.get(&url)).send().await?;
        Ok(Self::check("GET", path, response).await?.json().await?)
    }

    /// Make a POST request
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, NetBoxError> {
        let url = self.build_url(path);
        debug!("POST {}", url);

        let response = self
            .authorized(self.client.post(&url))
            .json(body)
            .send()
            .await?;
        Ok(Self::check("POST", path, response).await?.json().await?)
    }

    /// Make a PATCH request
    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, NetBoxError> {
        let url = self.build_url(path);
        debug!("PATCH {}", url);

        let response = self
            .authorized(self.client.patch(&url))
            .json(body)
            .send()
            .await?;
        Ok(Self::check("PATCH", path, response).await?.json().await?)
    }

    /// Build query string from filters; empty values are wildcards and dropped
    pub fn build_query_string(filters: &[(&str, &str)]) -> String {
        filters
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
