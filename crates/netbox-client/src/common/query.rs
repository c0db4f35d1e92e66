//! Query utilities for NetBox API
//!
//! List endpoints are always fetched completely, following `next` links.

use crate::common::HttpClient;
use crate::error::NetBoxError;
use serde::de::DeserializeOwned;

/// List all objects of `endpoint` (e.g. `dcim/devices`) matching `filters`
pub async fn query_resources<T: DeserializeOwned>(
    http: &HttpClient,
    endpoint: &str,
    filters: &[(&str, &str)],
) -> Result<Vec<T>, NetBoxError> {
    let query_string = HttpClient::build_query_string(filters);
    let path = if query_string.is_empty() {
        format!("/api/{}/", endpoint)
    } else {
        format!("/api/{}/?{}", endpoint, query_string)
    };

    http.fetch_all_pages(http.build_url(&path)).await
}
