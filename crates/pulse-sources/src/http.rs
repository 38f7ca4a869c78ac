//! Shared request helpers.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::SourceError;

/// Builds the HTTP client shared by every request of one API client.
pub(crate) fn build_client(timeout: Duration) -> Result<Client, SourceError> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("pulse/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Joins a base URL and a path without doubling slashes.
pub(crate) fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Sends `request` and decodes a JSON body.
///
/// Non-success statuses become [`SourceError::Status`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    endpoint: &str,
) -> Result<T, SourceError> {
    let response = request.send().await?;
    let status = response.status();

    debug!(endpoint, status = status.as_u16(), "API response");

    if !status.is_success() {
        return Err(SourceError::status(endpoint, status.as_u16()));
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| SourceError::decode(endpoint, e.to_string()))
}

/// Reads an amount sent either as a JSON number or a decimal string.
pub(crate) fn flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null(()),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) if s.trim().is_empty() => Ok(0.0),
        Raw::Text(s) => s.trim().parse().map_err(D::Error::custom),
        Raw::Null(()) => Ok(0.0),
    }
}
