use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Postgres SQLSTATE for an exclusion constraint violation.
pub const EXCLUSION_VIOLATION: &str = "23P01";
/// Postgres SQLSTATE for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Constraint violation ({code}): {message}")]
    Constraint { code: String, message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DatabaseError {
    pub fn is_exclusion_violation(&self) -> bool {
        matches!(self, DatabaseError::Constraint { code, .. } if code == EXCLUSION_VIOLATION)
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::Constraint { code, .. } if code == UNIQUE_VIOLATION)
    }
}

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Server-side calls fall back to the service key as bearer.
        let bearer = auth_token.unwrap_or(&self.anon_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer))?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);
            return Err(Self::map_error(status.as_u16(), &error_text));
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Headers asking PostgREST to echo the written rows back.
    pub fn return_representation() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    fn map_error(status: u16, error_text: &str) -> DatabaseError {
        let parsed: Option<PostgrestError> = serde_json::from_str(error_text).ok();

        if let Some(PostgrestError { code: Some(code), message }) = parsed {
            if code.starts_with("23") {
                return DatabaseError::Constraint {
                    code,
                    message: message.unwrap_or_else(|| error_text.to_string()),
                };
            }
        }

        match status {
            401 | 403 => DatabaseError::Auth(error_text.to_string()),
            404 => DatabaseError::NotFound(error_text.to_string()),
            _ => DatabaseError::Api { status, message: error_text.to_string() },
        }
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_violation_is_recognised() {
        let error = SupabaseClient::map_error(
            409,
            r#"{"code":"23P01","message":"conflicting key value violates exclusion constraint \"bookings_no_overlap\""}"#,
        );
        assert!(error.is_exclusion_violation());
        assert!(!error.is_unique_violation());
    }

    #[test]
    fn unique_violation_is_recognised() {
        let error = SupabaseClient::map_error(
            409,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint \"bookings_booking_reference_key\""}"#,
        );
        assert!(error.is_unique_violation());
    }

    #[test]
    fn plain_failures_keep_their_status() {
        let error = SupabaseClient::map_error(502, "bad gateway");
        assert!(matches!(error, DatabaseError::Api { status: 502, .. }));

        let error = SupabaseClient::map_error(401, "{\"message\":\"JWT expired\"}");
        assert!(matches!(error, DatabaseError::Auth(_)));
    }
}
