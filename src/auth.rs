use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashSet;

use crate::error::ErrorBody;

/// Static API key list for the gateway.
///
/// Empty means authentication is disabled.
#[derive(Debug, Clone)]
pub struct ApiKeys {
    keys: HashSet<String>,
}

impl ApiKeys {
    pub fn empty() -> Self {
        Self {
            keys: HashSet::new(),
        }
    }

    /// Parse a comma-separated key list, trimming and dropping empties.
    pub fn from_csv(csv: &str) -> Self {
        let keys = csv
            .split(',')
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(|k| k.to_string())
            .collect();
        Self { keys }
    }

    pub fn from_keys(keys: HashSet<String>) -> Self {
        Self { keys }
    }

    pub fn is_enabled(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn validate(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }
}

/// Extract the API key from request headers.
///
/// A `Bearer` Authorization header wins; X-API-Key is only consulted when
/// no Bearer token is present. Values are trimmed, and a blank result
/// counts as no key at all.
pub fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            let token = token.trim();
            if token.is_empty() {
                return None;
            }
            return Some(token.to_string());
        }
    }

    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Middleware enforcing API key authentication on the speech endpoints.
///
/// Health probes stay open so orchestrators can reach them without keys.
pub async fn auth_middleware(
    State(keys): State<ApiKeys>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if !keys.is_enabled() {
        return next.run(request).await;
    }

    if matches!(request.uri().path(), "/" | "/health") {
        return next.run(request).await;
    }

    match extract_api_key(&headers) {
        Some(key) if keys.validate(&key) => next.run(request).await,
        Some(_) => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::new(
                "Invalid API key",
                "authentication_error",
                "invalid_api_key",
            )),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::new(
                "API key is required",
                "authentication_error",
                "missing_api_key",
            )),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_keys_disabled() {
        let keys = ApiKeys::empty();
        assert!(!keys.is_enabled());
        assert_eq!(keys.count(), 0);
        assert!(!keys.validate("any-key"));
    }

    #[test]
    fn test_from_csv() {
        let keys = ApiKeys::from_csv("key-1, key-2 ,,key-3,");

        assert_eq!(keys.count(), 3);
        assert!(keys.validate("key-1"));
        assert!(keys.validate("key-2"));
        assert!(keys.validate("key-3"));
        assert!(!keys.validate(""));
        assert!(!keys.validate(" key-2 "));
    }

    #[test]
    fn test_from_csv_all_empty() {
        assert!(!ApiKeys::from_csv("").is_enabled());
        assert!(!ApiKeys::from_csv(" , ,").is_enabled());
    }

    #[test]
    fn test_validate_case_sensitive() {
        let keys = ApiKeys::from_csv("SecretKey");
        assert!(keys.validate("SecretKey"));
        assert!(!keys.validate("secretkey"));
    }

    #[test]
    fn test_bearer_token_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer test-token".parse().unwrap());
        assert_eq!(extract_api_key(&headers), Some("test-token".to_string()));
    }

    #[test]
    fn test_x_api_key_used_when_no_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "test-key".parse().unwrap());
        assert_eq!(extract_api_key(&headers), Some("test-key".to_string()));
    }

    #[test]
    fn test_bearer_wins_over_x_api_key() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer bearer-key".parse().unwrap());
        headers.insert("x-api-key", "x-key".parse().unwrap());
        assert_eq!(extract_api_key(&headers), Some("bearer-key".to_string()));
    }

    #[test]
    fn test_non_bearer_auth_falls_back_to_x_api_key() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Basic dXNlcg==".parse().unwrap());
        headers.insert("x-api-key", "fallback-key".parse().unwrap());
        assert_eq!(extract_api_key(&headers), Some("fallback-key".to_string()));
    }

    #[test]
    fn test_values_are_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer  padded-token ".parse().unwrap());
        assert_eq!(extract_api_key(&headers), Some("padded-token".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", " padded-key ".parse().unwrap());
        assert_eq!(extract_api_key(&headers), Some("padded-key".to_string()));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer  ".parse().unwrap());
        assert_eq!(extract_api_key(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", " ".parse().unwrap());
        assert_eq!(extract_api_key(&headers), None);
    }

    #[test]
    fn test_no_headers_is_missing() {
        let headers = HeaderMap::new();
        assert_eq!(extract_api_key(&headers), None);
    }
}
