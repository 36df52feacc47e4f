//! Credential extraction for protected endpoints
//!
//! Handlers only pull the bearer token out of the request; whether it is
//! acceptable is decided by the hub's injected credential checks.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use ldd_common::api::bearer_token;

/// Bearer token from the `Authorization` header, if any
pub fn presented_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok();
    bearer_token(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_presented_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(presented_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer node-key"));
        assert_eq!(presented_token(&headers), Some("node-key"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("node-key"));
        assert_eq!(presented_token(&headers), None);
    }
}
