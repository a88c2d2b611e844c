//! Classification of exchange API failures by response status.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - stored token was rejected")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited by the exchange")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum bytes of a response body carried into an error message.
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body before it lands in logs. Error bodies can
    /// carry multibyte asset names, so the cut backs up to a char boundary.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..cut],
            body.len()
        )
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_common_codes() {
        assert!(matches!(
            ApiError::from_status(reqwest::StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(reqwest::StatusCode::BAD_GATEWAY, "oops"),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(reqwest::StatusCode::IM_A_TEAPOT, ""),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let error = ApiError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        let message = error.to_string();
        assert!(message.contains("truncated, 2000 total bytes"));
        assert!(message.len() < 700);
    }

    #[test]
    fn test_truncation_lands_on_char_boundary() {
        // Three-byte chars put the 500-byte mark inside a char
        let body = "\u{20ac}".repeat(300);
        let error = ApiError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        let message = error.to_string();
        assert!(message.contains("truncated, 900 total bytes"));
    }
}
