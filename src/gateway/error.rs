use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// The engine understood the request but cannot answer this particular
    /// addressing mode. Expected on older engine versions; the score cache
    /// consumes it to advance its fallback chain.
    #[error("query shape not supported by the engine: {0}")]
    UnsupportedShape(String),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl GatewayError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            // The REST facade answers 501 for addressing modes the deployed
            // engine version does not implement.
            501 => GatewayError::UnsupportedShape(truncated),
            500..=599 => GatewayError::Engine(truncated),
            _ => GatewayError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_501_to_unsupported_shape() {
        let err = GatewayError::from_status(
            reqwest::StatusCode::NOT_IMPLEMENTED,
            "subgroup id addressing unavailable",
        );
        assert!(matches!(err, GatewayError::UnsupportedShape(_)));
    }

    #[test]
    fn test_from_status_maps_server_errors_to_engine() {
        let err = GatewayError::from_status(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, GatewayError::Engine(_)));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let err = GatewayError::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        let message = err.to_string();
        assert!(message.len() < body.len());
        assert!(message.contains("truncated"));
    }
}
