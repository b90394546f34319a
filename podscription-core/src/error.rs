use thiserror::Error;

/// Failures surfaced by the Pod Doctor HTTP gateway.
///
/// Every gateway call either returns the requested value or one of these.
/// The `Display` text is what ends up in `StoreState::error` and in the
/// synthetic assistant message, so it is written for end users.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// No response at all (connection refused, DNS, TLS, ...).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status. `message` is either the server's own message or
    /// the `HTTP <status>: <reason>` fallback.
    #[error("API Error: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A 2xx body that does not have the expected shape.
    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Health check failed: {status}")]
    Health { status: u16 },
}
