use thiserror::Error;

/// Errors returned by the Stripe driver
#[derive(Error, Debug)]
pub enum StripeError {
    /// Stripe answered with an error status
    #[error("Stripe API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Transport, encoding or decoding failure inside the Stripe client
    #[error("Stripe client error: {0}")]
    Client(String),

    /// The configured API base cannot be used to build request URLs
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    /// The identifier cannot name a Stripe product
    #[error("Invalid product id: {0:?}")]
    InvalidProductId(String),
}

impl StripeError {
    /// Whether the error means the requested object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            StripeError::Api { status, code, .. } => {
                *status == 404 || code.as_deref() == Some("resource_missing")
            }
            StripeError::InvalidProductId(_) => true,
            _ => false,
        }
    }
}

impl From<stripe::StripeError> for StripeError {
    fn from(error: stripe::StripeError) -> Self {
        match error {
            stripe::StripeError::Stripe(request) => StripeError::Api {
                status: request.http_status,
                code: request.code.map(|code| code.to_string()),
                message: request
                    .message
                    .unwrap_or_else(|| "unknown error".to_string()),
            },
            other => StripeError::Client(other.to_string()),
        }
    }
}

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, StripeError>;
