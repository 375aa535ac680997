//! Client side of the checkout flow.
//!
//! [`CheckoutInitiator`] posts the selected price to the checkout endpoint and
//! sends the user to the hosted checkout page. The embedded `checkout.js`
//! follows the same contract in the browser; `ignite-shop checkout` drives
//! this one from a terminal.

use std::{
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
};

use ignite_shop_types::{CHECKOUT_ROUTE, CheckoutRequest, CheckoutResponse};
use tracing::{info, warn};
use url::Url;

use crate::pages::detail::CHECKOUT_FAILED_ALERT;

/// Any failure while creating a checkout session. Callers only ever tell the
/// user that the redirect failed, so the cause is kept as a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Checkout failed: {0}")]
pub struct CheckoutError(pub String);

impl From<reqwest::Error> for CheckoutError {
    fn from(error: reqwest::Error) -> Self {
        CheckoutError(error.to_string())
    }
}

/// Sends the checkout request
pub trait CheckoutTransport: Send + Sync {
    fn create_session(
        &self,
        request: &CheckoutRequest,
    ) -> impl Future<Output = Result<CheckoutResponse, CheckoutError>> + Send;
}

/// Side effects visible to the user
pub trait Navigator: Send + Sync {
    /// Full-page navigation
    fn redirect(&self, url: &Url);
    /// Blocking alert
    fn alert(&self, message: &str);
}

/// Posts JSON to the storefront's checkout endpoint
#[derive(Debug, Clone)]
pub struct HttpCheckoutTransport {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpCheckoutTransport {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Transport for the checkout endpoint of the storefront served at `base`
    pub fn for_storefront(base: &Url) -> Result<Self, CheckoutError> {
        let endpoint = base
            .join(CHECKOUT_ROUTE)
            .map_err(|e| CheckoutError(format!("invalid storefront url {}: {}", base, e)))?;
        Ok(Self::new(endpoint))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl CheckoutTransport for HttpCheckoutTransport {
    async fn create_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, CheckoutError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckoutError(format!(
                "checkout endpoint answered {}",
                status
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| CheckoutError(format!("malformed checkout response: {}", e)))
    }
}

/// Parse the hosted checkout URL returned by the endpoint. Only absolute
/// `http`/`https` URLs are followed.
pub fn checkout_target(checkout_url: &str) -> Result<Url, CheckoutError> {
    let url = Url::parse(checkout_url)
        .map_err(|e| CheckoutError(format!("invalid checkout url: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(CheckoutError(format!(
            "unsupported checkout url scheme {}",
            scheme
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Redirected(Url),
    Failed(CheckoutError),
    /// A checkout was already in progress
    Ignored,
}

/// One buy button's checkout state
pub struct CheckoutInitiator<T, N> {
    transport: T,
    navigator: N,
    in_progress: AtomicBool,
}

impl<T: CheckoutTransport, N: Navigator> CheckoutInitiator<T, N> {
    pub fn new(transport: T, navigator: N) -> Self {
        Self {
            transport,
            navigator,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Whether the triggering control is disabled
    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Create a session for `price_id` and redirect to it. The flag stays set
    /// after a redirect since the page is being left.
    pub async fn initiate_checkout(&self, price_id: &str) -> CheckoutOutcome {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return CheckoutOutcome::Ignored;
        }

        let request = CheckoutRequest {
            price_id: price_id.to_string(),
        };
        let result = self
            .transport
            .create_session(&request)
            .await
            .and_then(|response| checkout_target(&response.checkout_url));

        match result {
            Ok(url) => {
                info!(price = price_id, "Redirecting to checkout");
                self.navigator.redirect(&url);
                CheckoutOutcome::Redirected(url)
            }
            Err(error) => {
                warn!(price = price_id, error = %error, "Checkout failed");
                self.in_progress.store(false, Ordering::SeqCst);
                self.navigator.alert(CHECKOUT_FAILED_ALERT);
                CheckoutOutcome::Failed(error)
            }
        }
    }
}
