use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ignite_shop_types::{CheckoutRequest, CheckoutResponse};
use serde_json::json;
use tracing::{info, warn};

use super::AppState;
use crate::catalog::{CatalogClient, CheckoutSessions};

/// POST /api/checkout - Create a hosted checkout session for one price
pub async fn create_checkout_session<C>(
    State(state): State<AppState<C>>,
    Json(request): Json<CheckoutRequest>,
) -> Response
where
    C: CatalogClient + CheckoutSessions,
{
    let price_id = request.price_id.trim();
    if price_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "priceId is required" })),
        )
            .into_response();
    }

    let checkout = &state.storefront.config().checkout;
    match state
        .storefront
        .catalog()
        .create_checkout_url(price_id, &checkout.success_url, &checkout.cancel_url)
        .await
    {
        Ok(checkout_url) => {
            info!(price = price_id, "Created checkout session");
            (
                StatusCode::CREATED,
                Json(CheckoutResponse { checkout_url }),
            )
                .into_response()
        }
        Err(e) => {
            warn!(price = price_id, error = %e, "Failed to create checkout session");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
