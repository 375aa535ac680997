//! HTTP surface of the storefront.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use ignite_shop_types::CHECKOUT_ROUTE;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

use crate::{
    cache::{ArtifactKind, CacheStatus, Served},
    catalog::{CatalogClient, CheckoutSessions},
    pages::GenerateError,
    render::{error_page, fallback_page},
    storefront::Storefront,
};

pub mod checkout;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Shared state of every handler
pub struct AppState<C> {
    pub storefront: Storefront<C>,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            storefront: self.storefront.clone(),
        }
    }
}

/// Create the storefront router
pub fn create_router<C>(storefront: Storefront<C>) -> Router<()>
where
    C: CatalogClient + CheckoutSessions,
{
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(listing::<C>))
        .route("/product/{id}", get(detail::<C>))
        .route(CHECKOUT_ROUTE, post(checkout::create_checkout_session::<C>))
        .route("/health", get(health))
        .route(
            "/static/{*path}",
            get(ignite_shop_assets::serve_static),
        )
        .with_state(AppState { storefront })
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

/// Start the storefront server on an already bound listener
pub async fn start_server<C>(storefront: Storefront<C>, listener: TcpListener) -> std::io::Result<()>
where
    C: CatalogClient + CheckoutSessions,
{
    let app = create_router(storefront);

    tracing::info!("Starting storefront on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}

/// GET / - Product listing
async fn listing<C: CatalogClient>(State(state): State<AppState<C>>) -> Response {
    let served = state.storefront.listing().await;
    page_response(served, state.storefront.site_name())
}

/// GET /product/{id} - Product detail
async fn detail<C: CatalogClient>(
    State(state): State<AppState<C>>,
    Path(id): Path<String>,
) -> Response {
    let served = state.storefront.detail(&id).await;
    page_response(served, state.storefront.site_name())
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn page_response(
    served: Result<Served, std::sync::Arc<GenerateError>>,
    site_name: &str,
) -> Response {
    match served {
        Ok(Served::Page {
            artifact,
            status,
            revalidate,
            ..
        }) => {
            let code = match artifact.kind {
                ArtifactKind::Ready => StatusCode::OK,
                ArtifactKind::NotFound => StatusCode::NOT_FOUND,
            };
            let cache_control = format!(
                "public, s-maxage={}, stale-while-revalidate",
                revalidate.as_secs()
            );
            html_response(code, &cache_control, status, artifact.html.to_string())
        }
        Ok(Served::Fallback) => html_response(
            StatusCode::OK,
            "no-cache",
            CacheStatus::Fallback,
            fallback_page(site_name),
        ),
        Err(e) => {
            error!(error = %e, "Failed to generate page");
            let mut response =
                (StatusCode::INTERNAL_SERVER_ERROR, Html(error_page(site_name))).into_response();
            response
                .headers_mut()
                .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            response
        }
    }
}

fn html_response(
    code: StatusCode,
    cache_control: &str,
    status: CacheStatus,
    html: String,
) -> Response {
    let mut response = (code, Html(html)).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(cache_control) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    headers.insert(X_CACHE, HeaderValue::from_static(status.as_str()));
    response
}
