//! Storefront routes for the "frequently bought together" block.
//!
//! - `GET /buy-together`                      renders the block (HTML)
//! - `GET /api/v1/buy-together`               returns the block's view-model (JSON, `null` when empty)
//! - `GET /buy-together/add/{product_ids}`    adds the selection to the shopper's cart, then `303` to the cart
//! - `GET /cart`                              returns the shopper's default cart (JSON)

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use cobuy_core::config::StorefrontConfig;
use cobuy_core::domain::cart::{Cart, CartKey, CartType, SessionId, ShopperContext, StoreId, UserId};
use cobuy_core::ports::{CartPort, CatalogPort, OrderHistoryPort};
use cobuy_core::{
    parse_selection, ApplicationError, BuyTogetherService, ExactMatchAggregator, InterfaceError,
    RecommendationBuilder, RecommendationView, SymbolCurrencyFormatter,
};
use cobuy_db::repositories::{SqlCartRepository, SqlCatalogRepository, SqlOrderHistoryRepository};
use cobuy_db::DbPool;
use serde::Serialize;
use tera::{Context, Tera};
use tracing::{info, warn};
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-session-id";
pub const USER_HEADER: &str = "x-user-id";
pub const CORRELATION_HEADER: &str = "x-correlation-id";

const BLOCK_TEMPLATE: &str = "buy_together/block.html";

pub type StorefrontService = BuyTogetherService<
    Arc<dyn OrderHistoryPort>,
    Arc<dyn CatalogPort>,
    Arc<dyn CartPort>,
    ExactMatchAggregator,
    SymbolCurrencyFormatter,
>;

#[derive(Clone)]
pub struct StorefrontState {
    service: Arc<StorefrontService>,
    templates: Arc<Tera>,
    storefront: StorefrontConfig,
}

impl StorefrontState {
    pub fn new(
        history: Arc<dyn OrderHistoryPort>,
        catalog: Arc<dyn CatalogPort>,
        carts: Arc<dyn CartPort>,
        storefront: StorefrontConfig,
    ) -> Self {
        let builder =
            RecommendationBuilder::new(SymbolCurrencyFormatter, storefront.default_currency.clone());
        let service = BuyTogetherService::new(history, catalog, carts, ExactMatchAggregator, builder);

        Self { service: Arc::new(service), templates: init_templates(), storefront }
    }

    pub fn from_pool(db_pool: DbPool, storefront: StorefrontConfig) -> Self {
        Self::new(
            Arc::new(SqlOrderHistoryRepository::new(db_pool.clone())),
            Arc::new(SqlCatalogRepository::new(db_pool.clone())),
            Arc::new(SqlCartRepository::new(db_pool)),
            storefront,
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

fn init_templates() -> Arc<Tera> {
    let mut tera = match Tera::new("templates/**/*.html") {
        Ok(tera) => tera,
        Err(error) => {
            warn!(
                event_name = "storefront.templates.filesystem_unavailable",
                error = %error,
                "failed to load storefront templates from filesystem, using embedded copy"
            );
            Tera::default()
        }
    };

    if !tera.get_template_names().any(|name| name == BLOCK_TEMPLATE) {
        tera.add_raw_template(
            BLOCK_TEMPLATE,
            include_str!("../../../templates/buy_together/block.html"),
        )
        .ok();
    }

    Arc::new(tera)
}

pub fn router(state: StorefrontState) -> Router {
    Router::new()
        .route("/buy-together", get(render_block))
        .route("/api/v1/buy-together", get(recommendation_json))
        .route("/buy-together/add/{product_ids}", get(add_to_cart))
        .route("/cart", get(view_cart))
        .with_state(state)
}

pub async fn render_block(
    headers: HeaderMap,
    State(state): State<StorefrontState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let correlation_id = correlation_id(&headers);
    let recommendation = match state.service.recommend().await {
        Ok(recommendation) => recommendation,
        Err(error) => {
            warn!(
                event_name = "storefront.block.degraded",
                correlation_id = %correlation_id,
                error = %error,
                "rendering neutral block after recommendation failure"
            );
            None
        }
    };

    let mut context = Context::new();
    context.insert(
        "has_products",
        &recommendation.as_ref().is_some_and(|view| !view.products.is_empty()),
    );
    context.insert("recommendation", &recommendation);

    let html = state.templates.render(BLOCK_TEMPLATE, &context).map_err(|error| {
        warn!(
            event_name = "storefront.block.template_failed",
            correlation_id = %correlation_id,
            error = %error,
            "buy-together template failed to render"
        );
        (StatusCode::INTERNAL_SERVER_ERROR, Html("<h1>Template Error</h1>".to_string()))
    })?;

    Ok(Html(html))
}

/// Currency conflicts degrade to `null` like the HTML block; storage failures are surfaced.
pub async fn recommendation_json(
    headers: HeaderMap,
    State(state): State<StorefrontState>,
) -> Result<Json<Option<RecommendationView>>, (StatusCode, Json<ErrorBody>)> {
    let correlation_id = correlation_id(&headers);

    match state.service.recommend().await {
        Ok(recommendation) => Ok(Json(recommendation)),
        Err(ApplicationError::Domain(error)) => {
            warn!(
                event_name = "storefront.api.degraded",
                correlation_id = %correlation_id,
                error = %error,
                "returning empty recommendation after domain failure"
            );
            Ok(Json(None))
        }
        Err(error) => Err(interface_error(error.into_interface(correlation_id))),
    }
}

/// Always answers with a redirect to the cart page. Missing session headers get a fresh
/// session, echoed back so the client can keep using the same cart.
pub async fn add_to_cart(
    Path(product_ids): Path<String>,
    headers: HeaderMap,
    State(state): State<StorefrontState>,
) -> Response {
    let correlation_id = correlation_id(&headers);
    let (context, issued_session) = shopper_context(&headers, &state.storefront);
    let selection = parse_selection(&product_ids);

    match state.service.add_selected_to_cart(&selection, &context).await {
        Ok(outcome) => {
            info!(
                event_name = "storefront.add_to_cart.completed",
                correlation_id = %correlation_id,
                cart_id = %outcome.cart_id.0,
                cart_created = outcome.cart_created,
                added = outcome.added.len(),
                skipped = outcome.skipped.len(),
                partial = outcome.is_partial(),
                "buy-together selection added to cart"
            );
        }
        Err(error) => {
            warn!(
                event_name = "storefront.add_to_cart.cart_unavailable",
                correlation_id = %correlation_id,
                session_id = %context.session_id.0,
                error = %error,
                "cart unavailable, redirecting without changes"
            );
        }
    }

    let redirect = Redirect::to(&state.storefront.cart_path);
    match issued_session.and_then(|session| HeaderValue::from_str(&session).ok()) {
        Some(value) => {
            (AppendHeaders([(HeaderName::from_static(SESSION_HEADER), value)]), redirect)
                .into_response()
        }
        None => redirect.into_response(),
    }
}

pub async fn view_cart(
    headers: HeaderMap,
    State(state): State<StorefrontState>,
) -> Result<Json<Option<Cart>>, (StatusCode, Json<ErrorBody>)> {
    let correlation_id = correlation_id(&headers);
    let Some(session_id) = header_value(&headers, SESSION_HEADER) else {
        return Ok(Json(None));
    };

    let key = CartKey {
        session_id: SessionId(session_id),
        store_id: StoreId(state.storefront.store_id.clone()),
        cart_type: CartType::Default,
    };

    state
        .service
        .carts()
        .find_cart(&key)
        .await
        .map(Json)
        .map_err(|error| interface_error(error.into_interface(correlation_id)))
}

/// Returns the context plus the session id when one had to be issued.
fn shopper_context(
    headers: &HeaderMap,
    storefront: &StorefrontConfig,
) -> (ShopperContext, Option<String>) {
    let (session_id, issued) = match header_value(headers, SESSION_HEADER) {
        Some(session_id) => (session_id, None),
        None => {
            let session_id = format!("sess-{}", Uuid::new_v4());
            (session_id.clone(), Some(session_id))
        }
    };

    let context = ShopperContext {
        session_id: SessionId(session_id),
        store_id: StoreId(storefront.store_id.clone()),
        user_id: header_value(headers, USER_HEADER).map(UserId),
    };
    (context, issued)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn correlation_id(headers: &HeaderMap) -> String {
    header_value(headers, CORRELATION_HEADER).unwrap_or_else(|| format!("req-{}", Uuid::new_v4()))
}

fn interface_error(error: InterfaceError) -> (StatusCode, Json<ErrorBody>) {
    let (status, correlation_id) = match &error {
        InterfaceError::BadRequest { correlation_id, .. } => {
            (StatusCode::BAD_REQUEST, correlation_id.clone())
        }
        InterfaceError::ServiceUnavailable { correlation_id, .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, correlation_id.clone())
        }
        InterfaceError::Internal { correlation_id, .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, correlation_id.clone())
        }
    };
    warn!(
        event_name = "storefront.request.failed",
        correlation_id = %correlation_id,
        error = %error,
        "storefront request failed"
    );

    (status, Json(ErrorBody { error: error.user_message().to_string(), correlation_id }))
}
