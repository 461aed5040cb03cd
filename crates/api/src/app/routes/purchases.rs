use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use tracing::warn;

use dockyard_core::AggregateId;
use dockyard_infra::{ReceiveErrorCode, ReceiveOutcome};
use dockyard_purchasing::{IdempotencyKey, PurchaseOrderId, ReceiveGoods};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
/// Set to `explicit-key` or `content-signature` when a stored response is returned.
pub const REPLAY_HEADER: &str = "idempotent-replay";
/// Number of best-effort steps that failed and were skipped.
pub const SKIPPED_HEADER: &str = "x-receipt-skipped";

pub fn router() -> Router {
    Router::new().nest("/orders", orders_router())
}

fn orders_router() -> Router {
    Router::new()
        .route("/:id", get(get_purchase_order))
        .route("/:id/receive", post(receive_purchase_order_goods))
}

fn parse_order_id(id: &str) -> Result<PurchaseOrderId, axum::response::Response> {
    // An id that cannot parse cannot name an order.
    id.parse::<AggregateId>().map(PurchaseOrderId::new).map_err(|_| {
        errors::json_error(
            StatusCode::NOT_FOUND,
            ReceiveErrorCode::OrderNotFound.as_str(),
            format!("purchase order {id} not found"),
        )
    })
}

pub async fn get_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.receiving.order(tenant.tenant_id(), order_id) {
        Ok(order) => (StatusCode::OK, Json(dto::PurchaseOrderResponse::from(&order))).into_response(),
        Err(e) => errors::receive_error_to_response(e),
    }
}

pub async fn receive_purchase_order_goods(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<dto::ReceiveGoodsRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let raw_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(body.idempotency_key)
        .filter(|k| !k.trim().is_empty());

    let idempotency_key = match raw_key.map(IdempotencyKey::new).transpose() {
        Ok(key) => key,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "INVALID_IDEMPOTENCY_KEY", e.to_string());
        }
    };

    let cmd = ReceiveGoods {
        tenant_id: tenant.tenant_id(),
        order_id,
        lines: body.lines.into_iter().map(Into::into).collect(),
        idempotency_key,
        received_at: Utc::now(),
    };

    match services.receiving.receive(cmd) {
        Ok(outcome) => receipt_response(outcome),
        Err(e) => errors::receive_error_to_response(e),
    }
}

fn receipt_response(outcome: ReceiveOutcome) -> axum::response::Response {
    let mut response = (StatusCode::OK, Json(dto::PurchaseOrderResponse::from(&outcome.order))).into_response();
    let headers = response.headers_mut();

    if let Some(kind) = outcome.replay {
        headers.insert(REPLAY_HEADER, HeaderValue::from_static(kind.as_str()));
    }
    if !outcome.skipped.is_empty() {
        warn!(order_id = %outcome.order.id, skipped = outcome.skipped.len(), "receipt applied with skipped steps");
        headers.insert(SKIPPED_HEADER, HeaderValue::from(outcome.skipped.len()));
    }

    response
}
