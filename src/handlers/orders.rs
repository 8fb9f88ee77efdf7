//! Order API handlers
//!
//! POST /verify-payment, GET /api/orders, GET /api/orders/{order_id},
//! POST /api/send-link, POST /api/send-email.
//!
//! Client errors carry `{success: false, msg}`. Server errors are logged and
//! answered with a bare `{success: false}`.

use std::collections::BTreeMap;

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;
use tracing::{error, warn};

use crate::error::OrderError;
use crate::models::order::{
    FailureResponse, Order, ReceiptUpload, SendEmailRequest, SendLinkRequest, SubmitOrderForm, SubmitOrderResponse,
    SuccessResponse,
};
use crate::services::validation::MISSING_DATA;
use crate::AppState;

type Failure = (StatusCode, Json<FailureResponse>);

/// Maps a service error onto the wire contract.
fn failure(context: &str, err: OrderError) -> Failure {
    match err {
        OrderError::Validation(msg) => (StatusCode::BAD_REQUEST, Json(FailureResponse::with_message(msg))),
        OrderError::NotFound(what) => (
            StatusCode::NOT_FOUND,
            Json(FailureResponse::with_message(format!("Not found: {}", what))),
        ),
        OrderError::NotReady(order_id) => {
            warn!(order_id = %order_id, "{}: order not ready for delivery", context);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(FailureResponse::generic()))
        }
        other => {
            error!("{} error: {}", context, other);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(FailureResponse::generic()))
        }
    }
}

fn bad_request(msg: impl Into<String>) -> Failure {
    (StatusCode::BAD_REQUEST, Json(FailureResponse::with_message(msg)))
}

/// Compares the provided key with the configured one without an early exit on the first mismatch
fn keys_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Check the shared admin secret via the X-API-Key header, when one is configured
fn check_admin_auth(state: &AppState, headers: &HeaderMap) -> Result<(), Failure> {
    let Some(admin_key) = state.admin_api_key.as_deref() else {
        return Ok(());
    };

    let provided_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !keys_match(provided_key, admin_key) {
        warn!("Invalid or missing API key");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(FailureResponse::with_message("Invalid or missing API key")),
        ));
    }

    Ok(())
}

/// Origin used for absolute receipt links in announcements
fn public_base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.public_base_url {
        return base.clone();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{}", host)
}

async fn read_submission(mut multipart: Multipart) -> Result<SubmitOrderForm, Failure> {
    let mut form = SubmitOrderForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Unreadable multipart body: {}", e);
                return Err((e.status(), Json(FailureResponse::with_message(e.body_text()))));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let result = match name.as_str() {
            "email" => field.text().await.map(|v| form.email = Some(v)),
            "udid" => field.text().await.map(|v| form.udid = Some(v)),
            "receipt" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                field.bytes().await.map(|bytes| {
                    form.receipt = Some(ReceiptUpload {
                        file_name,
                        bytes: bytes.to_vec(),
                    })
                })
            }
            _ => Ok(()),
        };

        if let Err(e) = result {
            warn!("Could not read multipart field {}: {}", name, e);
            return Err((e.status(), Json(FailureResponse::with_message(e.body_text()))));
        }
    }

    Ok(form)
}

/// Handler for POST /verify-payment
///
/// Multipart form with `email`, `udid` and the `receipt` file.
pub async fn verify_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SubmitOrderResponse>, Failure> {
    let multipart = multipart.map_err(|e| {
        warn!("Rejected submission: {}", e);
        bad_request(MISSING_DATA)
    })?;

    let form = read_submission(multipart).await?;
    let base_url = public_base_url(&state, &headers);

    let order = state
        .orders
        .submit_order(form, &base_url)
        .await
        .map_err(|e| failure("Verify payment", e))?;

    Ok(Json(SubmitOrderResponse {
        success: true,
        order_id: order.order_id,
    }))
}

/// Handler for GET /api/orders
///
/// Every order keyed by id. Storage failures answer 500 with `{}`.
pub async fn get_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BTreeMap<String, Order>>, Response> {
    check_admin_auth(&state, &headers).map_err(IntoResponse::into_response)?;

    match state.orders.list_orders().await {
        Ok(orders) => {
            tracing::debug!("Listing {} orders", orders.len());
            Ok(Json(orders))
        }
        Err(e) => {
            error!("Failed to list orders: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({}))).into_response())
        }
    }
}

/// Handler for GET /api/orders/{order_id}
pub async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, Failure> {
    check_admin_auth(&state, &headers)?;

    state
        .orders
        .find_order(&order_id)
        .await
        .map(Json)
        .map_err(|e| failure("Order lookup", e))
}

/// Handler for POST /api/send-link
///
/// Reports success even when the order id matches nothing.
pub async fn send_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SendLinkRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, Failure> {
    check_admin_auth(&state, &headers)?;
    let Json(payload) = payload.map_err(|e| bad_request(e.body_text()))?;

    state
        .orders
        .attach_link(payload)
        .await
        .map_err(|e| failure("Send link", e))?;

    Ok(Json(SuccessResponse::ok()))
}

/// Handler for POST /api/send-email
pub async fn send_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, Failure> {
    check_admin_auth(&state, &headers)?;
    let Json(payload) = payload.map_err(|e| bad_request(e.body_text()))?;

    let delivered = state
        .orders
        .send_email(payload.order_id)
        .await
        .map_err(|e| failure("Send email", e))?;

    if delivered {
        Ok(Json(SuccessResponse::ok()))
    } else {
        Err((StatusCode::INTERNAL_SERVER_ERROR, Json(FailureResponse::generic())))
    }
}
