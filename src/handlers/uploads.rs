use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::OrderError;
use crate::AppState;

/// Content type for a stored receipt, guessed from its extension
fn content_type_for(file_name: &str) -> String {
    mime_guess::from_path(file_name).first_or_octet_stream().to_string()
}

/// Handler for GET /uploads/{filename}
pub async fn serve_receipt(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    match state.orders.receipts().fetch(&filename).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type_for(&filename))], bytes).into_response(),
        Err(OrderError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("Failed to read receipt {}: {}", filename, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
