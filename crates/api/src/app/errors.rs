use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use dockyard_infra::ReceiveError;

pub fn receive_error_to_response(err: ReceiveError) -> axum::response::Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let code = err.code().as_str();

    match err {
        ReceiveError::OrderNotFound(_) => json_error(status, code, err.to_string()),
        ReceiveError::InvalidInput { message, field, .. } => {
            let mut body = json!({ "error": code, "message": message });
            if let Some(field) = field {
                body["field"] = json!(field);
            }
            (status, axum::Json(body)).into_response()
        }
        ReceiveError::Conflict { message, shortfall, .. } => {
            let mut body = json!({ "error": code, "message": message });
            if let (Some(detail), Some(obj)) = (shortfall, body.as_object_mut()) {
                if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(detail) {
                    obj.extend(fields);
                }
            }
            (status, axum::Json(body)).into_response()
        }
        // Store details stay in the logs.
        ReceiveError::Internal(_) => json_error(status, code, "internal error"),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
