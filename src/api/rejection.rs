use std::convert::Infallible;

use serde_json::json;
use warp::{
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{
        InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType,
    },
    reply::{self, Reply, Response},
    Rejection,
};

use crate::error::ApiError;

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    reply::with_status(reply::json(&json!({ "detail": message.into() })), status).into_response()
}

/// Maps every rejection that escapes the filter tree to a JSON error body.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(e) = err.find::<ApiError>() {
        return Ok(e.to_response());
    }

    let response = if let Some(e) = err.find::<BodyDeserializeError>() {
        detail(StatusCode::BAD_REQUEST, format!("Malformed request body: {e}"))
    } else if let Some(e) = err.find::<InvalidQuery>() {
        detail(StatusCode::BAD_REQUEST, format!("Malformed query string: {e}"))
    } else if err.find::<LengthRequired>().is_some() {
        detail(StatusCode::LENGTH_REQUIRED, "A content-length header is required")
    } else if err.find::<PayloadTooLarge>().is_some() {
        detail(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large")
    } else if err.find::<UnsupportedMediaType>().is_some() {
        detail(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected a JSON body")
    } else if err.find::<MethodNotAllowed>().is_some() {
        detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if err.is_not_found() {
        detail(StatusCode::NOT_FOUND, "Not found")
    } else {
        log::error!("Unhandled rejection: {err:?}");
        detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(response)
}
