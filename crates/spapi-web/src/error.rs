use axum::{
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::warn;
use uuid::Uuid;

use spapi_core::SpapiError;

/// Body of every failed report response. Callers never see the cause.
pub const INVALID_REPORT_MESSAGE: &str = "Invalid URL or ID.";

pub fn report_error_response(err: &SpapiError, request_id: Uuid) -> Response {
    warn!(
        %request_id,
        code = err.code(),
        upstream = err.is_upstream(),
        error = %err,
        "report request failed"
    );
    invalid_report()
}

pub fn invalid_link_response(rejection: &PathRejection, request_id: Uuid) -> Response {
    warn!(%request_id, code = "INVALID_LINK", error = %rejection, "report link rejected");
    invalid_report()
}

fn invalid_report() -> Response {
    (StatusCode::BAD_REQUEST, INVALID_REPORT_MESSAGE).into_response()
}
