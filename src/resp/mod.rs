use rocket::serde::json::Json;
use serde::Serialize;

pub mod jwt;
pub mod problem;
pub mod util;

/// Envelope of every successful response: `{success, message, ...payload}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub payload: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl ToString, payload: T) -> Json<ApiResponse<T>> {
        Json(ApiResponse {
            success: true,
            message: message.to_string(),
            payload,
        })
    }
}

/// Payload of responses carrying nothing beyond the message.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Empty {}
