use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::error;
use validator::ValidationErrors;

pub enum ApiError {
    /// The request body failed field validation.
    BadRequest(ValidationErrors),
    /// The request body failed validation, with errors already rendered per
    /// field.
    BadRequestRep(serde_json::Value),
    BadRequestReason(String),
    Unauthorized(String),
    Forbidden,
    NotFound(String),
    Conflict(String),
    UnprocessableEntity(String),
    InternalServerError,
}

impl ApiError {
    pub fn not_found(resource: &str) -> Self {
        Self::NotFound(format!("{} not found.", capitalize(resource)))
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(errors) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "message": "Invalid request data.",
                    "errors": errors,
                }),
            ),
            Self::BadRequestRep(errors) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "message": "Invalid request data.",
                    "errors": errors,
                }),
            ),
            Self::BadRequestReason(message) => {
                (StatusCode::BAD_REQUEST, json!(ErrorRep { message }))
            }
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, json!(ErrorRep { message })),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                json!(ErrorRep {
                    message: "You do not have permission to perform this operation.".to_owned(),
                }),
            ),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, json!(ErrorRep { message })),
            Self::Conflict(message) => (StatusCode::CONFLICT, json!(ErrorRep { message })),
            Self::UnprocessableEntity(message) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!(ErrorRep { message }))
            }
            Self::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!(ErrorRep {
                    message: "Internal server error.".to_owned(),
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::BadRequest(errors)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        error!(?error, "Received error.");

        Self::InternalServerError
    }
}

pub type ApiResponse<T> = Result<T, ApiError>;

#[derive(Serialize)]
pub struct ErrorRep {
    pub message: String,
}

#[cfg(test)]
mod test {
    use crate::ledger::services::field_error;

    use super::*;

    #[tokio::test]
    async fn validation_errors_are_bad_requests() {
        let response = ApiError::from(field_error("amount", "non_zero", "Amount must not be zero."))
            .into_response();

        assert_eq!(StatusCode::BAD_REQUEST, response.status());

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!("non_zero", body["errors"]["amount"][0]["code"]);
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = ApiError::from(anyhow::anyhow!("connection refused")).into_response();

        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
    }

    #[test]
    fn not_found_names_the_resource() {
        match ApiError::not_found("account") {
            ApiError::NotFound(message) => assert_eq!("Account not found.", message),
            _ => panic!("expected a not found error"),
        }
    }
}
