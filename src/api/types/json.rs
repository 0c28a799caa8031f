//! JSON extractor whose rejections use the API error envelope

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    response::{IntoResponse, Response},
    Json as AxumJson,
};
use serde::{de::DeserializeOwned, Serialize};

use super::error::{ApiError, ApiErrorType};

/// `axum::Json` with body errors reported as `ApiError`
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        AxumJson::<T>::from_request(req, state)
            .await
            .map(|AxumJson(value)| Json(value))
            .map_err(rejection_to_api_error)
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}

fn rejection_to_api_error(rejection: JsonRejection) -> ApiError {
    let (message, param) = match &rejection {
        JsonRejection::JsonDataError(err) => {
            let detail = err.body_text();
            let param = failing_field(&detail);
            (format!("Invalid request body: {}", detail), param)
        }
        JsonRejection::JsonSyntaxError(err) => {
            (format!("Invalid JSON syntax: {}", err.body_text()), None)
        }
        JsonRejection::MissingJsonContentType(_) => (
            "Missing Content-Type header. Expected 'application/json'.".to_string(),
            None,
        ),
        JsonRejection::BytesRejection(err) => {
            (format!("Failed to read request body: {}", err.body_text()), None)
        }
        _ => ("Invalid JSON request".to_string(), None),
    };

    let error = ApiError::new(rejection.status(), ApiErrorType::InvalidRequestError, message)
        .with_code("json_parse_error");

    match param {
        Some(param) => error.with_param(param),
        None => error,
    }
}

/// Field named by a deserialization error: either "missing field `x`"
/// or a `path.to.field: reason` prefix.
fn failing_field(detail: &str) -> Option<String> {
    let detail = detail
        .split_once("target type: ")
        .map(|(_, rest)| rest)
        .unwrap_or(detail);

    if let Some(rest) = detail.split_once("missing field `").map(|(_, rest)| rest) {
        return rest.split_once('`').map(|(field, _)| field.to_string());
    }

    let (path, _) = detail.split_once(": ")?;
    let is_path = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));

    is_path.then(|| path.to_string())
}
