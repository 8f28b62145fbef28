use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// The requested data source yielded no sample records. The message
    /// prefix `No documents found` is what callers key the 404 off.
    #[error("No documents found in {data_type} \"{name}\"")]
    NotFound { data_type: String, name: String },

    #[error("A tool with the name \"{0}\" already exists. Please choose a different name.")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Failed to parse model response as JSON: {0}")]
    Parse(String),

    #[error("{0}")]
    Upstream(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound { .. } => {
                tracing::warn!(error = %self, "Data source not found");
                StatusCode::NOT_FOUND
            }
            AppError::Conflict(name) => {
                tracing::warn!(tool = %name, "Tool name conflict");
                StatusCode::CONFLICT
            }
            AppError::Validation(msg) => {
                tracing::warn!(error = %msg, "Validation error");
                StatusCode::BAD_REQUEST
            }
            AppError::Parse(msg) => {
                tracing::error!(error = %msg, "Model response parse error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Upstream(msg) => {
                tracing::error!(error = %msg, "Upstream error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// `axum::Json` with its rejection mapped into [`AppError`], so malformed
/// request bodies (bad JSON, an unknown `dataType`, a wrong field type)
/// come back as a 400 with the standard `{"success":false,"error":...}`
/// body instead of axum's plain-text 422.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}
