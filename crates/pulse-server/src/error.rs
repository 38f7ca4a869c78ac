use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pulse_cache::CacheError;
use pulse_core::PulseError;
use serde::Serialize;
use thiserror::Error;

use crate::datasets::LoadError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Parametros invalidos
    #[error("{0}")]
    BadRequest(String),

    /// Recurso desconocido
    #[error("{0}")]
    NotFound(String),

    /// La API remota fallo y no habia valor previo
    #[error("could not load '{key}': {message}")]
    Upstream { key: String, message: String },

    /// Error interno
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        let key = err.key().to_string();
        let message = match &err {
            CacheError::Fetch { source, .. } => source.to_string(),
        };
        AppError::Upstream { key, message }
    }
}

impl From<PulseError> for AppError {
    fn from(err: PulseError) -> Self {
        if err.is_invalid_timeframe() || err.is_invalid_key() || err.is_validation_error() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        }
    }
}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Key(err) => err.into(),
            LoadError::Cache(err) => err.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = status
            .canonical_reason()
            .unwrap_or("Error")
            .to_string();

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = Json(ErrorResponse {
            error,
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::CacheKey;

    #[test]
    fn test_cache_error_maps_to_bad_gateway() {
        let err = CacheError::fetch(
            CacheKey::new("market_data").unwrap(),
            std::io::Error::other("HTTP 503"),
        );
        let app: AppError = err.into();

        assert_eq!(app.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(app.to_string(), "could not load 'market_data': HTTP 503");
    }

    #[test]
    fn test_invalid_timeframe_maps_to_bad_request() {
        let app: AppError = PulseError::invalid_timeframe("1y").into();
        assert_eq!(app.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_maps_to_500() {
        let app: AppError = PulseError::internal("boom").into();
        assert_eq!(app.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
