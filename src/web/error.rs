use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::datasource::DatasourceError;
use crate::db::executor::ExecutionError;
use crate::query::error::QueryError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Datasource(#[from] DatasourceError),
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::Datasource(DatasourceError::Query(err))
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Datasource(DatasourceError::Query(err)) => match err {
                QueryError::InvalidQueryDescription(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_QUERY_DESCRIPTION")
                }
                // The store answered with something the query did not ask for
                QueryError::MissingColumn(_) => (StatusCode::BAD_GATEWAY, "MISSING_COLUMN"),
                QueryError::InvalidTimestamp { .. } => {
                    (StatusCode::BAD_GATEWAY, "INVALID_TIMESTAMP")
                }
            },
            ApiError::Datasource(DatasourceError::Execution(err)) => match err {
                ExecutionError::Database(_) => (StatusCode::BAD_REQUEST, "SQL_ERROR"),
                ExecutionError::Pool(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "CONNECTION_ERROR")
                }
                ExecutionError::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        error!("Request failed with {}: {}", code, self);

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
