use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lf_protocol::ErrorBody;
use thiserror::Error;

use crate::db::DbError;
use crate::drawings::DrawingError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid command type")]
    InvalidCommandType,
    #[error("invalid drawing uuid")]
    InvalidDrawingUuid,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("not found")]
    NotFound,
    #[error("storage failure: {0}")]
    Storage(#[from] DbError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCommandType | ApiError::InvalidDrawingUuid | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DrawingError> for ApiError {
    fn from(err: DrawingError) -> Self {
        match err {
            DrawingError::UnknownUuid => ApiError::InvalidDrawingUuid,
            other @ DrawingError::InvalidTransition { .. } => ApiError::Conflict(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {self}");
        }
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        assert_eq!(ApiError::InvalidCommandType.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(DrawingError::UnknownUuid).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidDrawingUuid.to_string(), "invalid drawing uuid");
    }

    #[test]
    fn bad_transition_is_conflict() {
        let err = ApiError::from(DrawingError::InvalidTransition {
            action: crate::drawings::DrawingAction::Approve,
            from: lf_protocol::DrawingStatus::Drawing,
        });
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
