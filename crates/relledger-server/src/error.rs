//! Mapping of ledger failures onto HTTP replies.
//!
//! Client mistakes come back with their reason. Storage and key-material
//! failures are logged here and answered with a fixed message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relledger_core::{AuthError, DbError};
use relledger_schema::ErrorBody;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Missing required fields")]
    MissingFields,

    #[error("{context}")]
    Storage {
        context: &'static str,
        #[source]
        source: DbError,
    },
}

impl ApiError {
    /// Wrap a store failure with the message the caller will see.
    pub fn storage(context: &'static str) -> impl FnOnce(DbError) -> Self {
        move |source| Self::Storage { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(AuthError::MalformedRequest(_)) | Self::MissingFields => {
                StatusCode::BAD_REQUEST
            }
            Self::Auth(AuthError::UnknownUser(_) | AuthError::InvalidSignature) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Auth(AuthError::Forbidden { .. }) => StatusCode::FORBIDDEN,
            _ if self.store_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Auth(AuthError::KeyMaterial { .. } | AuthError::Store(_))
            | Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The store actor is gone, as opposed to a query failing inside it.
    fn store_unavailable(&self) -> bool {
        match self {
            Self::Auth(AuthError::Store(source)) | Self::Storage { source, .. } => {
                source.is_unavailable()
            }
            _ => false,
        }
    }

    /// Message placed in the `error` field of the reply.
    fn public_message(&self) -> String {
        match self {
            _ if self.store_unavailable() => "Service unavailable".to_string(),
            Self::Auth(AuthError::KeyMaterial { .. } | AuthError::Store(_)) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }
        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
